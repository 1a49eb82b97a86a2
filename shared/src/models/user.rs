//! User (tenant) models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An account owner. The user id doubles as the tenant key: every branch,
/// product, movement, transfer and order row carries it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub business_name: String,
    pub created_at: DateTime<Utc>,
}
