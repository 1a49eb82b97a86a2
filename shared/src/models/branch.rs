//! Branch models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical branch of a business
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub location: String,
    pub contact: ContactInfo,
    /// One entry per weekday, Monday first
    pub opening_hours: Vec<DayHours>,
    pub status: BranchStatus,
    pub manager_id: Option<Uuid>,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Operational status of a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    Active,
    Inactive,
    UnderMaintenance,
    TemporarilyClosed,
}

impl BranchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchStatus::Active => "active",
            BranchStatus::Inactive => "inactive",
            BranchStatus::UnderMaintenance => "under_maintenance",
            BranchStatus::TemporarilyClosed => "temporarily_closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(BranchStatus::Active),
            "inactive" => Some(BranchStatus::Inactive),
            "under_maintenance" => Some(BranchStatus::UnderMaintenance),
            "temporarily_closed" => Some(BranchStatus::TemporarilyClosed),
            _ => None,
        }
    }

    /// Whether the branch can originate or receive transfers
    pub fn is_operational(&self) -> bool {
        matches!(self, BranchStatus::Active)
    }
}

impl std::fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchStatus::Active => write!(f, "Active"),
            BranchStatus::Inactive => write!(f, "Inactive"),
            BranchStatus::UnderMaintenance => write!(f, "Under Maintenance"),
            BranchStatus::TemporarilyClosed => write!(f, "Temporarily Closed"),
        }
    }
}

/// Contact details for a branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: String,
    pub email: Option<String>,
}

/// Opening hours for a single weekday; both fields absent means closed that day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayHours {
    /// Opening time as "HH:MM" (24h)
    pub opens_at: Option<String>,
    /// Closing time as "HH:MM" (24h)
    pub closes_at: Option<String>,
}

impl DayHours {
    pub fn closed() -> Self {
        Self {
            opens_at: None,
            closes_at: None,
        }
    }

    pub fn open(opens_at: &str, closes_at: &str) -> Self {
        Self {
            opens_at: Some(opens_at.to_string()),
            closes_at: Some(closes_at.to_string()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.opens_at.is_none() && self.closes_at.is_none()
    }
}
