//! Database models for the FahamPesa platform
//!
//! Re-exports models from the shared crate and adds backend-specific models

pub use shared::models::*;
