//! Shared types and models for the FahamPesa platform
//!
//! This crate contains the domain models, state machines and pure stock
//! arithmetic shared between the backend and any other components.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
