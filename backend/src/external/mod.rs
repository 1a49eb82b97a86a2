//! Clients for external services

pub mod email;

pub use email::EmailClient;
