//! Core domain types and logic.

pub mod config_validation;
pub mod date_range;
pub mod error;
pub mod journal;
pub mod metrics;
pub mod performance;
pub mod trade;
pub mod user;
