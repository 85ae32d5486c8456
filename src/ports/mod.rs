//! Port traits the domain talks through.

pub mod config_port;
pub mod store_port;
