//! Configuration validation.
//!
//! Checks every server setting before `serve` binds a socket.

use std::net::SocketAddr;

use crate::domain::error::JournalError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:5000";
pub const DEFAULT_SESSION_LIFETIME: i64 = 86_400;

/// Hex-encoded 64-byte cookie signing key.
const SESSION_SECRET_HEX_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

pub fn validate_server_config(config: &dyn ConfigPort) -> Result<(), JournalError> {
    validate_listen(config)?;
    validate_session_secret(config)?;
    validate_session_lifetime(config)?;
    let backend = storage_backend(config)?;
    if backend == StorageBackend::Sqlite {
        validate_sqlite(config)?;
    }
    validate_demo(config)?;
    Ok(())
}

pub fn listen_addr(config: &dyn ConfigPort) -> Result<SocketAddr, JournalError> {
    let raw = config
        .get_string("web", "listen")
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    raw.parse().map_err(|_| JournalError::ConfigInvalid {
        section: "web".to_string(),
        key: "listen".to_string(),
        reason: format!("{raw:?} is not a socket address"),
    })
}

pub fn storage_backend(config: &dyn ConfigPort) -> Result<StorageBackend, JournalError> {
    match config
        .get_string("storage", "backend")
        .as_deref()
        .map(str::trim)
    {
        None | Some("") | Some("memory") => Ok(StorageBackend::Memory),
        Some("sqlite") => Ok(StorageBackend::Sqlite),
        Some(other) => Err(JournalError::ConfigInvalid {
            section: "storage".to_string(),
            key: "backend".to_string(),
            reason: format!("unknown backend {other:?}, expected memory or sqlite"),
        }),
    }
}

/// Decodes `[auth] session_secret` into the raw 64-byte key.
pub fn session_key_bytes(config: &dyn ConfigPort) -> Result<Vec<u8>, JournalError> {
    let secret = config
        .get_string("auth", "session_secret")
        .ok_or_else(|| JournalError::ConfigMissing {
            section: "auth".to_string(),
            key: "session_secret".to_string(),
        })?;
    let secret = secret.trim();
    let invalid = |reason: &str| JournalError::ConfigInvalid {
        section: "auth".to_string(),
        key: "session_secret".to_string(),
        reason: reason.to_string(),
    };
    if secret.len() != SESSION_SECRET_HEX_LEN {
        return Err(invalid("session_secret must be 128 hex characters"));
    }
    hex::decode(secret).map_err(|_| invalid("session_secret must be hexadecimal"))
}

fn validate_listen(config: &dyn ConfigPort) -> Result<(), JournalError> {
    listen_addr(config).map(|_| ())
}

fn validate_session_secret(config: &dyn ConfigPort) -> Result<(), JournalError> {
    session_key_bytes(config).map(|_| ())
}

fn validate_session_lifetime(config: &dyn ConfigPort) -> Result<(), JournalError> {
    let value = config.get_int("auth", "session_lifetime", DEFAULT_SESSION_LIFETIME);
    if value <= 0 {
        return Err(JournalError::ConfigInvalid {
            section: "auth".to_string(),
            key: "session_lifetime".to_string(),
            reason: "session_lifetime must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_sqlite(config: &dyn ConfigPort) -> Result<(), JournalError> {
    match config.get_string("sqlite", "path") {
        Some(p) if !p.trim().is_empty() => {}
        _ => {
            return Err(JournalError::ConfigMissing {
                section: "sqlite".to_string(),
                key: "path".to_string(),
            });
        }
    }
    let pool_size = config.get_int("sqlite", "pool_size", 4);
    if !(1..=64).contains(&pool_size) {
        return Err(JournalError::ConfigInvalid {
            section: "sqlite".to_string(),
            key: "pool_size".to_string(),
            reason: "pool_size must be between 1 and 64".to_string(),
        });
    }
    Ok(())
}

fn validate_demo(config: &dyn ConfigPort) -> Result<(), JournalError> {
    if !config.get_bool("demo", "enabled", false) {
        return Ok(());
    }
    if let Some(password) = config.get_string("demo", "password") {
        if password.is_empty() {
            return Err(JournalError::ConfigInvalid {
                section: "demo".to_string(),
                key: "password".to_string(),
                reason: "demo password must not be empty".to_string(),
            });
        }
    }
    Ok(())
}
