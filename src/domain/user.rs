//! User accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::JournalError;

const MAX_USERNAME_LEN: usize = 64;

/// A stored account. `password_hash` is an argon2 PHC string, salt included.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// What clients see of a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn from_new(id: i64, new: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username: new.username,
            password_hash: new.password_hash,
            name: new.name,
            email: new.email,
            created_at: now,
        }
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }

    /// Usernames are unique ignoring ASCII case, the same folding SQLite's
    /// `NOCASE` collation applies.
    pub fn matches_username(&self, username: &str) -> bool {
        self.username.eq_ignore_ascii_case(username)
    }
}

/// Trims and checks a username chosen at registration.
pub fn normalize_username(raw: &str) -> Result<String, JournalError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(JournalError::validation("username", "must not be empty"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(JournalError::validation(
            "username",
            format!("must be at most {MAX_USERNAME_LEN} characters"),
        ));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(JournalError::validation(
            "username",
            "must not contain whitespace",
        ));
    }
    Ok(username.to_string())
}

pub fn validate_password(password: &str) -> Result<(), JournalError> {
    if password.is_empty() {
        return Err(JournalError::validation("password", "must not be empty"));
    }
    Ok(())
}
