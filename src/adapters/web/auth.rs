//! Session authentication for axum-login.
//!
//! Accounts live in the [`JournalStore`]; passwords are argon2 PHC strings.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum_login::{AuthUser, AuthnBackend, UserId};
use rand::rngs::OsRng;
use serde::Deserialize;
use std::sync::Arc;

use crate::domain::error::JournalError;
use crate::domain::user::User;
use crate::ports::store_port::JournalStore;

pub type AuthSession = axum_login::AuthSession<Backend>;

/// The user attached to a session.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    /// The password hash string as bytes. Changing the password invalidates
    /// existing sessions.
    pw_hash_bytes: Vec<u8>,
}

impl From<User> for SessionUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            pw_hash_bytes: user.password_hash.into_bytes(),
        }
    }
}

impl AuthUser for SessionUser {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        &self.pw_hash_bytes
    }
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct Backend {
    store: Arc<dyn JournalStore + Send + Sync>,
}

impl Backend {
    pub fn new(store: Arc<dyn JournalStore + Send + Sync>) -> Self {
        Self { store }
    }
}

impl AuthnBackend for Backend {
    type User = SessionUser;
    type Credentials = Credentials;
    type Error = JournalError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let Some(user) = self.store.get_user_by_username(creds.username.trim())? else {
            return Ok(None);
        };

        let hash = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&creds.password, &hash))
            .await
            .map_err(|e| JournalError::PasswordHash {
                reason: e.to_string(),
            })?;

        Ok(verified.then(|| SessionUser::from(user)))
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        Ok(self.store.get_user(*user_id)?.map(SessionUser::from))
    }
}

/// Argon2id with a fresh random salt, as a PHC string.
pub fn hash_password(password: &str) -> Result<String, JournalError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| JournalError::PasswordHash {
            reason: e.to_string(),
        })
}

/// False for a wrong password and for an unparseable stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// [`hash_password`] off the async executor.
pub async fn hash_password_blocking(password: String) -> Result<String, JournalError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| JournalError::PasswordHash {
            reason: e.to_string(),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::MemoryStore;
    use crate::domain::user::NewUser;

    fn backend_with(username: &str, password: &str) -> Backend {
        let store = MemoryStore::new();
        store
            .create_user(NewUser {
                username: username.into(),
                password_hash: hash_password(password).unwrap(),
                name: None,
                email: None,
            })
            .unwrap();
        Backend::new(Arc::new(store))
    }

    fn creds(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn hash_embeds_salt_and_verifies() {
        let a = hash_password("demo123").unwrap();
        let b = hash_password("demo123").unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
        assert!(verify_password("demo123", &a));
        assert!(!verify_password("demo124", &a));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn authenticate_accepts_correct_password() {
        let backend = backend_with("demo", "demo123");
        let user = backend
            .authenticate(creds("demo", "demo123"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.username, "demo");
        assert_eq!(user.id(), 1);
    }

    #[tokio::test]
    async fn authenticate_is_case_insensitive_on_username() {
        let backend = backend_with("demo", "demo123");
        assert!(
            backend
                .authenticate(creds("DEMO", "demo123"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn authenticate_rejects_wrong_password_and_unknown_user() {
        let backend = backend_with("demo", "demo123");
        assert!(
            backend
                .authenticate(creds("demo", "wrong"))
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            backend
                .authenticate(creds("nobody", "demo123"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn get_user_by_session_id() {
        let backend = backend_with("demo", "demo123");
        assert!(backend.get_user(&1).await.unwrap().is_some());
        assert!(backend.get_user(&2).await.unwrap().is_none());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let shown = format!("{:?}", creds("demo", "secret-pass"));
        assert!(!shown.contains("secret-pass"));
    }
}
