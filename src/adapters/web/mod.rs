//! REST API server.
//!
//! Axum router with cookie sessions (tower-sessions) and login handling
//! (axum-login). Everything lives under `/api`; other paths are served from
//! an optional static frontend directory.

pub mod auth;
pub mod demo;
mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::*;

use axum::{
    Router,
    middleware,
    routing::{get, post},
};
use axum_login::AuthManagerLayerBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use time::Duration;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tower_sessions::{Expiry, MemoryStore as SessionStore, SessionManagerLayer, cookie::Key};

use crate::domain::config_validation::{DEFAULT_SESSION_LIFETIME, session_key_bytes};
use crate::domain::error::JournalError;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::JournalStore;

use auth::Backend;

pub struct AppState {
    pub store: Arc<dyn JournalStore + Send + Sync>,
}

/// Server settings read from the `[web]` and `[auth]` sections.
#[derive(Clone)]
pub struct WebSettings {
    pub session_key: Vec<u8>,
    /// Seconds of inactivity before a session expires.
    pub session_lifetime: i64,
    pub secure_cookie: bool,
    pub static_dir: Option<PathBuf>,
}

impl WebSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, JournalError> {
        Ok(Self {
            session_key: session_key_bytes(config)?,
            session_lifetime: config.get_int("auth", "session_lifetime", DEFAULT_SESSION_LIFETIME),
            secure_cookie: config.get_bool("auth", "secure_cookie", false),
            static_dir: config
                .get_string("web", "static_dir")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        })
    }
}

fn api_routes() -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/user", get(handlers::current_user))
        .route(
            "/trades",
            get(handlers::list_trades).post(handlers::create_trade),
        )
        .route("/trades/range", get(handlers::trades_in_range))
        .route(
            "/trades/{id}",
            get(handlers::get_trade)
                .put(handlers::update_trade)
                .patch(handlers::update_trade)
                .delete(handlers::delete_trade),
        )
        .route(
            "/journal",
            get(handlers::list_journal_entries).post(handlers::create_journal_entry),
        )
        .route(
            "/journal/{id}",
            get(handlers::get_journal_entry)
                .put(handlers::update_journal_entry)
                .patch(handlers::update_journal_entry)
                .delete(handlers::delete_journal_entry),
        )
        .route("/metrics", get(handlers::metrics))
        .route("/metrics/daily", get(handlers::daily_performance))
        .route("/metrics/monthly", get(handlers::monthly_performance))
        .route("/metrics/sessions", get(handlers::session_performance))
        .route("/metrics/weekdays", get(handlers::weekday_performance))
        .route("/export", get(handlers::export))
        .route_layer(middleware::from_fn(handlers::require_login));

    Router::new()
        .route("/healthcheck", get(handlers::healthcheck))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .merge(protected)
        .fallback(handlers::api_not_found)
}

pub fn build_router(state: AppState, settings: &WebSettings) -> Result<Router, JournalError> {
    let key = Key::try_from(settings.session_key.as_slice()).map_err(|e| {
        JournalError::ConfigInvalid {
            section: "auth".to_string(),
            key: "session_secret".to_string(),
            reason: e.to_string(),
        }
    })?;

    let session_layer = SessionManagerLayer::new(SessionStore::default())
        .with_secure(settings.secure_cookie)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            settings.session_lifetime,
        )))
        .with_signed(key);

    let backend = Backend::new(Arc::clone(&state.store));
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    let mut router = Router::new().nest("/api", api_routes());

    if let Some(dir) = &settings.static_dir {
        // Client-side routes resolve to the SPA entry point.
        let index = ServeFile::new(dir.join("index.html"));
        router = router.fallback_service(ServeDir::new(dir).fallback(index));
    }

    Ok(router
        .layer(auth_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state)))
}
