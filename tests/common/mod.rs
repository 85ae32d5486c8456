#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use tradejournal::adapters::memory_store::MemoryStore;
use tradejournal::adapters::web::{AppState, WebSettings, build_router};
use tradejournal::ports::config_port::ConfigPort;
use tradejournal::ports::store_port::JournalStore;

pub const SESSION_SECRET: &str = "00000000000000000000000000000001\
                                  00000000000000000000000000000001\
                                  00000000000000000000000000000001\
                                  00000000000000000000000000000001";

/// Config holding only what the server needs to start.
pub struct MockConfigPort {
    pub static_dir: Option<String>,
}

impl ConfigPort for MockConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        match (section, key) {
            ("auth", "session_secret") => Some(SESSION_SECRET.to_string()),
            ("web", "static_dir") => self.static_dir.clone(),
            _ => None,
        }
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match (section, key) {
            ("auth", "session_lifetime") => 3600,
            _ => default,
        }
    }

    fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
        default
    }
}

pub fn create_app_with(store: Arc<MemoryStore>, config: &MockConfigPort) -> Router {
    let settings = WebSettings::from_config(config).unwrap();
    let store: Arc<dyn JournalStore + Send + Sync> = store;
    build_router(AppState { store }, &settings).unwrap()
}

/// A fresh app plus a handle on its store for direct seeding.
pub fn create_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let app = create_app_with(Arc::clone(&store), &MockConfigPort { static_dir: None });
    (app, store)
}

pub fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub cookies: Vec<String>,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }

    pub fn message(&self) -> String {
        self.json()["message"].as_str().unwrap_or_default().to_string()
    }

    /// `name=value` pairs suitable for a `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|sc| sc.split(';').next().unwrap_or("").to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let cookies = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    TestResponse {
        status,
        headers,
        cookies,
        text: String::from_utf8_lossy(&body).into_owned(),
    }
}

/// Registers a user and returns the session cookie header.
pub async fn register(app: &Router, username: &str, password: &str) -> String {
    let response = send(
        app,
        json_request(
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "username": username, "password": password })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    let cookie = response.cookie_header();
    assert!(!cookie.is_empty(), "register should set a session cookie");
    cookie
}

pub fn trade_json(symbol: &str, direction: &str, entry: f64, exit: f64, size: f64, day: &str) -> Value {
    json!({
        "symbol": symbol,
        "tradeType": direction,
        "entryPrice": entry,
        "exitPrice": exit,
        "positionSize": size,
        "entryDate": format!("{day}T09:30:00Z"),
        "exitDate": format!("{day}T10:15:00Z"),
        "instrumentType": "stocks",
        "tags": ["breakout"]
    })
}

pub fn journal_json(title: &str, day: &str) -> Value {
    json!({
        "title": title,
        "content": "Followed the plan.",
        "date": format!("{day}T00:00:00Z"),
        "mood": "positive"
    })
}

pub async fn create_trade(app: &Router, cookie: &str, body: Value) -> Value {
    let response = send(
        app,
        json_request(Method::POST, "/api/trades", Some(cookie), Some(body)),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    response.json()
}
