//! HTTP request handlers for the REST API.

use axum::{
    Json,
    extract::{Path, Query, Request, State, rejection::JsonRejection},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

use crate::adapters::csv_export;
use crate::domain::date_range::DateRange;
use crate::domain::error::JournalError;
use crate::domain::journal::{JournalEntry, JournalPatch, NewJournalEntry};
use crate::domain::metrics::TradingMetrics;
use crate::domain::performance::{
    DailySummary, MonthlySummary, SessionSummary, WeekdaySummary, daily_summary,
    monthly_summary, session_summary, weekday_summary,
};
use crate::domain::trade::{NewTrade, Trade, TradePatch, non_blank};
use crate::domain::user::{NewUser, PublicUser, normalize_username, validate_password};

use super::AppState;
use super::auth::{AuthSession, Backend, Credentials, SessionUser, hash_password_blocking};
use super::error::ApiError;

const TRADE: &str = "trade";
const JOURNAL_ENTRY: &str = "journal entry";

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl RangeQuery {
    fn optional_range(&self) -> Result<Option<DateRange>, JournalError> {
        DateRange::from_optional(self.start_date.as_deref(), self.end_date.as_deref())
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    /// `trades` (default) or `journal`; CSV carries one table per file.
    pub data: Option<String>,
}

fn session_error(err: axum_login::Error<Backend>) -> ApiError {
    tracing::error!(error = %err, "session store failure");
    ApiError::internal("Internal server error")
}

fn current_user_id(auth_session: &AuthSession) -> ApiResult<i64> {
    auth_session
        .user
        .as_ref()
        .map(|u| u.id)
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
}

/// Route guard for the protected API: no session user means a JSON 401.
pub async fn require_login(auth_session: AuthSession, request: Request, next: Next) -> Response {
    if auth_session.user.is_none() {
        return ApiError::unauthorized("Not authenticated").into_response();
    }
    next.run(request).await
}

fn parse_id(raw: &str, kind: &str) -> ApiResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::bad_request(format!("Invalid {kind} ID")))
}

/// A missing record is 404; one owned by someone else is 403.
fn owned_by<T>(
    record: Option<T>,
    owner_of: fn(&T) -> i64,
    user_id: i64,
    kind: &'static str,
    id: i64,
) -> Result<T, JournalError> {
    let record = record.ok_or(JournalError::NotFound { kind, id })?;
    if owner_of(&record) != user_id {
        debug!(user_id, id, kind, "ownership check failed");
        return Err(JournalError::Forbidden { kind, id });
    }
    Ok(record)
}

fn owned_trade(state: &AppState, user_id: i64, id: i64) -> Result<Trade, JournalError> {
    owned_by(state.store.get_trade(id)?, |t| t.user_id, user_id, TRADE, id)
}

fn owned_journal_entry(
    state: &AppState,
    user_id: i64,
    id: i64,
) -> Result<JournalEntry, JournalError> {
    owned_by(
        state.store.get_journal_entry(id)?,
        |e| e.user_id,
        user_id,
        JOURNAL_ENTRY,
        id,
    )
}

fn trades_for(state: &AppState, user_id: i64, query: &RangeQuery) -> ApiResult<Vec<Trade>> {
    let trades = match query.optional_range()? {
        Some(range) => state.store.list_trades_in_range(user_id, &range)?,
        None => state.store.list_trades(user_id)?,
    };
    Ok(trades)
}

// --- auth ---

pub async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn register(
    mut auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PublicUser>)> {
    let Json(req) = payload?;
    let username = normalize_username(&req.username)?;
    validate_password(&req.password)?;
    if state.store.get_user_by_username(&username)?.is_some() {
        return Err(JournalError::UsernameTaken { username }.into());
    }

    let password_hash = hash_password_blocking(req.password).await?;
    let user = state.store.create_user(NewUser {
        username,
        password_hash,
        name: non_blank(req.name),
        email: non_blank(req.email),
    })?;

    auth_session
        .login(&SessionUser::from(user.clone()))
        .await
        .map_err(session_error)?;
    info!(user_id = user.id, username = %user.username, "registered user");
    Ok((StatusCode::CREATED, Json(user.to_public())))
}

pub async fn login(
    mut auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<PublicUser>> {
    let Json(creds) = payload?;
    let username = creds.username.clone();
    let session_user = match auth_session.authenticate(creds).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            info!(username = %username, "login rejected");
            return Err(JournalError::InvalidCredentials.into());
        }
        Err(e) => return Err(session_error(e)),
    };

    auth_session
        .login(&session_user)
        .await
        .map_err(session_error)?;

    let user = state
        .store
        .get_user(session_user.id)?
        .ok_or(JournalError::InvalidCredentials)?;
    info!(user_id = user.id, "logged in");
    Ok(Json(user.to_public()))
}

pub async fn logout(mut auth_session: AuthSession) -> ApiResult<Json<Value>> {
    if let Some(user) = auth_session.logout().await.map_err(session_error)? {
        info!(user_id = user.id, "logged out");
    }
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

pub async fn current_user(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<PublicUser>> {
    let user_id = current_user_id(&auth_session)?;
    let user = state
        .store
        .get_user(user_id)?
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;
    Ok(Json(user.to_public()))
}

// --- trades ---

pub async fn list_trades(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Trade>>> {
    let user_id = current_user_id(&auth_session)?;
    Ok(Json(state.store.list_trades(user_id)?))
}

pub async fn trades_in_range(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Vec<Trade>>> {
    let user_id = current_user_id(&auth_session)?;
    let (Some(start), Some(end)) = (query.start_date.as_deref(), query.end_date.as_deref())
    else {
        return Err(ApiError::bad_request("Start date and end date are required"));
    };
    if start.trim().is_empty() || end.trim().is_empty() {
        return Err(ApiError::bad_request("Start date and end date are required"));
    }
    let range = DateRange::parse(start, end)?;
    Ok(Json(state.store.list_trades_in_range(user_id, &range)?))
}

pub async fn get_trade(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<Trade>> {
    let user_id = current_user_id(&auth_session)?;
    let id = parse_id(&raw_id, TRADE)?;
    Ok(Json(owned_trade(&state, user_id, id)?))
}

pub async fn create_trade(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewTrade>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Trade>)> {
    let user_id = current_user_id(&auth_session)?;
    let Json(new_trade) = payload?;
    let trade = state.store.create_trade(user_id, new_trade)?;
    info!(user_id, trade_id = trade.id, symbol = %trade.symbol, "trade created");
    Ok((StatusCode::CREATED, Json(trade)))
}

pub async fn update_trade(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    payload: Result<Json<TradePatch>, JsonRejection>,
) -> ApiResult<Json<Trade>> {
    let user_id = current_user_id(&auth_session)?;
    let id = parse_id(&raw_id, TRADE)?;
    owned_trade(&state, user_id, id)?;
    let Json(patch) = payload?;
    let trade = state
        .store
        .update_trade(id, patch)?
        .ok_or(JournalError::NotFound { kind: TRADE, id })?;
    debug!(user_id, trade_id = id, "trade updated");
    Ok(Json(trade))
}

pub async fn delete_trade(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> ApiResult<StatusCode> {
    let user_id = current_user_id(&auth_session)?;
    let id = parse_id(&raw_id, TRADE)?;
    owned_trade(&state, user_id, id)?;
    if !state.store.delete_trade(id)? {
        return Err(JournalError::NotFound { kind: TRADE, id }.into());
    }
    debug!(user_id, trade_id = id, "trade deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- journal ---

pub async fn list_journal_entries(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<JournalEntry>>> {
    let user_id = current_user_id(&auth_session)?;
    Ok(Json(state.store.list_journal_entries(user_id)?))
}

pub async fn get_journal_entry(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<JournalEntry>> {
    let user_id = current_user_id(&auth_session)?;
    let id = parse_id(&raw_id, JOURNAL_ENTRY)?;
    Ok(Json(owned_journal_entry(&state, user_id, id)?))
}

pub async fn create_journal_entry(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewJournalEntry>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<JournalEntry>)> {
    let user_id = current_user_id(&auth_session)?;
    let Json(new_entry) = payload?;
    let entry = state.store.create_journal_entry(user_id, new_entry)?;
    info!(user_id, entry_id = entry.id, "journal entry created");
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update_journal_entry(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    payload: Result<Json<JournalPatch>, JsonRejection>,
) -> ApiResult<Json<JournalEntry>> {
    let user_id = current_user_id(&auth_session)?;
    let id = parse_id(&raw_id, JOURNAL_ENTRY)?;
    owned_journal_entry(&state, user_id, id)?;
    let Json(patch) = payload?;
    let entry = state
        .store
        .update_journal_entry(id, patch)?
        .ok_or(JournalError::NotFound {
            kind: JOURNAL_ENTRY,
            id,
        })?;
    Ok(Json(entry))
}

pub async fn delete_journal_entry(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> ApiResult<StatusCode> {
    let user_id = current_user_id(&auth_session)?;
    let id = parse_id(&raw_id, JOURNAL_ENTRY)?;
    owned_journal_entry(&state, user_id, id)?;
    if !state.store.delete_journal_entry(id)? {
        return Err(JournalError::NotFound {
            kind: JOURNAL_ENTRY,
            id,
        }
        .into());
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- metrics ---

/// Filters by `exit_date` only when both `startDate` and `endDate` are given.
pub async fn metrics(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<TradingMetrics>> {
    let user_id = current_user_id(&auth_session)?;
    let trades = trades_for(&state, user_id, &query)?;
    Ok(Json(TradingMetrics::compute(&trades)))
}

pub async fn daily_performance(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Vec<DailySummary>>> {
    let user_id = current_user_id(&auth_session)?;
    Ok(Json(daily_summary(&trades_for(&state, user_id, &query)?)))
}

pub async fn monthly_performance(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Vec<MonthlySummary>>> {
    let user_id = current_user_id(&auth_session)?;
    Ok(Json(monthly_summary(&trades_for(&state, user_id, &query)?)))
}

pub async fn session_performance(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Vec<SessionSummary>>> {
    let user_id = current_user_id(&auth_session)?;
    Ok(Json(session_summary(&trades_for(&state, user_id, &query)?)))
}

pub async fn weekday_performance(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Vec<WeekdaySummary>>> {
    let user_id = current_user_id(&auth_session)?;
    Ok(Json(weekday_summary(&trades_for(&state, user_id, &query)?)))
}

// --- export ---

fn attachment(content_type: &'static str, filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

pub async fn export(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let user_id = current_user_id(&auth_session)?;
    let format = query.format.as_deref().unwrap_or("json").to_ascii_lowercase();
    let data = query.data.as_deref().unwrap_or("trades").to_ascii_lowercase();

    match (format.as_str(), data.as_str()) {
        ("json", _) => {
            let trades = state.store.list_trades(user_id)?;
            let entries = state.store.list_journal_entries(user_id)?;
            let body = csv_export::to_json(&trades, &entries)?;
            Ok(attachment("application/json", "tradejournal-export.json", body))
        }
        ("csv", "trades") => {
            let body = csv_export::trades_to_csv(&state.store.list_trades(user_id)?)?;
            Ok(attachment("text/csv; charset=utf-8", "trades.csv", body))
        }
        ("csv", "journal") => {
            let body = csv_export::journal_to_csv(&state.store.list_journal_entries(user_id)?)?;
            Ok(attachment("text/csv; charset=utf-8", "journal.csv", body))
        }
        ("csv", other) => Err(ApiError::bad_request(format!(
            "Unknown export data {other:?}, expected trades or journal"
        ))),
        (other, _) => Err(ApiError::bad_request(format!(
            "Unknown export format {other:?}, expected csv or json"
        ))),
    }
}

pub async fn api_not_found() -> ApiError {
    ApiError::not_found("Not found")
}
