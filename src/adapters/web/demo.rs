//! Demo account with sample trades and journal entries.

use chrono::{DateTime, TimeZone, Utc};
use tracing::info;

use crate::domain::error::JournalError;
use crate::domain::journal::{Mood, NewJournalEntry};
use crate::domain::trade::{Direction, NewTrade};
use crate::domain::user::NewUser;
use crate::ports::store_port::JournalStore;

use super::auth::hash_password;

pub const DEMO_USERNAME: &str = "demo";
pub const DEFAULT_DEMO_PASSWORD: &str = "demo123";

fn at(day: u32, hour: u32, minute: u32) -> Result<DateTime<Utc>, JournalError> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0)
        .single()
        .ok_or_else(|| JournalError::validation("date", "invalid demo timestamp"))
}

#[allow(clippy::too_many_arguments)]
fn sample_trade(
    symbol: &str,
    direction: Direction,
    entry_price: f64,
    exit_price: f64,
    position_size: f64,
    entry_date: DateTime<Utc>,
    exit_date: DateTime<Utc>,
    setup: &str,
    notes: &str,
) -> NewTrade {
    NewTrade {
        symbol: symbol.to_string(),
        direction,
        entry_price,
        exit_price,
        position_size,
        entry_date,
        exit_date,
        fees: 0.0,
        instrument_type: "stocks".to_string(),
        setup: Some(setup.to_string()),
        risk_reward_ratio: None,
        tags: vec![setup.to_string()],
        notes: Some(notes.to_string()),
        screenshots: vec![],
    }
}

/// Creates the demo user and its sample data. Does nothing when a `demo`
/// account already exists, so restarts against SQLite do not duplicate rows.
/// Returns whether anything was written.
pub fn seed_demo_data(store: &dyn JournalStore, password: &str) -> Result<bool, JournalError> {
    if store.get_user_by_username(DEMO_USERNAME)?.is_some() {
        info!("demo user already present, skipping seed");
        return Ok(false);
    }

    let user = store.create_user(NewUser {
        username: DEMO_USERNAME.to_string(),
        password_hash: hash_password(password)?,
        name: Some("Demo User".to_string()),
        email: Some("demo@example.com".to_string()),
    })?;

    let trades = [
        sample_trade(
            "AAPL",
            Direction::Long,
            190.25,
            193.45,
            100.0,
            at(20, 9, 35)?,
            at(20, 10, 5)?,
            "breakout",
            "Strong momentum after earnings",
        ),
        sample_trade(
            "MSFT",
            Direction::Short,
            420.75,
            417.25,
            50.0,
            at(21, 15, 0)?,
            at(21, 15, 40)?,
            "reversal",
            "Overbought on 5min chart",
        ),
        sample_trade(
            "TSLA",
            Direction::Long,
            275.50,
            272.30,
            20.0,
            at(22, 9, 45)?,
            at(22, 9, 58)?,
            "breakout",
            "Failed breakout, stopped out",
        ),
    ];
    for trade in trades {
        store.create_trade(user.id, trade)?;
    }

    let entries = [
        NewJournalEntry {
            title: "Strong trading day".to_string(),
            content: "Market showed clear direction today. My breakout strategy worked well \
                      with tech stocks. Need to focus more on position sizing."
                .to_string(),
            date: at(20, 0, 0)?,
            mood: Some(Mood::Positive),
            tags: vec![],
        },
        NewJournalEntry {
            title: "Lessons from today".to_string(),
            content: "Overtraded in the morning session. Need to be more patient and wait for \
                      proper setups. Tesla trade was entered too early without confirmation."
                .to_string(),
            date: at(22, 0, 0)?,
            mood: Some(Mood::Neutral),
            tags: vec![],
        },
    ];
    for entry in entries {
        store.create_journal_entry(user.id, entry)?;
    }

    info!(user_id = user.id, "seeded demo user with sample data");
    Ok(true)
}
