//! SQLite-backed store.
//!
//! Same contract as the in-memory store, one table per record type. Tag and
//! screenshot lists are JSON text; timestamps are fixed-width RFC 3339 text so
//! they sort lexically.

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{ErrorCode, OptionalExtension, Row, params};

use crate::domain::date_range::DateRange;
use crate::domain::error::JournalError;
use crate::domain::journal::{JournalEntry, JournalPatch, Mood, NewJournalEntry};
use crate::domain::trade::{Direction, NewTrade, Trade, TradePatch, TradeStatus};
use crate::domain::user::{NewUser, User};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::JournalStore;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE COLLATE NOCASE,
        password_hash TEXT NOT NULL,
        name TEXT,
        email TEXT,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS trades (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        symbol TEXT NOT NULL,
        trade_type TEXT NOT NULL,
        entry_price REAL NOT NULL,
        exit_price REAL NOT NULL,
        position_size REAL NOT NULL,
        entry_date TEXT NOT NULL,
        exit_date TEXT NOT NULL,
        fees REAL NOT NULL DEFAULT 0,
        instrument_type TEXT NOT NULL,
        setup TEXT,
        risk_reward_ratio TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        notes TEXT,
        screenshots TEXT NOT NULL DEFAULT '[]',
        profit_loss REAL NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_trades_user_exit ON trades(user_id, exit_date);
    CREATE TABLE IF NOT EXISTS journal_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        date TEXT NOT NULL,
        mood TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_journal_user_date ON journal_entries(user_id, date);";

const TRADE_COLUMNS: &str = "id, user_id, symbol, trade_type, entry_price, exit_price,
    position_size, entry_date, exit_date, fees, instrument_type, setup,
    risk_reward_ratio, tags, notes, screenshots, profit_loss, status, created_at";

const JOURNAL_COLUMNS: &str = "id, user_id, title, content, date, mood, tags, created_at";

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> JournalError {
    JournalError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> JournalError {
    JournalError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn to_text(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_err(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn unknown_value(idx: usize, value: &str) -> rusqlite::Error {
    conversion_err(
        idx,
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unexpected value {value:?}"),
        ),
    )
}

fn ts_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn list_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_err(idx, e))
}

fn list_text(items: &[String]) -> Result<String, JournalError> {
    serde_json::to_string(items).map_err(|e| JournalError::DatabaseQuery {
        reason: e.to_string(),
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        email: row.get(4)?,
        created_at: ts_at(row, 5)?,
    })
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<Trade> {
    let direction: String = row.get(3)?;
    let status: String = row.get(17)?;
    Ok(Trade {
        id: row.get(0)?,
        user_id: row.get(1)?,
        symbol: row.get(2)?,
        direction: Direction::parse(&direction).ok_or_else(|| unknown_value(3, &direction))?,
        entry_price: row.get(4)?,
        exit_price: row.get(5)?,
        position_size: row.get(6)?,
        entry_date: ts_at(row, 7)?,
        exit_date: ts_at(row, 8)?,
        fees: row.get(9)?,
        instrument_type: row.get(10)?,
        setup: row.get(11)?,
        risk_reward_ratio: row.get(12)?,
        tags: list_at(row, 13)?,
        notes: row.get(14)?,
        screenshots: list_at(row, 15)?,
        profit_loss: row.get(16)?,
        status: match status.as_str() {
            "win" => TradeStatus::Win,
            "loss" => TradeStatus::Loss,
            "breakeven" => TradeStatus::Breakeven,
            other => return Err(unknown_value(17, other)),
        },
        created_at: ts_at(row, 18)?,
    })
}

fn journal_from_row(row: &Row<'_>) -> rusqlite::Result<JournalEntry> {
    let mood: Option<String> = row.get(5)?;
    let mood = match mood {
        Some(m) => Some(Mood::parse(&m).ok_or_else(|| unknown_value(5, &m))?),
        None => None,
    };
    Ok(JournalEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        date: ts_at(row, 4)?,
        mood,
        tags: list_at(row, 6)?,
        created_at: ts_at(row, 7)?,
    })
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, JournalError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| JournalError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Single-connection pool; every connection to `:memory:` is its own
    /// database.
    pub fn in_memory() -> Result<Self, JournalError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn initialize_schema(&self) -> Result<(), JournalError> {
        self.conn()?.execute_batch(SCHEMA).map_err(query_err)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, JournalError> {
        self.pool.get().map_err(pool_err)
    }

    fn query_trades(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Trade>, JournalError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(query_err)?;
        let rows = stmt.query_map(params, trade_from_row).map_err(query_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(query_err)
    }

    fn write_trade(&self, trade: &Trade, insert: bool) -> Result<i64, JournalError> {
        let conn = self.conn()?;
        let tags = list_text(&trade.tags)?;
        let screenshots = list_text(&trade.screenshots)?;
        let sql = if insert {
            "INSERT INTO trades (user_id, symbol, trade_type, entry_price, exit_price,
                position_size, entry_date, exit_date, fees, instrument_type, setup,
                risk_reward_ratio, tags, notes, screenshots, profit_loss, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
        } else {
            "UPDATE trades SET user_id = ?1, symbol = ?2, trade_type = ?3, entry_price = ?4,
                exit_price = ?5, position_size = ?6, entry_date = ?7, exit_date = ?8, fees = ?9,
                instrument_type = ?10, setup = ?11, risk_reward_ratio = ?12, tags = ?13,
                notes = ?14, screenshots = ?15, profit_loss = ?16, status = ?17, created_at = ?18
             WHERE id = ?19"
        };
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(trade.user_id),
            Box::new(trade.symbol.clone()),
            Box::new(trade.direction.as_str()),
            Box::new(trade.entry_price),
            Box::new(trade.exit_price),
            Box::new(trade.position_size),
            Box::new(to_text(trade.entry_date)),
            Box::new(to_text(trade.exit_date)),
            Box::new(trade.fees),
            Box::new(trade.instrument_type.clone()),
            Box::new(trade.setup.clone()),
            Box::new(trade.risk_reward_ratio.clone()),
            Box::new(tags),
            Box::new(trade.notes.clone()),
            Box::new(screenshots),
            Box::new(trade.profit_loss),
            Box::new(trade.status.as_str()),
            Box::new(to_text(trade.created_at)),
        ];
        if !insert {
            values.push(Box::new(trade.id));
        }
        conn.execute(sql, rusqlite::params_from_iter(values.iter()))
            .map_err(query_err)?;
        Ok(if insert { conn.last_insert_rowid() } else { trade.id })
    }

    fn write_journal_entry(&self, entry: &JournalEntry, insert: bool) -> Result<i64, JournalError> {
        let conn = self.conn()?;
        let tags = list_text(&entry.tags)?;
        let mood = entry.mood.map(Mood::as_str);
        if insert {
            conn.execute(
                "INSERT INTO journal_entries (user_id, title, content, date, mood, tags, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.user_id,
                    entry.title,
                    entry.content,
                    to_text(entry.date),
                    mood,
                    tags,
                    to_text(entry.created_at)
                ],
            )
            .map_err(query_err)?;
            Ok(conn.last_insert_rowid())
        } else {
            conn.execute(
                "UPDATE journal_entries SET title = ?1, content = ?2, date = ?3, mood = ?4, tags = ?5
                 WHERE id = ?6",
                params![
                    entry.title,
                    entry.content,
                    to_text(entry.date),
                    mood,
                    tags,
                    entry.id
                ],
            )
            .map_err(query_err)?;
            Ok(entry.id)
        }
    }
}

impl JournalStore for SqliteStore {
    fn get_user(&self, id: i64) -> Result<Option<User>, JournalError> {
        self.conn()?
            .query_row(
                "SELECT id, username, password_hash, name, email, created_at
                 FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()
            .map_err(query_err)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>, JournalError> {
        self.conn()?
            .query_row(
                "SELECT id, username, password_hash, name, email, created_at
                 FROM users WHERE username = ?1 COLLATE NOCASE",
                params![username],
                user_from_row,
            )
            .optional()
            .map_err(query_err)
    }

    fn create_user(&self, user: NewUser) -> Result<User, JournalError> {
        let conn = self.conn()?;
        let created = User::from_new(0, user, Utc::now());
        let result = conn.execute(
            "INSERT INTO users (username, password_hash, name, email, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                created.username,
                created.password_hash,
                created.name,
                created.email,
                to_text(created.created_at)
            ],
        );
        match result {
            Ok(_) => Ok(User {
                id: conn.last_insert_rowid(),
                ..created
            }),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(JournalError::UsernameTaken {
                    username: created.username,
                })
            }
            Err(e) => Err(query_err(e)),
        }
    }

    fn list_trades(&self, user_id: i64) -> Result<Vec<Trade>, JournalError> {
        self.query_trades(
            &format!(
                "SELECT {TRADE_COLUMNS} FROM trades WHERE user_id = ?1
                 ORDER BY exit_date DESC, id DESC"
            ),
            &[&user_id],
        )
    }

    fn list_trades_in_range(
        &self,
        user_id: i64,
        range: &DateRange,
    ) -> Result<Vec<Trade>, JournalError> {
        self.query_trades(
            &format!(
                "SELECT {TRADE_COLUMNS} FROM trades
                 WHERE user_id = ?1 AND exit_date >= ?2 AND exit_date <= ?3
                 ORDER BY exit_date DESC, id DESC"
            ),
            &[&user_id, &to_text(range.start), &to_text(range.end)],
        )
    }

    fn get_trade(&self, id: i64) -> Result<Option<Trade>, JournalError> {
        self.conn()?
            .query_row(
                &format!("SELECT {TRADE_COLUMNS} FROM trades WHERE id = ?1"),
                params![id],
                trade_from_row,
            )
            .optional()
            .map_err(query_err)
    }

    fn create_trade(&self, user_id: i64, trade: NewTrade) -> Result<Trade, JournalError> {
        let trade = Trade::from_new(0, user_id, trade, Utc::now())?;
        let id = self.write_trade(&trade, true)?;
        Ok(Trade { id, ..trade })
    }

    fn update_trade(&self, id: i64, patch: TradePatch) -> Result<Option<Trade>, JournalError> {
        let Some(existing) = self.get_trade(id)? else {
            return Ok(None);
        };
        let updated = existing.apply(patch)?;
        self.write_trade(&updated, false)?;
        Ok(Some(updated))
    }

    fn delete_trade(&self, id: i64) -> Result<bool, JournalError> {
        let removed = self
            .conn()?
            .execute("DELETE FROM trades WHERE id = ?1", params![id])
            .map_err(query_err)?;
        Ok(removed > 0)
    }

    fn list_journal_entries(&self, user_id: i64) -> Result<Vec<JournalEntry>, JournalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {JOURNAL_COLUMNS} FROM journal_entries WHERE user_id = ?1
                 ORDER BY date DESC, id DESC"
            ))
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![user_id], journal_from_row)
            .map_err(query_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(query_err)
    }

    fn get_journal_entry(&self, id: i64) -> Result<Option<JournalEntry>, JournalError> {
        self.conn()?
            .query_row(
                &format!("SELECT {JOURNAL_COLUMNS} FROM journal_entries WHERE id = ?1"),
                params![id],
                journal_from_row,
            )
            .optional()
            .map_err(query_err)
    }

    fn create_journal_entry(
        &self,
        user_id: i64,
        entry: NewJournalEntry,
    ) -> Result<JournalEntry, JournalError> {
        let entry = JournalEntry::from_new(0, user_id, entry, Utc::now())?;
        let id = self.write_journal_entry(&entry, true)?;
        Ok(JournalEntry { id, ..entry })
    }

    fn update_journal_entry(
        &self,
        id: i64,
        patch: JournalPatch,
    ) -> Result<Option<JournalEntry>, JournalError> {
        let Some(existing) = self.get_journal_entry(id)? else {
            return Ok(None);
        };
        let updated = existing.apply(patch)?;
        self.write_journal_entry(&updated, false)?;
        Ok(Some(updated))
    }

    fn delete_journal_entry(&self, id: i64) -> Result<bool, JournalError> {
        let removed = self
            .conn()?
            .execute("DELETE FROM journal_entries WHERE id = ?1", params![id])
            .map_err(query_err)?;
        Ok(removed > 0)
    }
}
