//! In-memory store. The default backend; contents are lost on restart.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::error::JournalError;
use crate::domain::journal::{JournalEntry, JournalPatch, NewJournalEntry};
use crate::domain::trade::{NewTrade, Trade, TradePatch};
use crate::domain::user::{NewUser, User};
use crate::ports::store_port::{JournalStore, sort_journal_entries, sort_trades};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    trades: BTreeMap<i64, Trade>,
    journal_entries: BTreeMap<i64, JournalEntry>,
    next_user_id: i64,
    next_trade_id: i64,
    next_journal_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, JournalError> {
        self.tables.read().map_err(|e| JournalError::Database {
            reason: e.to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, JournalError> {
        self.tables.write().map_err(|e| JournalError::Database {
            reason: e.to_string(),
        })
    }
}

impl JournalStore for MemoryStore {
    fn get_user(&self, id: i64) -> Result<Option<User>, JournalError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>, JournalError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.matches_username(username))
            .cloned())
    }

    fn create_user(&self, user: NewUser) -> Result<User, JournalError> {
        let mut tables = self.write()?;
        if tables
            .users
            .values()
            .any(|u| u.matches_username(&user.username))
        {
            return Err(JournalError::UsernameTaken {
                username: user.username,
            });
        }
        let id = Tables::next_id(&mut tables.next_user_id);
        let user = User::from_new(id, user, Utc::now());
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    fn list_trades(&self, user_id: i64) -> Result<Vec<Trade>, JournalError> {
        let mut trades: Vec<Trade> = self
            .read()?
            .trades
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        sort_trades(&mut trades);
        Ok(trades)
    }

    fn get_trade(&self, id: i64) -> Result<Option<Trade>, JournalError> {
        Ok(self.read()?.trades.get(&id).cloned())
    }

    fn create_trade(&self, user_id: i64, trade: NewTrade) -> Result<Trade, JournalError> {
        let mut tables = self.write()?;
        // Validate before taking an id so a rejected trade leaves no gap.
        let mut trade = Trade::from_new(0, user_id, trade, Utc::now())?;
        trade.id = Tables::next_id(&mut tables.next_trade_id);
        tables.trades.insert(trade.id, trade.clone());
        Ok(trade)
    }

    fn update_trade(&self, id: i64, patch: TradePatch) -> Result<Option<Trade>, JournalError> {
        let mut tables = self.write()?;
        let Some(existing) = tables.trades.get(&id) else {
            return Ok(None);
        };
        let updated = existing.apply(patch)?;
        tables.trades.insert(id, updated.clone());
        Ok(Some(updated))
    }

    fn delete_trade(&self, id: i64) -> Result<bool, JournalError> {
        Ok(self.write()?.trades.remove(&id).is_some())
    }

    fn list_journal_entries(&self, user_id: i64) -> Result<Vec<JournalEntry>, JournalError> {
        let mut entries: Vec<JournalEntry> = self
            .read()?
            .journal_entries
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        sort_journal_entries(&mut entries);
        Ok(entries)
    }

    fn get_journal_entry(&self, id: i64) -> Result<Option<JournalEntry>, JournalError> {
        Ok(self.read()?.journal_entries.get(&id).cloned())
    }

    fn create_journal_entry(
        &self,
        user_id: i64,
        entry: NewJournalEntry,
    ) -> Result<JournalEntry, JournalError> {
        let mut tables = self.write()?;
        let mut entry = JournalEntry::from_new(0, user_id, entry, Utc::now())?;
        entry.id = Tables::next_id(&mut tables.next_journal_id);
        tables.journal_entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn update_journal_entry(
        &self,
        id: i64,
        patch: JournalPatch,
    ) -> Result<Option<JournalEntry>, JournalError> {
        let mut tables = self.write()?;
        let Some(existing) = tables.journal_entries.get(&id) else {
            return Ok(None);
        };
        let updated = existing.apply(patch)?;
        tables.journal_entries.insert(id, updated.clone());
        Ok(Some(updated))
    }

    fn delete_journal_entry(&self, id: i64) -> Result<bool, JournalError> {
        Ok(self.write()?.journal_entries.remove(&id).is_some())
    }
}
