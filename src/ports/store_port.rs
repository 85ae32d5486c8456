//! Storage port for users, trades and journal entries.
//!
//! Implementations do not check ownership; callers compare `user_id` against
//! the authenticated user before handing a record out or changing it.

use crate::domain::date_range::DateRange;
use crate::domain::error::JournalError;
use crate::domain::journal::{JournalEntry, JournalPatch, NewJournalEntry};
use crate::domain::trade::{NewTrade, Trade, TradePatch};
use crate::domain::user::{NewUser, User};

pub trait JournalStore {
    fn get_user(&self, id: i64) -> Result<Option<User>, JournalError>;

    /// Case-insensitive lookup.
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>, JournalError>;

    /// Fails with [`JournalError::UsernameTaken`] when the name is in use.
    fn create_user(&self, user: NewUser) -> Result<User, JournalError>;

    /// Newest exit first.
    fn list_trades(&self, user_id: i64) -> Result<Vec<Trade>, JournalError>;

    /// Trades whose exit falls inside `range`, newest exit first.
    fn list_trades_in_range(
        &self,
        user_id: i64,
        range: &DateRange,
    ) -> Result<Vec<Trade>, JournalError> {
        let mut trades = self.list_trades(user_id)?;
        trades.retain(|t| range.contains(t.exit_date));
        Ok(trades)
    }

    fn get_trade(&self, id: i64) -> Result<Option<Trade>, JournalError>;
    fn create_trade(&self, user_id: i64, trade: NewTrade) -> Result<Trade, JournalError>;

    /// `Ok(None)` when no trade has this id.
    fn update_trade(&self, id: i64, patch: TradePatch) -> Result<Option<Trade>, JournalError>;

    /// `Ok(false)` when no trade has this id.
    fn delete_trade(&self, id: i64) -> Result<bool, JournalError>;

    /// Newest entry date first.
    fn list_journal_entries(&self, user_id: i64) -> Result<Vec<JournalEntry>, JournalError>;
    fn get_journal_entry(&self, id: i64) -> Result<Option<JournalEntry>, JournalError>;
    fn create_journal_entry(
        &self,
        user_id: i64,
        entry: NewJournalEntry,
    ) -> Result<JournalEntry, JournalError>;
    fn update_journal_entry(
        &self,
        id: i64,
        patch: JournalPatch,
    ) -> Result<Option<JournalEntry>, JournalError>;
    fn delete_journal_entry(&self, id: i64) -> Result<bool, JournalError>;
}

/// Newest exit first, ties broken by id so listings are stable.
pub(crate) fn sort_trades(trades: &mut [Trade]) {
    trades.sort_by(|a, b| b.exit_date.cmp(&a.exit_date).then(b.id.cmp(&a.id)));
}

pub(crate) fn sort_journal_entries(entries: &mut [JournalEntry]) {
    entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
}
