//! Trading performance metrics derived from a user's trades.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::date_range::DateRange;
use super::trade::Trade;

/// Coarse time-of-day bucket of a trade's entry hour (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Session {
    Morning,
    Midday,
    Afternoon,
    Evening,
}

impl Session {
    pub const ALL: [Session; 4] = [
        Session::Morning,
        Session::Midday,
        Session::Afternoon,
        Session::Evening,
    ];

    /// morning [4,10), midday [10,14), afternoon [14,18), evening otherwise.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            4..=9 => Session::Morning,
            10..=13 => Session::Midday,
            14..=17 => Session::Afternoon,
            _ => Session::Evening,
        }
    }

    pub fn of(entry: DateTime<Utc>) -> Self {
        Self::from_hour(entry.hour())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Session::Morning => "morning",
            Session::Midday => "midday",
            Session::Afternoon => "afternoon",
            Session::Evening => "evening",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingMetrics {
    pub total_trades: usize,
    /// Percent of trades with positive P/L, 0-100.
    pub win_rate: f64,
    pub total_profit_loss: f64,
    pub avg_trade_profit: f64,
    pub profit_factor: f64,
    pub largest_win: f64,
    /// Magnitude of the worst loss, always >= 0.
    pub largest_loss: f64,
    pub profit_by_instrument: BTreeMap<String, f64>,
    pub profit_by_session: BTreeMap<Session, f64>,
}

impl Default for TradingMetrics {
    fn default() -> Self {
        Self {
            total_trades: 0,
            win_rate: 0.0,
            total_profit_loss: 0.0,
            avg_trade_profit: 0.0,
            profit_factor: 0.0,
            largest_win: 0.0,
            largest_loss: 0.0,
            profit_by_instrument: BTreeMap::new(),
            profit_by_session: empty_sessions(),
        }
    }
}

impl TradingMetrics {
    pub fn compute<'a, I>(trades: I) -> Self
    where
        I: IntoIterator<Item = &'a Trade>,
    {
        let mut metrics = Self::default();
        let mut trades_won = 0usize;
        let mut gross_wins = 0.0_f64;
        let mut gross_losses = 0.0_f64;

        for trade in trades {
            let pnl = trade.profit_loss;
            metrics.total_trades += 1;
            metrics.total_profit_loss += pnl;

            if pnl > 0.0 {
                trades_won += 1;
                gross_wins += pnl;
                if pnl > metrics.largest_win {
                    metrics.largest_win = pnl;
                }
            } else if pnl < 0.0 {
                gross_losses += pnl.abs();
                if pnl.abs() > metrics.largest_loss {
                    metrics.largest_loss = pnl.abs();
                }
            }

            *metrics
                .profit_by_instrument
                .entry(trade.instrument_type.clone())
                .or_insert(0.0) += pnl;
            *metrics
                .profit_by_session
                .entry(Session::of(trade.entry_date))
                .or_insert(0.0) += pnl;
        }

        if metrics.total_trades == 0 {
            return metrics;
        }

        let total = metrics.total_trades as f64;
        metrics.win_rate = trades_won as f64 / total * 100.0;
        metrics.avg_trade_profit = metrics.total_profit_loss / total;
        // No losing trades: report gross wins so the value stays finite.
        metrics.profit_factor = if gross_losses > 0.0 {
            gross_wins / gross_losses
        } else {
            gross_wins
        };

        metrics
    }

    /// Metrics over trades whose exit falls inside `range`, or all trades.
    pub fn compute_in_range(trades: &[Trade], range: Option<&DateRange>) -> Self {
        match range {
            Some(r) => Self::compute(trades.iter().filter(|t| r.contains(t.exit_date))),
            None => Self::compute(trades),
        }
    }
}

pub(crate) fn empty_sessions() -> BTreeMap<Session, f64> {
    Session::ALL.iter().map(|s| (*s, 0.0)).collect()
}
