//! Calendar and analytics breakdowns: per day, month, session and weekday.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

use super::metrics::Session;
use super::trade::{Trade, TradeStatus};

#[derive(Debug, Clone, Default, PartialEq)]
struct Tally {
    trades: usize,
    wins: usize,
    losses: usize,
    profit_loss: f64,
}

impl Tally {
    fn add(&mut self, trade: &Trade) {
        self.trades += 1;
        self.profit_loss += trade.profit_loss;
        match trade.status {
            TradeStatus::Win => self.wins += 1,
            TradeStatus::Loss => self.losses += 1,
            TradeStatus::Breakeven => {}
        }
    }

    fn win_rate(&self) -> f64 {
        if self.trades == 0 {
            0.0
        } else {
            self.wins as f64 / self.trades as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub profit_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    /// `YYYY-MM`
    pub month: String,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub profit_loss: f64,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session: Session,
    pub trades: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub profit_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdaySummary {
    pub weekday: String,
    pub trades: usize,
    pub profit_loss: f64,
}

/// One row per calendar day with at least one exit, oldest first.
pub fn daily_summary(trades: &[Trade]) -> Vec<DailySummary> {
    let mut days: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
    for trade in trades {
        days.entry(trade.exit_date.date_naive())
            .or_default()
            .add(trade);
    }
    days.into_iter()
        .map(|(date, t)| DailySummary {
            date,
            trades: t.trades,
            wins: t.wins,
            losses: t.losses,
            profit_loss: t.profit_loss,
        })
        .collect()
}

/// One row per month with at least one exit, newest first.
pub fn monthly_summary(trades: &[Trade]) -> Vec<MonthlySummary> {
    let mut months: BTreeMap<(i32, u32), Tally> = BTreeMap::new();
    for trade in trades {
        let d = trade.exit_date;
        months.entry((d.year(), d.month())).or_default().add(trade);
    }
    months
        .into_iter()
        .rev()
        .map(|((year, month), t)| MonthlySummary {
            month: format!("{year:04}-{month:02}"),
            trades: t.trades,
            wins: t.wins,
            losses: t.losses,
            profit_loss: t.profit_loss,
            win_rate: t.win_rate(),
        })
        .collect()
}

/// Always four rows, morning through evening.
pub fn session_summary(trades: &[Trade]) -> Vec<SessionSummary> {
    let mut sessions: BTreeMap<Session, Tally> =
        Session::ALL.iter().map(|s| (*s, Tally::default())).collect();
    for trade in trades {
        sessions
            .entry(Session::of(trade.entry_date))
            .or_default()
            .add(trade);
    }
    sessions
        .into_iter()
        .map(|(session, t)| SessionSummary {
            session,
            trades: t.trades,
            wins: t.wins,
            win_rate: t.win_rate(),
            profit_loss: t.profit_loss,
        })
        .collect()
}

/// Always seven rows, Monday through Sunday.
pub fn weekday_summary(trades: &[Trade]) -> Vec<WeekdaySummary> {
    let mut days = [(0usize, 0.0_f64); 7];
    for trade in trades {
        let idx = trade.exit_date.weekday().num_days_from_monday() as usize;
        days[idx].0 += 1;
        days[idx].1 += trade.profit_loss;
    }
    let mut weekday = Weekday::Mon;
    days.iter()
        .map(|(count, pnl)| {
            let row = WeekdaySummary {
                weekday: weekday_name(weekday).to_string(),
                trades: *count,
                profit_loss: *pnl,
            };
            weekday = weekday.succ();
            row
        })
        .collect()
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}
