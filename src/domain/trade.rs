//! Logged trades, profit/loss and win/loss status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::JournalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "long" => Some(Direction::Long),
            "short" => Some(Direction::Short),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Win,
    Loss,
    Breakeven,
}

impl TradeStatus {
    pub fn from_profit_loss(pnl: f64) -> Self {
        if pnl > 0.0 {
            TradeStatus::Win
        } else if pnl < 0.0 {
            TradeStatus::Loss
        } else {
            TradeStatus::Breakeven
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TradeStatus::Win => "win",
            TradeStatus::Loss => "loss",
            TradeStatus::Breakeven => "breakeven",
        }
    }
}

/// Net result of a closed trade after fees, signed by direction.
pub fn profit_loss(
    direction: Direction,
    entry_price: f64,
    exit_price: f64,
    position_size: f64,
    fees: f64,
) -> f64 {
    let price_diff = match direction {
        Direction::Long => exit_price - entry_price,
        Direction::Short => entry_price - exit_price,
    };
    price_diff * position_size - fees
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: i64,
    pub user_id: i64,
    pub symbol: String,
    #[serde(rename = "tradeType")]
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub position_size: f64,
    pub entry_date: DateTime<Utc>,
    pub exit_date: DateTime<Utc>,
    pub fees: f64,
    pub instrument_type: String,
    pub setup: Option<String>,
    pub risk_reward_ratio: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub screenshots: Vec<String>,
    pub profit_loss: f64,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
}

/// A trade as submitted by a client. P/L and status are never accepted from
/// the client; they are derived when the trade is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrade {
    pub symbol: String,
    #[serde(rename = "tradeType", alias = "direction")]
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub position_size: f64,
    pub entry_date: DateTime<Utc>,
    pub exit_date: DateTime<Utc>,
    #[serde(default)]
    pub fees: f64,
    pub instrument_type: String,
    #[serde(default)]
    pub setup: Option<String>,
    #[serde(default)]
    pub risk_reward_ratio: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub screenshots: Vec<String>,
}

/// Partial update. Absent fields keep their stored value; a blank string
/// clears an optional text field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradePatch {
    pub symbol: Option<String>,
    #[serde(rename = "tradeType", alias = "direction")]
    pub direction: Option<Direction>,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub position_size: Option<f64>,
    pub entry_date: Option<DateTime<Utc>>,
    pub exit_date: Option<DateTime<Utc>>,
    pub fees: Option<f64>,
    pub instrument_type: Option<String>,
    pub setup: Option<String>,
    pub risk_reward_ratio: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub screenshots: Option<Vec<String>>,
}

impl NewTrade {
    /// Cleans free-text fields and checks every numeric and date invariant.
    pub fn normalized(mut self) -> Result<Self, JournalError> {
        self.symbol = self.symbol.trim().to_uppercase();
        self.instrument_type = self.instrument_type.trim().to_lowercase();
        self.setup = non_blank(self.setup);
        self.risk_reward_ratio = non_blank(self.risk_reward_ratio);
        self.notes = non_blank(self.notes);
        self.tags = clean_tags(self.tags);
        self.screenshots.retain(|s| !s.trim().is_empty());
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), JournalError> {
        if self.symbol.is_empty() {
            return Err(JournalError::validation("symbol", "must not be empty"));
        }
        if self.instrument_type.is_empty() {
            return Err(JournalError::validation(
                "instrumentType",
                "must not be empty",
            ));
        }
        positive("entryPrice", self.entry_price)?;
        positive("exitPrice", self.exit_price)?;
        positive("positionSize", self.position_size)?;
        if !self.fees.is_finite() || self.fees < 0.0 {
            return Err(JournalError::validation(
                "fees",
                "must be a non-negative number",
            ));
        }
        if self.exit_date < self.entry_date {
            return Err(JournalError::validation(
                "exitDate",
                "must not be before entryDate",
            ));
        }
        if !self.profit_loss().is_finite() {
            return Err(JournalError::validation("profitLoss", "out of range"));
        }
        Ok(())
    }

    pub fn profit_loss(&self) -> f64 {
        profit_loss(
            self.direction,
            self.entry_price,
            self.exit_price,
            self.position_size,
            self.fees,
        )
    }
}

impl Trade {
    /// Builds a stored trade from a submission, deriving P/L and status.
    pub fn from_new(
        id: i64,
        user_id: i64,
        new: NewTrade,
        now: DateTime<Utc>,
    ) -> Result<Self, JournalError> {
        let new = new.normalized()?;
        let pnl = new.profit_loss();
        Ok(Self {
            id,
            user_id,
            symbol: new.symbol,
            direction: new.direction,
            entry_price: new.entry_price,
            exit_price: new.exit_price,
            position_size: new.position_size,
            entry_date: new.entry_date,
            exit_date: new.exit_date,
            fees: new.fees,
            instrument_type: new.instrument_type,
            setup: new.setup,
            risk_reward_ratio: new.risk_reward_ratio,
            tags: new.tags,
            notes: new.notes,
            screenshots: new.screenshots,
            profit_loss: pnl,
            status: TradeStatus::from_profit_loss(pnl),
            created_at: now,
        })
    }

    pub fn to_new(&self) -> NewTrade {
        NewTrade {
            symbol: self.symbol.clone(),
            direction: self.direction,
            entry_price: self.entry_price,
            exit_price: self.exit_price,
            position_size: self.position_size,
            entry_date: self.entry_date,
            exit_date: self.exit_date,
            fees: self.fees,
            instrument_type: self.instrument_type.clone(),
            setup: self.setup.clone(),
            risk_reward_ratio: self.risk_reward_ratio.clone(),
            tags: self.tags.clone(),
            notes: self.notes.clone(),
            screenshots: self.screenshots.clone(),
        }
    }

    /// Returns the trade with `patch` merged in. The receiver is left
    /// untouched, so a rejected patch never reaches the store.
    pub fn apply(&self, patch: TradePatch) -> Result<Self, JournalError> {
        let merged = patch.merge_into(self.to_new());
        Self::from_new(self.id, self.user_id, merged, self.created_at)
    }
}

impl TradePatch {
    pub fn merge_into(self, mut base: NewTrade) -> NewTrade {
        if let Some(v) = self.symbol {
            base.symbol = v;
        }
        if let Some(v) = self.direction {
            base.direction = v;
        }
        if let Some(v) = self.entry_price {
            base.entry_price = v;
        }
        if let Some(v) = self.exit_price {
            base.exit_price = v;
        }
        if let Some(v) = self.position_size {
            base.position_size = v;
        }
        if let Some(v) = self.entry_date {
            base.entry_date = v;
        }
        if let Some(v) = self.exit_date {
            base.exit_date = v;
        }
        if let Some(v) = self.fees {
            base.fees = v;
        }
        if let Some(v) = self.instrument_type {
            base.instrument_type = v;
        }
        if self.setup.is_some() {
            base.setup = self.setup;
        }
        if self.risk_reward_ratio.is_some() {
            base.risk_reward_ratio = self.risk_reward_ratio;
        }
        if let Some(v) = self.tags {
            base.tags = v;
        }
        if self.notes.is_some() {
            base.notes = self.notes;
        }
        if let Some(v) = self.screenshots {
            base.screenshots = v;
        }
        base
    }
}

fn positive(field: &str, value: f64) -> Result<(), JournalError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(JournalError::validation(field, "must be a positive number"));
    }
    Ok(())
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Trims tags, drops blanks and duplicates, keeps first-seen order.
pub(crate) fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, h, 0, 0).unwrap()
    }

    fn sample_new() -> NewTrade {
        NewTrade {
            symbol: " aapl ".into(),
            direction: Direction::Long,
            entry_price: 190.25,
            exit_price: 193.45,
            position_size: 100.0,
            entry_date: ts(9),
            exit_date: ts(11),
            fees: 0.0,
            instrument_type: "Stocks".into(),
            setup: Some("breakout".into()),
            risk_reward_ratio: Some("  ".into()),
            tags: vec!["momentum".into(), " momentum ".into(), "".into()],
            notes: None,
            screenshots: vec![],
        }
    }

    #[test]
    fn long_profit_loss() {
        assert_relative_eq!(
            profit_loss(Direction::Long, 190.25, 193.45, 100.0, 0.0),
            320.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn short_profit_loss_with_fees() {
        assert_relative_eq!(
            profit_loss(Direction::Short, 420.75, 417.25, 50.0, 5.0),
            170.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn losing_long() {
        let pnl = profit_loss(Direction::Long, 275.50, 272.30, 20.0, 0.0);
        assert_relative_eq!(pnl, -64.0, epsilon = 1e-9);
        assert_eq!(TradeStatus::from_profit_loss(pnl), TradeStatus::Loss);
    }

    #[test]
    fn status_from_sign() {
        assert_eq!(TradeStatus::from_profit_loss(0.01), TradeStatus::Win);
        assert_eq!(TradeStatus::from_profit_loss(-0.01), TradeStatus::Loss);
        assert_eq!(TradeStatus::from_profit_loss(0.0), TradeStatus::Breakeven);
    }

    #[test]
    fn fees_can_turn_win_into_breakeven() {
        let pnl = profit_loss(Direction::Long, 10.0, 11.0, 10.0, 10.0);
        assert_eq!(TradeStatus::from_profit_loss(pnl), TradeStatus::Breakeven);
    }

    #[test]
    fn from_new_derives_pnl_and_cleans_fields() {
        let trade = Trade::from_new(1, 42, sample_new(), ts(12)).unwrap();
        assert_eq!(trade.symbol, "AAPL");
        assert_eq!(trade.instrument_type, "stocks");
        assert_eq!(trade.tags, vec!["momentum".to_string()]);
        assert_eq!(trade.risk_reward_ratio, None);
        assert_relative_eq!(trade.profit_loss, 320.0, epsilon = 1e-9);
        assert_eq!(trade.status, TradeStatus::Win);
        assert_eq!(trade.user_id, 42);
    }

    #[test]
    fn rejects_non_positive_price() {
        let mut new = sample_new();
        new.entry_price = 0.0;
        let err = Trade::from_new(1, 1, new, ts(12)).unwrap_err();
        assert!(matches!(err, JournalError::Validation { ref field, .. } if field == "entryPrice"));
    }

    #[test]
    fn rejects_nan_size_and_negative_fees() {
        let mut new = sample_new();
        new.position_size = f64::NAN;
        assert!(Trade::from_new(1, 1, new, ts(12)).is_err());

        let mut new = sample_new();
        new.fees = -1.0;
        assert!(Trade::from_new(1, 1, new, ts(12)).is_err());
    }

    #[test]
    fn rejects_overflowing_profit_loss() {
        for direction in [Direction::Long, Direction::Short] {
            let mut new = sample_new();
            new.direction = direction;
            new.entry_price = 1e-300;
            new.exit_price = 1e300;
            new.position_size = 1e300;
            let err = Trade::from_new(1, 1, new, ts(12)).unwrap_err();
            assert!(matches!(err, JournalError::Validation { ref field, .. } if field == "profitLoss"));
        }
    }

    #[test]
    fn patch_cannot_overflow_profit_loss() {
        let trade = Trade::from_new(3, 1, sample_new(), ts(12)).unwrap();
        let result = trade.apply(TradePatch {
            exit_price: Some(1e300),
            position_size: Some(1e300),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn rejects_exit_before_entry() {
        let mut new = sample_new();
        new.exit_date = ts(8);
        let err = Trade::from_new(1, 1, new, ts(12)).unwrap_err();
        assert!(matches!(err, JournalError::Validation { ref field, .. } if field == "exitDate"));
    }

    #[test]
    fn patch_recomputes_pnl() {
        let trade = Trade::from_new(3, 1, sample_new(), ts(12)).unwrap();
        let patched = trade
            .apply(TradePatch {
                direction: Some(Direction::Short),
                fees: Some(2.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(patched.id, 3);
        assert_eq!(patched.created_at, trade.created_at);
        assert_relative_eq!(patched.profit_loss, -322.0, epsilon = 1e-9);
        assert_eq!(patched.status, TradeStatus::Loss);
    }

    #[test]
    fn invalid_patch_is_rejected() {
        let trade = Trade::from_new(3, 1, sample_new(), ts(12)).unwrap();
        let result = trade.apply(TradePatch {
            exit_price: Some(-5.0),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn blank_patch_clears_optional_text() {
        let trade = Trade::from_new(3, 1, sample_new(), ts(12)).unwrap();
        assert!(trade.setup.is_some());
        let patched = trade
            .apply(TradePatch {
                setup: Some(String::new()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(patched.setup, None);
    }

    #[test]
    fn deserializes_client_payload() {
        let json = r#"{
            "symbol": "msft",
            "tradeType": "short",
            "entryPrice": 420.75,
            "exitPrice": 417.25,
            "positionSize": 50,
            "entryDate": "2025-03-21T15:00:00Z",
            "exitDate": "2025-03-21T15:30:00Z",
            "instrumentType": "stocks",
            "profitLoss": 99999,
            "status": "win"
        }"#;
        let new: NewTrade = serde_json::from_str(json).unwrap();
        assert_eq!(new.direction, Direction::Short);
        assert_eq!(new.fees, 0.0);
        assert!(new.tags.is_empty());
        let trade = Trade::from_new(1, 1, new, ts(12)).unwrap();
        assert_relative_eq!(trade.profit_loss, 175.0, epsilon = 1e-9);
    }

    #[test]
    fn serializes_camel_case() {
        let trade = Trade::from_new(1, 1, sample_new(), ts(12)).unwrap();
        let value = serde_json::to_value(&trade).unwrap();
        assert_eq!(value["tradeType"], "long");
        assert_eq!(value["status"], "win");
        assert!(value.get("profitLoss").is_some());
        assert!(value.get("userId").is_some());
    }
}
