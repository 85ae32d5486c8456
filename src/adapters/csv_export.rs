//! Trade and journal export as CSV or JSON.

use serde::Serialize;

use crate::domain::error::JournalError;
use crate::domain::journal::JournalEntry;
use crate::domain::trade::Trade;

const TRADE_HEADER: [&str; 18] = [
    "id",
    "symbol",
    "trade_type",
    "entry_price",
    "exit_price",
    "position_size",
    "entry_date",
    "exit_date",
    "fees",
    "instrument_type",
    "setup",
    "risk_reward_ratio",
    "tags",
    "notes",
    "screenshots",
    "profit_loss",
    "status",
    "created_at",
];

const JOURNAL_HEADER: [&str; 7] = ["id", "date", "title", "content", "mood", "tags", "created_at"];

/// Tags and screenshot URLs are each joined with `;` inside a single column.
pub fn trades_to_csv(trades: &[Trade]) -> Result<String, JournalError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(TRADE_HEADER).map_err(export_err)?;

    for t in trades {
        wtr.write_record([
            t.id.to_string(),
            t.symbol.clone(),
            t.direction.as_str().to_string(),
            t.entry_price.to_string(),
            t.exit_price.to_string(),
            t.position_size.to_string(),
            t.entry_date.to_rfc3339(),
            t.exit_date.to_rfc3339(),
            t.fees.to_string(),
            t.instrument_type.clone(),
            t.setup.clone().unwrap_or_default(),
            t.risk_reward_ratio.clone().unwrap_or_default(),
            t.tags.join(";"),
            t.notes.clone().unwrap_or_default(),
            t.screenshots.join(";"),
            t.profit_loss.to_string(),
            t.status.as_str().to_string(),
            t.created_at.to_rfc3339(),
        ])
        .map_err(export_err)?;
    }

    finish(wtr)
}

pub fn journal_to_csv(entries: &[JournalEntry]) -> Result<String, JournalError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(JOURNAL_HEADER).map_err(export_err)?;

    for e in entries {
        wtr.write_record([
            e.id.to_string(),
            e.date.to_rfc3339(),
            e.title.clone(),
            e.content.clone(),
            e.mood.map(|m| m.as_str().to_string()).unwrap_or_default(),
            e.tags.join(";"),
            e.created_at.to_rfc3339(),
        ])
        .map_err(export_err)?;
    }

    finish(wtr)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonExport<'a> {
    trades: &'a [Trade],
    journal_entries: &'a [JournalEntry],
}

pub fn to_json(trades: &[Trade], entries: &[JournalEntry]) -> Result<String, JournalError> {
    serde_json::to_string_pretty(&JsonExport {
        trades,
        journal_entries: entries,
    })
    .map_err(|e| JournalError::Export {
        reason: e.to_string(),
    })
}

fn export_err(e: csv::Error) -> JournalError {
    JournalError::Export {
        reason: format!("CSV write error: {}", e),
    }
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, JournalError> {
    let bytes = wtr.into_inner().map_err(|e| JournalError::Export {
        reason: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| JournalError::Export {
        reason: e.to_string(),
    })
}
