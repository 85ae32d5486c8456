//! Inclusive UTC date ranges used to filter trades by exit time.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};

use super::error::JournalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, JournalError> {
        if start > end {
            return Err(JournalError::validation(
                "startDate",
                "must not be after endDate",
            ));
        }
        Ok(Self { start, end })
    }

    /// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates. A plain end
    /// date covers that whole day.
    pub fn parse(start: &str, end: &str) -> Result<Self, JournalError> {
        let start = parse_bound("startDate", start, Bound::Start)?;
        let end = parse_bound("endDate", end, Bound::End)?;
        Self::new(start, end)
    }

    /// Builds a range only when both ends are given; either alone is ignored.
    pub fn from_optional(
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Option<Self>, JournalError> {
        match (start, end) {
            (Some(s), Some(e)) if !s.is_empty() && !e.is_empty() => Self::parse(s, e).map(Some),
            _ => Ok(None),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

fn parse_bound(field: &str, raw: &str, bound: Bound) -> Result<DateTime<Utc>, JournalError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        JournalError::validation(field, format!("expected YYYY-MM-DD or RFC 3339, got {raw:?}"))
    })?;
    let start_of_day = date.and_time(NaiveTime::MIN).and_utc();
    Ok(match bound {
        Bound::Start => start_of_day,
        Bound::End => start_of_day + TimeDelta::days(1) - TimeDelta::nanoseconds(1),
    })
}
