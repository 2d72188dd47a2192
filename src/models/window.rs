//! Time window models

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Which rule produced a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Yesterday,
    YearToDate,
    Day(NaiveDate),
}

/// A closed UTC interval `[from, to]`
///
/// Computed fresh per request and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub kind: WindowKind,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn from_ms(&self) -> i64 {
        self.from.timestamp_millis()
    }

    pub fn to_ms(&self) -> i64 {
        self.to.timestamp_millis()
    }

    /// Length of the interval, never negative
    pub fn span(&self) -> chrono::Duration {
        (self.to - self.from).max(chrono::Duration::zero())
    }

    /// Label used for the response `window` field and the cache key
    pub fn label(&self) -> String {
        match self.kind {
            WindowKind::Yesterday => "yesterday".to_string(),
            WindowKind::YearToDate => "ytd".to_string(),
            WindowKind::Day(date) => format!("date:{}", date.format("%Y-%m-%d")),
        }
    }

    pub fn from_iso(&self) -> String {
        iso_millis(self.from)
    }

    pub fn to_iso(&self) -> String {
        iso_millis(self.to)
    }
}

/// `2024-03-14T00:00:00.000Z`
pub fn iso_millis(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}
