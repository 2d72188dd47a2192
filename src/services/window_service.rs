use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use thiserror::Error;

use crate::models::{TimeWindow, WindowKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("invalid-date: '{0}'")]
    InvalidDate(String),
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// `[start of today - 24h, start of today - 1ms]`
pub fn yesterday(now: DateTime<Utc>) -> TimeWindow {
    let today_start = start_of_day(now.date_naive());
    TimeWindow {
        kind: WindowKind::Yesterday,
        from: today_start - Duration::hours(24),
        to: today_start - Duration::milliseconds(1),
    }
}

/// `[January 1 00:00:00.000 of the current year, now]`
pub fn year_to_date(now: DateTime<Utc>) -> TimeWindow {
    let jan_first = NaiveDate::from_ymd_opt(now.year(), 1, 1).unwrap_or(now.date_naive());
    TimeWindow {
        kind: WindowKind::YearToDate,
        from: start_of_day(jan_first),
        to: now,
    }
}

/// Parse `YYYY-MM-DD` into `[00:00:00.000, 23:59:59.999]` of that UTC day
///
/// A zero or non-numeric component is rejected, and so is a day that does
/// not exist in the calendar.
pub fn day(date_str: &str) -> Result<TimeWindow, WindowError> {
    let invalid = || WindowError::InvalidDate(date_str.to_string());

    let mut parts = date_str.split('-').map(|p| p.trim());
    let year: i32 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
    let month: u32 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
    let dom: u32 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
    if year == 0 || month == 0 || dom == 0 {
        return Err(invalid());
    }

    let date = NaiveDate::from_ymd_opt(year, month, dom).ok_or_else(invalid)?;
    let from = start_of_day(date);
    Ok(TimeWindow {
        kind: WindowKind::Day(date),
        from,
        to: from + Duration::days(1) - Duration::milliseconds(1),
    })
}

/// `YYYY-MM-DD` of `now` in UTC
pub fn today_string(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Resolve the `window` / `date` request parameters
///
/// A date always wins. Without one, `ytd` and `yesterday` pick their rule and
/// anything else means today's UTC day.
pub fn resolve(
    window_param: Option<&str>,
    date_param: Option<&str>,
    now: DateTime<Utc>,
) -> Result<TimeWindow, WindowError> {
    let window = window_param.map(|w| w.trim().to_lowercase()).unwrap_or_default();
    let date = date_param.map(str::trim).filter(|d| !d.is_empty());

    match (date, window.as_str()) {
        (Some(d), _) => day(d),
        (None, "ytd") => Ok(year_to_date(now)),
        (None, "yesterday") => Ok(yesterday(now)),
        (None, _) => day(&today_string(now)),
    }
}
