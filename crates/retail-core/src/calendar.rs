use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::Serialize;

// ── Timestamp parsing ─────────────────────────────────────────────────────────

/// Date-time layouts accepted for the `InvoiceDate` column, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    // Two-digit years first so "1/4/11" is not read as year 11.
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse an invoice timestamp string into a naive (wall-clock) date-time.
///
/// Handles RFC 3339 (offset is dropped, wall-clock time kept), ISO 8601
/// without offset, US-style `M/D/YYYY H:MM` as found in spreadsheet CSV
/// exports, and bare `YYYY-MM-DD` dates (midnight).
///
/// Returns `None` for empty strings or unrecognised formats.
///
/// # Examples
///
/// ```
/// use retail_core::calendar::parse_timestamp;
///
/// assert!(parse_timestamp("12/1/2010 8:26").is_some());
/// assert!(parse_timestamp("2011-03-01").is_some());
/// assert!(parse_timestamp("not a date").is_none());
/// ```
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive);
        }
    }

    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

// ── Calendar decomposition ────────────────────────────────────────────────────

/// Calendar fields derived from an invoice timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarParts {
    pub year: i32,
    /// Month number, 1–12.
    pub month: u32,
    pub month_name: &'static str,
    /// Quarter, 1–4.
    pub quarter: u32,
    /// ISO 8601 week number.
    pub iso_week: u32,
    pub day_of_week: &'static str,
    pub date: NaiveDate,
    /// `YYYY-MM` period key.
    pub year_month: String,
}

impl CalendarParts {
    /// Decompose `ts` into its calendar fields.
    pub fn from_datetime(ts: &NaiveDateTime) -> Self {
        let date = ts.date();
        let year = date.year();
        let month = date.month();
        Self {
            year,
            month,
            month_name: month_name(month),
            quarter: quarter_of(month),
            iso_week: date.iso_week().week(),
            day_of_week: weekday_name(date.weekday()),
            date,
            year_month: year_month_key(year, month),
        }
    }
}

/// Format the `YYYY-MM` period key.
pub fn year_month_key(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

/// Quarter (1–4) containing `month`.
pub fn quarter_of(month: u32) -> u32 {
    (month.saturating_sub(1)) / 3 + 1
}

/// Full English month name for a 1-based month number.
pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

/// Full English weekday name.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
