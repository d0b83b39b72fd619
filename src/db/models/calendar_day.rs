//! Calendar-date bounds for ranged reading queries.
//!
//! Dates arrive as `Y-M-D` strings with the month limited to 1..=12 and the
//! day to 1..=31. No further calendar check is made: a day past the end of
//! its month rolls into the next month when converted to a timestamp, so
//! `2024-02-30` starts at `2024-03-01 00:00:00`. Bounds are computed in UTC,
//! the same clock SQLite uses for the stored `timestamp` default.

use std::fmt;

use chrono::{Days, NaiveDate};
use thiserror::Error;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidDate {
    #[error("expected a date shaped like YYYY-MM-DD, got '{0}'")]
    Malformed(String),
    #[error("month {0} is outside 1..=12")]
    Month(i64),
    #[error("day {0} is outside 1..=31")]
    Day(i64),
    #[error("year {0} is outside the supported range")]
    Year(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    year: i32,
    month: u32,
    day: u32,
    start: i64,
}

impl CalendarDay {
    pub fn new(year: i64, month: i64, day: i64) -> Result<Self, InvalidDate> {
        if !(1..=12).contains(&month) {
            return Err(InvalidDate::Month(month));
        }
        if !(1..=31).contains(&day) {
            return Err(InvalidDate::Day(day));
        }
        let year_i32 = i32::try_from(year).map_err(|_| InvalidDate::Year(year))?;

        let start = NaiveDate::from_ymd_opt(year_i32, month as u32, 1)
            .and_then(|first| first.checked_add_days(Days::new(day as u64 - 1)))
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .ok_or(InvalidDate::Year(year))?
            .and_utc()
            .timestamp();

        Ok(Self {
            year: year_i32,
            month: month as u32,
            day: day as u32,
            start,
        })
    }

    /// Parses `%d-%d-%d`: optional leading whitespace, signed integers
    /// separated by dashes. Anything after the day is ignored.
    pub fn parse(input: &str) -> Result<Self, InvalidDate> {
        let malformed = || InvalidDate::Malformed(input.to_string());

        let mut rest = input;
        let year = scan_int(&mut rest).ok_or_else(malformed)?;
        rest = rest.strip_prefix('-').ok_or_else(malformed)?;
        let month = scan_int(&mut rest).ok_or_else(malformed)?;
        rest = rest.strip_prefix('-').ok_or_else(malformed)?;
        let day = scan_int(&mut rest).ok_or_else(malformed)?;

        Self::new(year, month, day)
    }

    /// First second of the day.
    pub fn start_timestamp(&self) -> i64 {
        self.start
    }

    /// Last second of the day (`23:59:59`).
    pub fn end_timestamp(&self) -> i64 {
        self.start + SECONDS_PER_DAY - 1
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

fn scan_int(input: &mut &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let bytes = trimmed.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }

    let value = trimmed[..end].parse().ok()?;
    *input = &trimmed[end..];
    Some(value)
}
