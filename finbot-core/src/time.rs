//! Time utilities: ledger rows are written in the user's local timezone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";

/// Parse an IANA timezone name like "Asia/Jakarta".
pub fn parse_timezone(tz: &str) -> Option<Tz> {
    tz.trim().parse().ok()
}

/// Local calendar date and wall-clock time of a UTC instant.
pub fn local_date_time(ts: DateTime<Utc>, tz: Tz) -> (NaiveDate, NaiveTime) {
    let local = ts.with_timezone(&tz);
    (local.date_naive(), local.time())
}

pub fn local_today(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month after the one containing `date`
pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(date)
}

/// (year, month) of the month before the one containing `date`
pub fn previous_month(date: NaiveDate) -> (i32, u32) {
    if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    }
}
