//! Time utilities.
//!
//! The exchange reports wall-clock times in Indian Standard Time (UTC+05:30)
//! without an offset, while requests take epoch seconds. Everything inside
//! the workspace is carried as `DateTime<Utc>`.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Offset of the exchange's local time from UTC, in seconds.
pub const EXCHANGE_UTC_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Timestamp format used in candle and fill records (`02-06-2020 15:46:23`).
pub const EXCHANGE_TIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Current time.
#[inline]
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as **seconds** since Unix epoch.
#[inline]
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Today's date on the host's local calendar.
#[inline]
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// The exchange's fixed UTC offset.
pub fn exchange_offset() -> FixedOffset {
    FixedOffset::east_opt(EXCHANGE_UTC_OFFSET_SECS).expect("offset within a day")
}

/// Parse an exchange-local `dd-mm-YYYY HH:MM:SS` string into UTC.
pub fn parse_exchange_time(s: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), EXCHANGE_TIME_FORMAT).ok()?;
    exchange_offset()
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert epoch seconds into UTC.
pub fn from_epoch_secs(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}
