//! Historical candles via `TPSeries`.
//!
//! Noren only serves a fixed set of minute intervals and returns bars
//! newest-first, sometimes with repeated timestamps around session
//! boundaries. Requests are validated before any network call and responses
//! are normalised to ascending, timestamp-unique [`Candle`]s.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use fv_core::error::{FvError, Result};
use fv_core::time_util::{from_epoch_secs, parse_exchange_time};
use fv_core::{Candle, CandleRequest};
use serde_json::{Map, Value, json};

use super::responses::{Stat, TpRecord, stat_of};

/// Bar lengths (minutes) accepted by `TPSeries`.
pub const SUPPORTED_MINUTES: [u32; 9] = [1, 3, 5, 10, 15, 30, 60, 120, 240];

/// Convert a bar duration to the upstream interval in minutes.
pub fn to_native_granularity(granularity: Duration) -> Result<u32> {
    let secs = granularity.as_secs();
    if secs < 60 {
        return Err(FvError::UnsupportedGranularity(format!(
            "{secs}s: minimum is 1 minute"
        )));
    }
    if secs % 60 != 0 || granularity.subsec_nanos() != 0 {
        return Err(FvError::UnsupportedGranularity(format!(
            "{secs}s is not a whole number of minutes"
        )));
    }
    let minutes = u32::try_from(secs / 60)
        .map_err(|_| FvError::UnsupportedGranularity(format!("{secs}s")))?;
    if !SUPPORTED_MINUTES.contains(&minutes) {
        return Err(FvError::UnsupportedGranularity(format!(
            "{minutes} minutes (supported: {SUPPORTED_MINUTES:?})"
        )));
    }
    Ok(minutes)
}

/// Parse a human granularity such as `90s`, `5min`, `1h` or `1d`.
///
/// Only the syntax is checked here; support is decided by
/// [`to_native_granularity`].
pub fn parse_granularity(text: &str) -> Result<Duration> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| FvError::UnsupportedGranularity(format!("cannot parse {text:?}")))?;
    let scale = match unit.trim().to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" => 1,
        "" | "m" | "min" | "mins" => 60,
        "h" | "hr" | "hour" | "hours" => 3600,
        "d" | "day" | "days" => 86_400,
        other => {
            return Err(FvError::UnsupportedGranularity(format!(
                "unknown unit {other:?} in {text:?}"
            )));
        }
    };
    let secs = value
        .checked_mul(scale)
        .ok_or_else(|| FvError::UnsupportedGranularity(format!("{text:?} is out of range")))?;
    Ok(Duration::from_secs(secs))
}

/// The `[st, et]` window sent upstream. A missing end means "until now".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

/// Resolve `count` / `start` / `end` into a request window.
///
/// `count` is a span in days. With a start but no end the count is
/// ignored and the end left open, while with an end but no start the
/// count is measured back from that end.
pub fn resolve_range(request: &CandleRequest, now: DateTime<Utc>) -> Result<TimeRange> {
    let back = |from: DateTime<Utc>, count: u32| {
        TimeDelta::try_days(i64::from(count))
            .and_then(|span| from.checked_sub_signed(span))
            .ok_or_else(|| {
                FvError::InsufficientParameters(format!(
                    "{}: count of {count} days is out of range",
                    request.instrument
                ))
            })
    };
    match (request.count, request.start, request.end) {
        (Some(count), None, None) => Ok(TimeRange {
            start: back(now, count)?,
            end: Some(now),
        }),
        (Some(_), Some(start), None) => Ok(TimeRange { start, end: None }),
        (Some(count), None, Some(end)) => Ok(TimeRange {
            start: back(end, count)?,
            end: Some(end),
        }),
        (_, Some(start), Some(end)) => Ok(TimeRange {
            start,
            end: Some(end),
        }),
        _ => Err(FvError::InsufficientParameters(format!(
            "{}: need count, or start and end",
            request.instrument
        ))),
    }
}

/// `jData` for `TPSeries` (without `uid`).
pub fn tpseries_payload(exchange: &str, token: &str, range: &TimeRange, minutes: u32) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("exch".into(), json!(exchange));
    payload.insert("token".into(), json!(token));
    payload.insert("st".into(), json!(range.start.timestamp().to_string()));
    if let Some(end) = range.end {
        payload.insert("et".into(), json!(end.timestamp().to_string()));
    }
    payload.insert("intrv".into(), json!(minutes.to_string()));
    payload
}

fn record_time(record: &TpRecord) -> Option<DateTime<Utc>> {
    record
        .ssboe
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(from_epoch_secs)
        .or_else(|| parse_exchange_time(&record.time))
}

/// Normalise a `TPSeries` response into ascending unique candles.
pub fn parse_candles(instrument: &str, response: &Value) -> Result<Vec<Candle>> {
    if let Stat::NotOk(reason) = stat_of(response) {
        return Err(FvError::DataUnavailable {
            instrument: instrument.to_string(),
            reason,
        });
    }
    let records = response
        .as_array()
        .ok_or_else(|| FvError::malformed(instrument, "expected an array of bars"))?;

    let mut candles = Vec::with_capacity(records.len());
    for raw in records {
        let record: TpRecord = serde_json::from_value(raw.clone())
            .map_err(|e| FvError::malformed(instrument, e))?;
        let timestamp = record_time(&record).ok_or_else(|| {
            FvError::malformed(instrument, format!("bad bar time {:?}", record.time))
        })?;
        let volume = record
            .interval_volume
            .or(record.volume)
            .ok_or_else(|| FvError::malformed(instrument, "missing volume"))?;
        candles.push(Candle {
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume,
        });
    }

    Ok(fv_core::dedup::dedup_sorted_by_key(candles, |c| {
        c.timestamp.timestamp()
    }))
}
