//! Market data structures: candles, candle requests, and quote snapshots.
//!
//! # Timestamp convention
//!
//! All timestamps are `DateTime<Utc>`. Exchange-local wall-clock strings are
//! converted on parse (see [`crate::time_util`]).

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Candle
// ---------------------------------------------------------------------------

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

// ---------------------------------------------------------------------------
// CandleRequest
// ---------------------------------------------------------------------------

/// A historical data query.
///
/// `count` is a span in **days**, not a number of bars. Which of
/// `count` / `start` / `end` win when several are given is decided by the
/// adapter's range resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleRequest {
    /// Trading symbol (e.g. `"RELIANCE-EQ"`).
    pub instrument: String,
    /// Bar duration.
    pub granularity: Duration,
    /// Day span.
    pub count: Option<u32>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl CandleRequest {
    pub fn new(instrument: impl Into<String>, granularity: Duration) -> Self {
        Self {
            instrument: instrument.into(),
            granularity,
            count: None,
            start: None,
            end: None,
        }
    }

    pub fn with_count(mut self, days: u32) -> Self {
        self.count = Some(days);
        self
    }

    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }
}

// ---------------------------------------------------------------------------
// Order book snapshot
// ---------------------------------------------------------------------------

/// One price level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub size: f64,
}

/// Top-of-book snapshot (up to five levels a side).
///
/// `bids[0]` is the best (highest) bid, `asks[0]` the best (lowest) ask.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderBook {
    pub instrument: String,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl OrderBook {
    /// Midpoint of the best bid and ask, if both sides are present.
    pub fn mid(&self) -> Option<f64> {
        let bid = self.bids.first()?.price;
        let ask = self.asks.first()?.price;
        Some((bid + ask) / 2.0)
    }
}

// ---------------------------------------------------------------------------
// Display impls
// ---------------------------------------------------------------------------

impl std::fmt::Display for Candle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} O={:.2} H={:.2} L={:.2} C={:.2} V={}",
            self.timestamp.to_rfc3339(),
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder() {
        let req = CandleRequest::new("INFY-EQ", Duration::from_secs(300)).with_count(5);
        assert_eq!(req.count, Some(5));
        assert!(req.start.is_none() && req.end.is_none());
    }

    #[test]
    fn mid_requires_both_sides() {
        let mut book = OrderBook {
            instrument: "INFY-EQ".into(),
            bids: vec![BookLevel { price: 100.0, size: 5.0 }],
            asks: vec![],
        };
        assert!(book.mid().is_none());
        book.asks.push(BookLevel { price: 101.0, size: 2.0 });
        assert_eq!(book.mid(), Some(100.5));
    }
}
