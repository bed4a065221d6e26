//! Depth snapshot from `GetQuotes`.
//!
//! The quote carries five levels a side as flat string fields: `bp1..bp5` /
//! `bq1..bq5` for bids and `sp1..sp5` / `sq1..sq5` for asks.

use fv_core::error::{FvError, Result};
use fv_core::{BookLevel, OrderBook};
use serde_json::{Map, Value, json};

use super::responses::{Stat, stat_of};

/// Levels per side in a quote.
pub const DEPTH_LEVELS: usize = 5;

/// `jData` for `GetQuotes` (without `uid`).
pub fn quote_payload(exchange: &str, token: &str) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("exch".into(), json!(exchange));
    payload.insert("token".into(), json!(token));
    payload
}

fn number(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn side(value: &Value, price_prefix: &str, size_prefix: &str) -> Vec<BookLevel> {
    (1..=DEPTH_LEVELS)
        .map_while(|level| {
            let price = number(value, &format!("{price_prefix}{level}"))?;
            let size = number(value, &format!("{size_prefix}{level}")).unwrap_or_default();
            (price > 0.0).then_some(BookLevel { price, size })
        })
        .collect()
}

/// Build a depth snapshot. Empty or unpriced levels end a side.
pub fn parse_quote(instrument: &str, value: &Value) -> Result<OrderBook> {
    if let Stat::NotOk(reason) = stat_of(value) {
        return Err(FvError::DataUnavailable {
            instrument: instrument.to_string(),
            reason,
        });
    }
    if !value.is_object() {
        return Err(FvError::malformed(instrument, "expected a quote object"));
    }
    Ok(OrderBook {
        instrument: instrument.to_string(),
        bids: side(value, "bp", "bq"),
        asks: side(value, "sp", "sq"),
    })
}
