//! Noren REST response types.
//!
//! Every endpoint answers with a `stat` field (`"Ok"` / `"Not_Ok"`). List
//! endpoints (order book, trade book, positions, holdings, candles) return a
//! JSON array on success and a single `{"stat":"Not_Ok","emsg":...}` object
//! on failure or when there is nothing to report. Numeric fields arrive as
//! strings.

use fv_core::OrderLifecycle;
use fv_core::error::{FvError, Result as FvResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Value of `stat` on success.
pub const STAT_OK: &str = "Ok";

// ---------------------------------------------------------------------------
// Status envelope
// ---------------------------------------------------------------------------

/// Outcome of a response's `stat` check.
#[derive(Debug, Clone, PartialEq)]
pub enum Stat {
    Ok,
    /// `Not_Ok`, with the upstream error message (may be empty).
    NotOk(String),
}

impl Stat {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Read the status of a response.
///
/// Objects carry `stat` directly; arrays are checked through their first
/// record (an empty array counts as success). Anything else, or a missing
/// `stat`, is reported as `NotOk`.
pub fn stat_of(value: &Value) -> Stat {
    let obj = match value {
        Value::Array(items) => match items.first() {
            Some(first) => first,
            None => return Stat::Ok,
        },
        other => other,
    };
    match obj.get("stat").and_then(Value::as_str) {
        Some(STAT_OK) => Stat::Ok,
        Some(_) => Stat::NotOk(error_message(obj)),
        None if value.is_array() => Stat::Ok,
        None => Stat::NotOk(error_message(obj)),
    }
}

/// Upstream error text from `emsg`, or an empty string.
pub fn error_message(value: &Value) -> String {
    value
        .get("emsg")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Returns `true` for the "nothing to report" flavour of `Not_Ok`.
pub fn is_no_data(message: &str) -> bool {
    message.to_ascii_lowercase().contains("no data")
}

/// Returns `true` when the message says the session token is no longer valid.
pub fn is_session_expired(message: &str) -> bool {
    let m = message.to_ascii_lowercase();
    m.contains("session expired") || m.contains("invalid session key")
}

/// Decode a list endpoint response into records.
///
/// `Not_Ok` with a "no data" message is an empty list; any other `Not_Ok`
/// is [`FvError::Rejected`]. Records that fail to decode make the whole
/// response malformed.
pub fn parse_list<T: DeserializeOwned>(endpoint: &str, value: &Value) -> FvResult<Vec<T>> {
    if let Stat::NotOk(msg) = stat_of(value) {
        if is_no_data(&msg) {
            return Ok(Vec::new());
        }
        return Err(FvError::Rejected(format!("{endpoint}: {msg}")));
    }
    let items = value
        .as_array()
        .ok_or_else(|| FvError::malformed(endpoint, "expected an array"))?;
    items
        .iter()
        .map(|item| T::deserialize(item).map_err(|e| FvError::malformed(endpoint, e)))
        .collect()
}

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum StrOrNum {
    Num(f64),
    Str(String),
}

fn to_f64<E: serde::de::Error>(v: StrOrNum) -> Result<f64, E> {
    match v {
        StrOrNum::Num(n) => Ok(n),
        StrOrNum::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("expected a number, got {s:?}"))),
    }
}

fn is_blank(v: &StrOrNum) -> bool {
    matches!(v, StrOrNum::Str(s) if s.trim().is_empty())
}

/// Deserialize a number that may be sent as a string (`"1500.05"`).
///
/// An empty string is an error.
pub fn f64_from_str<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    to_f64(StrOrNum::deserialize(d)?)
}

/// Like [`f64_from_str`], but an empty string reads as zero.
///
/// Only for fields the broker blanks out when there is nothing to report
/// (unfilled quantity, average price of an untouched position).
pub fn lenient_f64_from_str<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = StrOrNum::deserialize(d)?;
    if is_blank(&v) {
        return Ok(0.0);
    }
    to_f64(v)
}

/// Optional variant of [`f64_from_str`]; use with `#[serde(default)]`.
///
/// An empty string reads as absent.
pub fn opt_f64_from_str<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    match Option::<StrOrNum>::deserialize(d)? {
        None => Ok(None),
        Some(v) if is_blank(&v) => Ok(None),
        Some(v) => to_f64(v).map(Some),
    }
}

// ---------------------------------------------------------------------------
// Native enums
// ---------------------------------------------------------------------------

/// Buy / sell (`trantype`), sent as `B` / `S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "B")]
    Buy,
    #[serde(rename = "S")]
    Sell,
}

impl Side {
    pub fn code(self) -> &'static str {
        match self {
            Self::Buy => "B",
            Self::Sell => "S",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => f.write_str("BUY"),
            Self::Sell => f.write_str("SELL"),
        }
    }
}

/// Native price type (`prctyp`).
///
/// Unrecognised codes deserialize as [`PriceType::Market`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PriceType {
    Market,
    Limit,
    StopLimit,
    StopMarket,
}

impl PriceType {
    pub fn code(self) -> &'static str {
        match self {
            Self::Market => "MKT",
            Self::Limit => "LMT",
            Self::StopLimit => "SL-LMT",
            Self::StopMarket => "SL-MKT",
        }
    }
}

impl From<String> for PriceType {
    fn from(s: String) -> Self {
        match s.trim() {
            "LMT" => Self::Limit,
            "SL-LMT" => Self::StopLimit,
            "SL-MKT" => Self::StopMarket,
            _ => Self::Market,
        }
    }
}

impl From<PriceType> for String {
    fn from(p: PriceType) -> String {
        p.code().to_string()
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Response from `QuickAuth`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub stat: String,
    #[serde(default)]
    pub susertoken: Option<String>,
    #[serde(default)]
    pub actid: Option<String>,
    #[serde(default)]
    pub uname: Option<String>,
    #[serde(default)]
    pub emsg: Option<String>,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// An order as the exchange represents it (order book record or the
/// translated form of a generic order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeOrder {
    /// Exchange order number; empty until acknowledged.
    #[serde(rename = "norenordno", alias = "norenorderno", default)]
    pub order_number: String,
    #[serde(rename = "tsym", default)]
    pub trading_symbol: String,
    #[serde(rename = "trantype")]
    pub side: Side,
    #[serde(rename = "prctyp")]
    pub price_type: PriceType,
    #[serde(rename = "qty", deserialize_with = "f64_from_str")]
    pub quantity: f64,
    #[serde(rename = "prc", deserialize_with = "lenient_f64_from_str", default)]
    pub price: f64,
    #[serde(
        rename = "trgprc",
        deserialize_with = "opt_f64_from_str",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub trigger_price: Option<f64>,
    /// Upstream status text (`OPEN`, `COMPLETE`, `REJECTED`, ...).
    #[serde(default)]
    pub status: String,
    #[serde(rename = "fillshares", deserialize_with = "lenient_f64_from_str", default)]
    pub filled_quantity: f64,
    #[serde(rename = "rejreason", default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl NativeOrder {
    /// The rejection flag.
    pub fn is_rejected(&self) -> bool {
        matches!(self.status.trim(), "REJECTED" | "REJECT")
    }

    /// Map the upstream status text onto the detailed lifecycle.
    pub fn lifecycle(&self) -> OrderLifecycle {
        match self.status.trim() {
            "REJECTED" | "REJECT" => OrderLifecycle::Rejected,
            "CANCELED" | "CANCELLED" => OrderLifecycle::Cancelled,
            "COMPLETE" => OrderLifecycle::Filled,
            "OPEN" | "TRIGGER_PENDING" if self.filled_quantity > 0.0 => {
                OrderLifecycle::PartiallyFilled
            }
            "OPEN" | "TRIGGER_PENDING" => OrderLifecycle::Accepted,
            _ => OrderLifecycle::Submitted,
        }
    }
}

/// Response from `PlaceOrder` / `ModifyOrder`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderResponse {
    pub stat: String,
    /// `PlaceOrder` returns the number here; `ModifyOrder` uses `result`.
    #[serde(default, alias = "result")]
    pub norenordno: Option<String>,
    #[serde(default)]
    pub emsg: Option<String>,
}

impl PlaceOrderResponse {
    pub fn is_ok(&self) -> bool {
        self.stat == STAT_OK
    }
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// A trade book (fill) record.
#[derive(Debug, Clone, Deserialize)]
pub struct NativeFill {
    #[serde(rename = "norenordno", alias = "norenorderno")]
    pub order_number: String,
    #[serde(rename = "tsym")]
    pub trading_symbol: String,
    #[serde(rename = "trantype")]
    pub side: Side,
    #[serde(rename = "qty", deserialize_with = "f64_from_str")]
    pub quantity: f64,
    #[serde(rename = "fltm")]
    pub fill_time: String,
    #[serde(rename = "flprc", deserialize_with = "f64_from_str")]
    pub fill_price: f64,
}

// ---------------------------------------------------------------------------
// Positions / holdings / limits
// ---------------------------------------------------------------------------

/// A position book record.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionRecord {
    #[serde(rename = "tsym")]
    pub trading_symbol: String,
    #[serde(rename = "netqty", deserialize_with = "f64_from_str")]
    pub net_quantity: f64,
    #[serde(rename = "netavgprc", deserialize_with = "lenient_f64_from_str", default)]
    pub net_average_price: f64,
    #[serde(rename = "rpnl", deserialize_with = "lenient_f64_from_str", default)]
    pub realized_pnl: f64,
}

/// Symbol entry nested inside a holding.
#[derive(Debug, Clone, Deserialize)]
pub struct HoldingSymbol {
    #[serde(default)]
    pub exch: String,
    pub tsym: String,
}

/// A holdings record.
#[derive(Debug, Clone, Deserialize)]
pub struct HoldingRecord {
    #[serde(rename = "upldprc", deserialize_with = "lenient_f64_from_str", default)]
    pub upload_price: f64,
    #[serde(rename = "holdqty", deserialize_with = "f64_from_str")]
    pub hold_quantity: f64,
    #[serde(default)]
    pub exch_tsym: Vec<HoldingSymbol>,
}

impl HoldingRecord {
    /// Trading symbol of the first listing, for log messages.
    pub fn symbol(&self) -> &str {
        self.exch_tsym
            .first()
            .map(|s| s.tsym.as_str())
            .unwrap_or("?")
    }
}

/// Response from `Limits`.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsResponse {
    pub stat: String,
    #[serde(deserialize_with = "opt_f64_from_str", default)]
    pub cash: Option<f64>,
}

// ---------------------------------------------------------------------------
// Candles
// ---------------------------------------------------------------------------

/// One `TPSeries` record.
#[derive(Debug, Clone, Deserialize)]
pub struct TpRecord {
    /// Exchange-local bar time, `dd-mm-YYYY HH:MM:SS`.
    pub time: String,
    /// Same instant as epoch seconds, when provided.
    #[serde(default)]
    pub ssboe: Option<String>,
    #[serde(rename = "into", deserialize_with = "f64_from_str")]
    pub open: f64,
    #[serde(rename = "inth", deserialize_with = "f64_from_str")]
    pub high: f64,
    #[serde(rename = "intl", deserialize_with = "f64_from_str")]
    pub low: f64,
    #[serde(rename = "intc", deserialize_with = "f64_from_str")]
    pub close: f64,
    #[serde(rename = "v", deserialize_with = "opt_f64_from_str", default)]
    pub volume: Option<f64>,
    #[serde(rename = "intv", deserialize_with = "opt_f64_from_str", default)]
    pub interval_volume: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stat_of_object_and_array() {
        assert_eq!(stat_of(&json!({"stat": "Ok"})), Stat::Ok);
        assert_eq!(
            stat_of(&json!({"stat": "Not_Ok", "emsg": "no data"})),
            Stat::NotOk("no data".into())
        );
        assert_eq!(stat_of(&json!([{"stat": "Ok"}, {"stat": "Ok"}])), Stat::Ok);
        assert!(!stat_of(&json!([{"stat": "Not_Ok"}])).is_ok());
        assert!(stat_of(&json!([])).is_ok());
        assert!(!stat_of(&json!(null)).is_ok());
    }

    #[test]
    fn array_records_without_stat_are_ok() {
        assert!(stat_of(&json!([{"norenordno": "1"}])).is_ok());
    }

    #[test]
    fn message_classifiers() {
        assert!(is_no_data("Error Occurred : 5 \"no data\""));
        assert!(is_session_expired("Session Expired :  Invalid Session Key"));
        assert!(!is_session_expired("Invalid OTP"));
    }

    #[test]
    fn native_order_from_order_book() {
        let raw = json!({
            "stat": "Ok", "norenordno": "23011300000123", "tsym": "INFY-EQ",
            "trantype": "S", "prctyp": "SL-LMT", "qty": "10", "prc": "1500.50",
            "trgprc": "1499.00", "status": "TRIGGER_PENDING", "fillshares": "4"
        });
        let o: NativeOrder = serde_json::from_value(raw).unwrap();
        assert_eq!(o.side, Side::Sell);
        assert_eq!(o.price_type, PriceType::StopLimit);
        assert_eq!(o.quantity, 10.0);
        assert_eq!(o.trigger_price, Some(1499.0));
        assert!(!o.is_rejected());
        assert_eq!(o.lifecycle(), OrderLifecycle::PartiallyFilled);
    }

    #[test]
    fn unknown_price_type_is_market() {
        let p: PriceType = serde_json::from_value(json!("BL-MKT")).unwrap();
        assert_eq!(p, PriceType::Market);
        assert_eq!(serde_json::to_value(PriceType::StopMarket).unwrap(), json!("SL-MKT"));
    }

    #[test]
    fn lifecycle_mapping() {
        let mut o: NativeOrder = serde_json::from_value(json!({
            "trantype": "B", "prctyp": "MKT", "qty": "1", "status": "REJECTED"
        }))
        .unwrap();
        assert!(o.is_rejected());
        assert_eq!(o.lifecycle(), OrderLifecycle::Rejected);
        o.status = "COMPLETE".into();
        assert_eq!(o.lifecycle(), OrderLifecycle::Filled);
        o.status = "CANCELED".into();
        assert_eq!(o.lifecycle(), OrderLifecycle::Cancelled);
        o.status = "OPEN".into();
        assert_eq!(o.lifecycle(), OrderLifecycle::Accepted);
        o.status = "PENDING".into();
        assert_eq!(o.lifecycle(), OrderLifecycle::Submitted);
    }

    #[test]
    fn numbers_accept_strings_and_numbers() {
        let r: PositionRecord = serde_json::from_value(json!({
            "tsym": "SBIN-EQ", "netqty": -3, "netavgprc": "600.25", "rpnl": ""
        }))
        .unwrap();
        assert_eq!(r.net_quantity, -3.0);
        assert_eq!(r.net_average_price, 600.25);
        assert_eq!(r.realized_pnl, 0.0);
    }

    #[test]
    fn blank_required_number_is_error() {
        let bar = serde_json::from_value::<TpRecord>(json!({
            "time": "11-03-2024 09:15:00", "into": "", "inth": "1", "intl": "1", "intc": "1"
        }));
        assert!(bar.is_err());
        let pos = serde_json::from_value::<PositionRecord>(json!({
            "tsym": "SBIN-EQ", "netqty": " "
        }));
        assert!(pos.is_err());
    }

    #[test]
    fn blank_optional_number_is_absent() {
        let bar: TpRecord = serde_json::from_value(json!({
            "time": "11-03-2024 09:15:00", "into": "1", "inth": "1", "intl": "1", "intc": "1",
            "intv": "", "v": "12"
        }))
        .unwrap();
        assert_eq!(bar.interval_volume, None);
        assert_eq!(bar.volume, Some(12.0));
    }

    #[test]
    fn bad_number_is_error() {
        let r = serde_json::from_value::<PositionRecord>(json!({
            "tsym": "SBIN-EQ", "netqty": "three"
        }));
        assert!(r.is_err());
    }

    #[test]
    fn modify_response_uses_result() {
        let r: PlaceOrderResponse =
            serde_json::from_value(json!({"stat": "Ok", "result": "2301"})).unwrap();
        assert!(r.is_ok());
        assert_eq!(r.norenordno.as_deref(), Some("2301"));
    }

    #[test]
    fn parse_list_outcomes() {
        let rows: Vec<PositionRecord> = parse_list(
            "PositionBook",
            &json!([{"stat":"Ok","tsym":"SBIN-EQ","netqty":"-2","netavgprc":"750","rpnl":"1.5"}]),
        )
        .unwrap();
        assert_eq!(rows[0].net_quantity, -2.0);

        let empty: Vec<PositionRecord> =
            parse_list("PositionBook", &json!({"stat":"Not_Ok","emsg":"no data"})).unwrap();
        assert!(empty.is_empty());

        let err = parse_list::<PositionRecord>("PositionBook", &json!({"stat":"Not_Ok","emsg":"RMS error"}));
        assert!(matches!(err, Err(FvError::Rejected(_))));

        let err = parse_list::<PositionRecord>("PositionBook", &json!([{"stat":"Ok","tsym":"X"}]));
        assert!(matches!(err, Err(FvError::MalformedResponse { .. })));
    }
}
