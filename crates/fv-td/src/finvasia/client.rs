//! Noren REST transport.
//!
//! Every call is a `POST <rest_url>/<Endpoint>` whose body is the raw string
//! `jData=<json>` followed, once logged in, by `&jKey=<session token>`. The
//! JSON is not form-encoded as a whole; string values that may contain
//! reserved characters (trading symbols such as `M&M-EQ`) are URL-encoded
//! individually by the caller via [`encode_symbol`].
//!
//! # Endpoints
//!
//! | Operation         | Endpoint       |
//! |-------------------|----------------|
//! | Login             | `QuickAuth`    |
//! | Place order       | `PlaceOrder`   |
//! | Modify order      | `ModifyOrder`  |
//! | Cancel order      | `CancelOrder`  |
//! | Order book        | `OrderBook`    |
//! | Trade book        | `TradeBook`    |
//! | Positions         | `PositionBook` |
//! | Holdings          | `Holdings`     |
//! | Cash limits       | `Limits`       |
//! | Quotes            | `GetQuotes`    |
//! | Candles           | `TPSeries`     |

use std::time::Duration;

use fv_core::error::{FvError, Result};
use serde_json::Value;
use tracing::debug;

pub const QUICK_AUTH: &str = "QuickAuth";
pub const PLACE_ORDER: &str = "PlaceOrder";
pub const MODIFY_ORDER: &str = "ModifyOrder";
pub const CANCEL_ORDER: &str = "CancelOrder";
pub const ORDER_BOOK: &str = "OrderBook";
pub const TRADE_BOOK: &str = "TradeBook";
pub const POSITION_BOOK: &str = "PositionBook";
pub const HOLDINGS: &str = "Holdings";
pub const LIMITS: &str = "Limits";
pub const GET_QUOTES: &str = "GetQuotes";
pub const TP_SERIES: &str = "TPSeries";

/// Thin HTTP wrapper over the Noren REST endpoints.
#[derive(Debug, Clone)]
pub struct RestClient {
    /// Shared HTTP client.
    http: reqwest::Client,
    /// REST base URL without trailing slash.
    base_url: String,
}

impl RestClient {
    /// Create a client (no connection is opened until the first request).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FvError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The underlying HTTP client, shared with the reference downloader.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// POST `payload` to `endpoint` and return the parsed JSON body.
    ///
    /// Only transport and JSON decoding failures are errors here; a
    /// `"Not_Ok"` body is returned as-is for the caller to interpret.
    pub async fn post(&self, endpoint: &str, payload: &Value, token: Option<&str>) -> Result<Value> {
        let url = format!("{}/{endpoint}", self.base_url);
        let body = build_body(payload, token);
        debug!("[finvasia] POST {endpoint}");

        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await
            .map_err(|e| FvError::Transport(format!("{endpoint} request failed: {e}")))?;

        let resp = resp
            .error_for_status()
            .map_err(|e| FvError::Transport(format!("{endpoint} HTTP error: {e}")))?;

        resp.json::<Value>()
            .await
            .map_err(|e| FvError::malformed(endpoint, e))
    }
}

/// Build the `jData=...&jKey=...` request body.
pub fn build_body(payload: &Value, token: Option<&str>) -> String {
    match token {
        Some(key) => format!("jData={payload}&jKey={key}"),
        None => format!("jData={payload}"),
    }
}

/// URL-encode a trading symbol for inclusion in `jData`.
pub fn encode_symbol(symbol: &str) -> String {
    urlencoding::encode(symbol).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_without_token() {
        let body = build_body(&json!({"uid": "FA1"}), None);
        assert_eq!(body, r#"jData={"uid":"FA1"}"#);
    }

    #[test]
    fn body_with_token() {
        let body = build_body(&json!({"uid": "FA1"}), Some("tok123"));
        assert_eq!(body, r#"jData={"uid":"FA1"}&jKey=tok123"#);
    }

    #[test]
    fn symbols_are_encoded() {
        assert_eq!(encode_symbol("M&M-EQ"), "M%26M-EQ");
        assert_eq!(encode_symbol("INFY-EQ"), "INFY-EQ");
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let c = RestClient::new("https://example.com/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(c.base_url, "https://example.com/api");
    }
}
