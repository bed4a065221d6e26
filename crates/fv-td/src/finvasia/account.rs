//! Account reads: holdings NAV, cash balance and open positions.

use fv_core::Position;
use fv_core::error::{FvError, Result};
use serde_json::Value;
use tracing::debug;

use super::client;
use super::responses::{HoldingRecord, LimitsResponse, PositionRecord, Stat, parse_list, stat_of};
use super::translate::position_from_native;

/// Σ price × quantity over holdings.
///
/// A zero upload price (not yet priced by the broker) counts as 1 so the
/// quantity still contributes.
pub fn nav_from_holdings(holdings: &[HoldingRecord]) -> f64 {
    holdings
        .iter()
        .map(|h| {
            let price = if h.upload_price == 0.0 { 1.0 } else { h.upload_price };
            debug!(
                "[finvasia] holding {} qty={} price={price}",
                h.symbol(),
                h.hold_quantity
            );
            price * h.hold_quantity
        })
        .sum()
}

/// NAV from a `Holdings` response. An account with no holdings is worth 0.
pub fn nav_from_response(value: &Value) -> Result<f64> {
    let holdings: Vec<HoldingRecord> = parse_list(client::HOLDINGS, value)?;
    Ok(nav_from_holdings(&holdings))
}

/// Cash balance from a `Limits` response.
pub fn balance_from_response(value: &Value) -> Result<f64> {
    if let Stat::NotOk(msg) = stat_of(value) {
        return Err(FvError::Rejected(format!("{}: {msg}", client::LIMITS)));
    }
    let limits: LimitsResponse = serde_json::from_value(value.clone())
        .map_err(|e| FvError::malformed(client::LIMITS, e))?;
    limits
        .cash
        .ok_or_else(|| FvError::malformed(client::LIMITS, "missing cash"))
}

/// Open positions from a `PositionBook` response, optionally for one symbol.
pub fn positions_from_response(value: &Value, instrument: Option<&str>) -> Result<Vec<Position>> {
    let rows: Vec<PositionRecord> = parse_list(client::POSITION_BOOK, value)?;
    Ok(rows
        .iter()
        .filter(|row| instrument.is_none_or(|i| row.trading_symbol == i))
        .filter_map(position_from_native)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zero_price_counts_as_one() {
        let resp = json!([
            {"stat":"Ok","upldprc":"0","holdqty":"10","exch_tsym":[{"exch":"NSE","tsym":"IDEA-EQ"}]},
            {"stat":"Ok","upldprc":"250.5","holdqty":"2","exch_tsym":[{"exch":"NSE","tsym":"ITC-EQ"}]}
        ]);
        assert_eq!(nav_from_response(&resp).unwrap(), 10.0 + 501.0);
    }

    #[test]
    fn no_holdings_is_zero() {
        let resp = json!({"stat":"Not_Ok","emsg":"no data"});
        assert_eq!(nav_from_response(&resp).unwrap(), 0.0);
        assert!(nav_from_response(&json!({"stat":"Not_Ok","emsg":"Server busy"})).is_err());
    }

    #[test]
    fn balance_reads_cash() {
        let resp = json!({"stat":"Ok","cash":"100000.25","payin":"0"});
        assert_eq!(balance_from_response(&resp).unwrap(), 100_000.25);
        assert!(matches!(
            balance_from_response(&json!({"stat":"Ok"})),
            Err(FvError::MalformedResponse { .. })
        ));
        assert!(matches!(
            balance_from_response(&json!({"stat":"Not_Ok","emsg":"x"})),
            Err(FvError::Rejected(_))
        ));
    }

    #[test]
    fn positions_skip_flat_and_filter() {
        let resp = json!([
            {"stat":"Ok","tsym":"SBIN-EQ","netqty":"10","netavgprc":"750","rpnl":"0"},
            {"stat":"Ok","tsym":"ITC-EQ","netqty":"0","netavgprc":"0","rpnl":"35"},
            {"stat":"Ok","tsym":"INFY-EQ","netqty":"-3","netavgprc":"1500","rpnl":"-12"}
        ]);
        let all = positions_from_response(&resp, None).unwrap();
        assert_eq!(all.len(), 2);

        let infy = positions_from_response(&resp, Some("INFY-EQ")).unwrap();
        assert_eq!(infy.len(), 1);
        assert_eq!(infy[0].short_units, 3.0);
        assert_eq!(infy[0].short_pnl, -12.0);

        let none = positions_from_response(&json!({"stat":"Not_Ok","emsg":"no data"}), None).unwrap();
        assert!(none.is_empty());
    }
}
