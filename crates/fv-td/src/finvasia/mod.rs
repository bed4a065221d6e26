//! Finvasia (Shoonya) broker adapter over the Noren REST API.
//!
//! Implements [`BrokerCapability`](crate::BrokerCapability) for an NSE cash
//! account.
//!
//! # Architecture
//!
//! ```text
//! FinvasiaBroker
//! └── Arc<Session>
//!     ├── RestClient       (jData / jKey POSTs)
//!     ├── SymbolResolver   (daily instrument reference, token + tick size)
//!     └── Mutex<state>     (session token, login bookkeeping)
//! ```
//!
//! Every operation first obtains a session token, logging in with TOTP if
//! necessary. Translation between generic and native records lives in
//! [`translate`]; response interpretation in [`account`], [`candles`] and
//! [`quotes`].

pub mod account;
pub mod auth;
pub mod candles;
pub mod client;
pub mod config;
pub mod quotes;
pub mod responses;
pub mod session;
pub mod symbol_master;
pub mod translate;

use std::sync::Arc;

use async_trait::async_trait;
use fv_core::error::{FvError, Result};
use fv_core::{Candle, CandleRequest, Direction, Order, OrderBook, OrderType, Position, Trade};
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use self::config::FinvasiaConfig;
use self::responses::{NativeFill, NativeOrder, PlaceOrderResponse, Stat, parse_list, stat_of};
use self::session::Session;
use crate::BrokerCapability;

/// Finvasia broker adapter.
///
/// Cheap to share: all state sits behind the [`Session`].
pub struct FinvasiaBroker {
    session: Arc<Session>,
}

impl FinvasiaBroker {
    /// Create an adapter. No network traffic happens until the first call.
    pub fn new(config: FinvasiaConfig) -> Result<Self> {
        Ok(Self {
            session: Arc::new(Session::new(config)?),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn config(&self) -> &FinvasiaConfig {
        self.session.config()
    }

    /// Exchange segment for `order`: its own override, else the account's.
    fn exchange_for<'a>(&'a self, order: &'a Order) -> &'a str {
        order.exchange.as_deref().unwrap_or(&self.config().exchange)
    }

    async fn submit(&self, order: &Order) -> Result<(NativeOrder, Value)> {
        let native = translate::to_native(order);
        let payload =
            translate::place_order_payload(&native, self.exchange_for(order), &self.config().product);
        let value = self
            .session
            .account_request(client::PLACE_ORDER, payload)
            .await?;
        Ok((native, value))
    }

    /// Flatten the open position in `order.instrument` with a market order.
    async fn close_position(&self, mut order: Order) -> Result<(NativeOrder, Value)> {
        let positions = self.get_positions(Some(&order.instrument)).await?;
        let net: f64 = positions.iter().map(Position::net_units).sum();
        if net == 0.0 {
            return Err(FvError::Rejected(format!(
                "no open position in {}",
                order.instrument
            )));
        }
        order.direction = if net > 0.0 {
            Direction::Short
        } else {
            Direction::Long
        };
        order.order_type = OrderType::Market;
        order.size = net.abs();
        order.order_price = None;
        order.limit_price = None;
        order.stop_price = None;
        info!(
            "[finvasia] closing {} {:?} x{}",
            order.instrument, order.direction, order.size
        );
        self.submit(&order).await
    }

    /// Amend a working order. A quoted price makes it a limit order.
    async fn modify(&self, mut order: Order) -> Result<(NativeOrder, Value)> {
        order.order_type = if order.order_price.is_some() {
            OrderType::Limit
        } else {
            OrderType::Market
        };
        let native = translate::to_native(&order);
        let payload = translate::modify_order_payload(&native, self.exchange_for(&order))?;
        let value = self
            .session
            .request(client::MODIFY_ORDER, payload)
            .await?;
        Ok((native, value))
    }

    fn acknowledge(
        &self,
        endpoint: &str,
        order: &mut Order,
        native: &NativeOrder,
        value: Value,
    ) -> Result<Value> {
        let resp: PlaceOrderResponse =
            serde_json::from_value(value).map_err(|e| FvError::malformed(endpoint, e))?;
        if resp.is_ok() {
            info!(
                "[finvasia] {endpoint} {} {} {} qty={} -> {}",
                native.trading_symbol,
                native.side,
                native.price_type.code(),
                native.quantity,
                resp.norenordno.as_deref().unwrap_or("?")
            );
        } else {
            warn!(
                "[finvasia] {endpoint} rejected for {}: {}",
                native.trading_symbol,
                resp.emsg.as_deref().unwrap_or_default()
            );
        }
        Ok(translate::apply_response(order, &resp))
    }
}

#[async_trait]
impl BrokerCapability for FinvasiaBroker {
    fn name(&self) -> &str {
        "finvasia"
    }

    async fn ensure_connected(&self) -> bool {
        self.session.ensure_connected().await
    }

    async fn place_order(&self, order: &mut Order) -> Result<Value> {
        self.session.token().await?;
        let tick = self
            .session
            .symbols()
            .resolve_tick_size(&order.instrument)
            .await?;

        // Rounding and close/modify rewrites happen on a working copy; the
        // caller's order only receives the acknowledgment.
        let mut working = order.clone();
        working.size = translate::check_trade_size(working.size);
        for price in [
            &mut working.order_price,
            &mut working.limit_price,
            &mut working.stop_price,
        ] {
            if let Some(p) = price {
                *p = translate::round_to_tick(*p, tick);
            }
        }

        let (endpoint, (native, value)) = match working.order_type {
            OrderType::Close => (client::PLACE_ORDER, self.close_position(working).await?),
            OrderType::Modify => (client::MODIFY_ORDER, self.modify(working).await?),
            _ => {
                if working.size <= 0.0 {
                    return Err(FvError::Rejected(format!(
                        "order size for {} rounds to zero",
                        working.instrument
                    )));
                }
                (client::PLACE_ORDER, self.submit(&working).await?)
            }
        };
        self.acknowledge(endpoint, order, &native, value)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let mut payload = Map::new();
        payload.insert("norenordno".into(), json!(order_id));
        let value = self.session.request(client::CANCEL_ORDER, payload).await?;
        if let Stat::NotOk(msg) = stat_of(&value) {
            return Err(FvError::Rejected(format!("cancel {order_id}: {msg}")));
        }
        info!("[finvasia] order cancelled: {order_id}");
        Ok(())
    }

    async fn get_orders(&self, instrument: Option<&str>) -> Result<Vec<Order>> {
        let value = self.session.request(client::ORDER_BOOK, Map::new()).await?;
        let natives: Vec<NativeOrder> = parse_list(client::ORDER_BOOK, &value)?;
        Ok(natives
            .iter()
            .filter(|n| !n.lifecycle().is_terminal())
            .filter(|n| instrument.is_none_or(|i| n.trading_symbol == i))
            .map(translate::from_native)
            .collect())
    }

    async fn get_trades(&self, instrument: Option<&str>) -> Result<Vec<Trade>> {
        let value = self.session.account_request(client::TRADE_BOOK, Map::new()).await?;
        let fills: Vec<NativeFill> = parse_list(client::TRADE_BOOK, &value)?;
        Ok(fills
            .iter()
            .filter(|f| instrument.is_none_or(|i| f.trading_symbol == i))
            .map(translate::from_native_fill)
            .collect())
    }

    async fn get_positions(&self, instrument: Option<&str>) -> Result<Vec<Position>> {
        let value = self
            .session
            .account_request(client::POSITION_BOOK, Map::new())
            .await?;
        account::positions_from_response(&value, instrument)
    }

    async fn get_candles(&self, request: &CandleRequest) -> Result<Vec<Candle>> {
        let minutes = candles::to_native_granularity(request.granularity)?;
        let range = candles::resolve_range(request, fv_core::time_util::now_utc())?;

        self.session.token().await?;
        let token = self
            .session
            .symbols()
            .resolve_token(&request.instrument)
            .await?;

        let payload = candles::tpseries_payload(&self.config().exchange, &token, &range, minutes);
        let value = self.session.request(client::TP_SERIES, payload).await?;
        let bars = candles::parse_candles(&request.instrument, &value)?;
        info!(
            "[finvasia] {} candles for {} ({minutes}m)",
            bars.len(),
            request.instrument
        );
        Ok(bars)
    }

    async fn get_balance(&self) -> Result<f64> {
        let result = self
            .session
            .account_request(client::LIMITS, Map::new())
            .await
            .and_then(|value| account::balance_from_response(&value));
        match result {
            Ok(cash) => Ok(cash),
            Err(e @ FvError::Authentication(_)) => Err(e),
            Err(e) => {
                error!("[finvasia] failed to read balance: {e}");
                Ok(0.0)
            }
        }
    }

    async fn get_nav(&self) -> Result<f64> {
        let mut payload = Map::new();
        payload.insert("prd".into(), json!(self.config().product));
        let result = self
            .session
            .account_request(client::HOLDINGS, payload)
            .await
            .and_then(|value| account::nav_from_response(&value));
        match result {
            Ok(nav) => Ok(nav),
            Err(e @ FvError::Authentication(_)) => Err(e),
            Err(e) => {
                error!("[finvasia] failed to read NAV: {e}");
                Ok(0.0)
            }
        }
    }

    /// Five levels a side.
    async fn get_orderbook(&self, instrument: &str) -> Result<OrderBook> {
        self.session.token().await?;
        let token = self.session.symbols().resolve_token(instrument).await?;
        let payload = quotes::quote_payload(&self.config().exchange, &token);
        let value = self.session.request(client::GET_QUOTES, payload).await?;
        quotes::parse_quote(instrument, &value)
    }

    async fn get_tick_size(&self, instrument: &str) -> Result<f64> {
        self.session.token().await?;
        self.session.symbols().resolve_tick_size(instrument).await
    }
}
