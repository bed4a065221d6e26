//! # fv-td
//!
//! Broker adapters that bridge the generic order / trade / position model
//! to an exchange's session-based REST API.
//!
//! Each broker implements the [`BrokerCapability`] trait, which provides a
//! uniform interface for session management, order placement and queries,
//! account reads, and historical candles. The lifecycle is:
//! construct → [`ensure_connected`](BrokerCapability::ensure_connected)
//! (implicit in every other call) → order / data operations.
//!
//! ## Supported brokers
//!
//! | Broker   | Module     | API                        |
//! |----------|------------|----------------------------|
//! | Finvasia | `finvasia` | Noren REST (`jData`/`jKey`) |

pub mod finvasia;
pub mod registry;

use async_trait::async_trait;
use fv_core::error::Result;
use fv_core::{Candle, CandleRequest, Order, OrderBook, Position, Trade};

/// Trait implemented by all broker adapters.
///
/// # Lifecycle
///
/// 1. Construct via the broker-specific `new(config)` (or
///    [`registry::create_broker`]).
/// 2. Every operation first ensures an authenticated session; calling
///    [`ensure_connected`](BrokerCapability::ensure_connected) up front only
///    moves the login cost earlier.
/// 3. Positions are recomputed per query and never cached.
///
/// All operations take `&self` so one adapter can be shared between tasks.
#[async_trait]
pub trait BrokerCapability: Send + Sync {
    /// Human-readable broker name.
    fn name(&self) -> &str;

    /// Log in if needed. Returns `true` when the session is authenticated.
    ///
    /// Never fails: exhausted retries are reported as `false`.
    async fn ensure_connected(&self) -> bool;

    /// Submit `order`, updating its id and status from the acknowledgment.
    ///
    /// Returns the order's serialized form after the update.
    async fn place_order(&self, order: &mut Order) -> Result<serde_json::Value>;

    /// Cancel a working order by exchange order number.
    async fn cancel_order(&self, order_id: &str) -> Result<()>;

    /// Pending orders, optionally restricted to one instrument.
    async fn get_orders(&self, instrument: Option<&str>) -> Result<Vec<Order>>;

    /// Fills for the day, optionally restricted to one instrument.
    async fn get_trades(&self, instrument: Option<&str>) -> Result<Vec<Trade>>;

    /// Open positions, optionally restricted to one instrument.
    async fn get_positions(&self, instrument: Option<&str>) -> Result<Vec<Position>>;

    /// Historical OHLCV bars, ascending and unique by timestamp.
    async fn get_candles(&self, request: &CandleRequest) -> Result<Vec<Candle>>;

    /// Cash balance. Upstream failures degrade to `0.0` with an error log.
    async fn get_balance(&self) -> Result<f64>;

    /// Net asset value of holdings. Upstream failures degrade to `0.0`.
    async fn get_nav(&self) -> Result<f64>;

    /// Current depth snapshot for `instrument`.
    async fn get_orderbook(&self, instrument: &str) -> Result<OrderBook>;

    /// Minimum price increment for `instrument`.
    async fn get_tick_size(&self, instrument: &str) -> Result<f64>;
}
