//! Trading-related value objects: orders, fills, and positions.
//!
//! These are the broker-agnostic shapes the strategy layer works with. The
//! adapter constructs them from exchange records and, for orders, reads
//! them to build native requests.

use serde::{Deserialize, Serialize};

use super::enums::{Direction, OrderStatus, OrderType};

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// A generic order, owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Exchange order number once acknowledged.
    #[serde(default)]
    pub id: Option<String>,
    /// Trading symbol (e.g. `"RELIANCE-EQ"`).
    pub instrument: String,
    /// Exchange segment override (defaults to the account's exchange).
    #[serde(default)]
    pub exchange: Option<String>,
    pub direction: Direction,
    pub order_type: OrderType,
    /// Number of units.
    pub size: f64,
    /// Quoted (working) price.
    #[serde(default)]
    pub order_price: Option<f64>,
    #[serde(default)]
    pub limit_price: Option<f64>,
    #[serde(default)]
    pub stop_price: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
    #[serde(default)]
    pub status: OrderStatus,
}

impl Order {
    /// A pending market order with no prices set.
    pub fn market(instrument: impl Into<String>, direction: Direction, size: f64) -> Self {
        Self {
            id: None,
            instrument: instrument.into(),
            exchange: None,
            direction,
            order_type: OrderType::Market,
            size,
            order_price: None,
            limit_price: None,
            stop_price: None,
            stop_loss: None,
            take_profit: None,
            status: OrderStatus::Pending,
        }
    }

    /// A pending limit order quoted at `price`.
    pub fn limit(instrument: impl Into<String>, direction: Direction, size: f64, price: f64) -> Self {
        Self {
            order_type: OrderType::Limit,
            order_price: Some(price),
            limit_price: Some(price),
            ..Self::market(instrument, direction, size)
        }
    }
}

// ---------------------------------------------------------------------------
// Trade (fill)
// ---------------------------------------------------------------------------

/// A fill reported by the exchange. Immutable once built.
///
/// Order-level fields stay `None`: a fill record does not carry the full
/// order context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub instrument: String,
    pub direction: Direction,
    pub size: f64,
    /// Fill time exactly as the exchange reported it.
    pub fill_time: String,
    pub fill_price: f64,
    pub order_price: Option<f64>,
    pub order_time: Option<String>,
    pub order_type: Option<OrderType>,
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A position snapshot, recomputed on every query.
///
/// `trade_id` is synthetic (`<instrument>_<net qty>_<L|S>`) because the
/// exchange exposes no position identifier; it changes whenever the net
/// quantity does and must not be stored as a durable key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument: String,
    pub long_units: f64,
    pub long_pnl: f64,
    pub short_units: f64,
    pub short_pnl: f64,
    pub total_margin: f64,
    pub trade_id: String,
}

impl Position {
    /// Signed net units (long minus short).
    pub fn net_units(&self) -> f64 {
        self.long_units - self.short_units
    }
}
