//! Conversion between the generic trading model and Noren records.
//!
//! | Generic order type | `prctyp` | `prc`          | `trgprc`      |
//! |--------------------|----------|----------------|---------------|
//! | market             | `MKT`    | 0              | -             |
//! | limit              | `LMT`    | `order_price`  | -             |
//! | stop               | `SL-MKT` | 0              | `limit_price` |
//! | stop-limit         | `SL-LMT` | `order_price`  | `limit_price` |
//!
//! The trigger price of stop orders is taken from `limit_price`; existing
//! callers rely on that field for both meanings.

use fv_core::error::{FvError, Result};
use fv_core::{Direction, Order, OrderStatus, OrderType, Position, Trade};
use serde_json::{Map, Value, json};

use super::client::encode_symbol;
use super::responses::{NativeFill, NativeOrder, PlaceOrderResponse, PositionRecord, PriceType, Side};

/// Validity sent with every order.
const RETENTION_DAY: &str = "DAY";

fn side_of(direction: Direction) -> Side {
    match direction {
        Direction::Long => Side::Buy,
        Direction::Short => Side::Sell,
    }
}

fn direction_of(side: Side) -> Direction {
    match side {
        Side::Buy => Direction::Long,
        Side::Sell => Direction::Short,
    }
}

fn price_type_of(order_type: OrderType) -> PriceType {
    match order_type {
        OrderType::Limit => PriceType::Limit,
        OrderType::StopLimit => PriceType::StopLimit,
        OrderType::Stop => PriceType::StopMarket,
        _ => PriceType::Market,
    }
}

fn order_type_of(price_type: PriceType) -> OrderType {
    match price_type {
        PriceType::Limit => OrderType::Limit,
        PriceType::StopLimit => OrderType::StopLimit,
        PriceType::StopMarket => OrderType::Stop,
        PriceType::Market => OrderType::Market,
    }
}

/// Translate a generic order into the native representation.
pub fn to_native(order: &Order) -> NativeOrder {
    let price_type = price_type_of(order.order_type);
    let trigger_price = match price_type {
        PriceType::StopMarket | PriceType::StopLimit => order.limit_price,
        _ => None,
    };
    let price = match price_type {
        PriceType::Limit | PriceType::StopLimit => order.order_price.unwrap_or_default(),
        _ => 0.0,
    };

    NativeOrder {
        order_number: order.id.clone().unwrap_or_default(),
        trading_symbol: order.instrument.clone(),
        side: side_of(order.direction),
        price_type,
        quantity: order.size,
        price,
        trigger_price,
        status: String::new(),
        filled_quantity: 0.0,
        rejection_reason: None,
    }
}

/// Translate a native order (order book record) into a generic order.
pub fn from_native(native: &NativeOrder) -> Order {
    let (limit_price, stop_price) = match native.price_type {
        PriceType::Limit | PriceType::StopLimit => (Some(native.price), None),
        PriceType::StopMarket | PriceType::Market => (None, Some(native.price)),
    };
    let status = if native.is_rejected() {
        OrderStatus::Cancelled
    } else {
        OrderStatus::Pending
    };

    Order {
        id: (!native.order_number.is_empty()).then(|| native.order_number.clone()),
        instrument: native.trading_symbol.clone(),
        exchange: None,
        direction: direction_of(native.side),
        order_type: order_type_of(native.price_type),
        size: native.quantity,
        order_price: None,
        limit_price,
        stop_price,
        stop_loss: None,
        take_profit: None,
        status,
    }
}

/// Record a placement acknowledgment on `order` and return its JSON form.
pub fn apply_response(order: &mut Order, response: &PlaceOrderResponse) -> Value {
    if let Some(id) = response.norenordno.as_ref().filter(|id| !id.is_empty()) {
        order.id = Some(id.clone());
    }
    order.status = if response.is_ok() {
        OrderStatus::Open
    } else {
        OrderStatus::Cancelled
    };
    serde_json::to_value(&*order).unwrap_or(Value::Null)
}

/// Translate a trade book record into a generic trade.
pub fn from_native_fill(fill: &NativeFill) -> Trade {
    Trade {
        id: fill.order_number.clone(),
        instrument: fill.trading_symbol.clone(),
        direction: direction_of(fill.side),
        size: fill.quantity,
        fill_time: fill.fill_time.clone(),
        fill_price: fill.fill_price,
        order_price: None,
        order_time: None,
        order_type: None,
    }
}

/// Synthetic position id: `<symbol>_<netqty>_<L|S>`.
///
/// Changes whenever the net quantity does; not a stable key.
pub fn position_id(symbol: &str, net_quantity: f64) -> String {
    let suffix = if net_quantity > 0.0 { 'L' } else { 'S' };
    format!("{symbol}_{net_quantity}_{suffix}")
}

/// Derive a generic position from a position book row. Flat rows yield `None`.
pub fn position_from_native(row: &PositionRecord) -> Option<Position> {
    let qty = row.net_quantity;
    if qty == 0.0 {
        return None;
    }
    let margin = qty * row.net_average_price;
    let trade_id = position_id(&row.trading_symbol, qty);
    let mut position = Position {
        instrument: row.trading_symbol.clone(),
        long_units: 0.0,
        long_pnl: 0.0,
        short_units: 0.0,
        short_pnl: 0.0,
        total_margin: margin,
        trade_id,
    };
    if qty > 0.0 {
        position.long_units = qty;
        position.long_pnl = row.realized_pnl;
    } else {
        position.short_units = qty.abs();
        position.short_pnl = row.realized_pnl;
    }
    Some(position)
}

/// Round a unit count to whole shares.
pub fn check_trade_size(units: f64) -> f64 {
    units.round()
}

/// Round `price` to the nearest multiple of `tick`.
pub fn round_to_tick(price: f64, tick: f64) -> f64 {
    if tick <= 0.0 || !price.is_finite() {
        return price;
    }
    let rounded = (price / tick).round() * tick;
    // Trim float noise such as 101.15000000000001.
    (rounded * 1e8).round() / 1e8
}

/// Format a number for a `jData` field: integers without a fraction.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Fields shared by `PlaceOrder` and `ModifyOrder`.
fn price_fields(native: &NativeOrder, payload: &mut Map<String, Value>) {
    payload.insert("prctyp".into(), json!(native.price_type.code()));
    payload.insert("prc".into(), json!(format_number(native.price)));
    if let Some(trigger) = native.trigger_price {
        payload.insert("trgprc".into(), json!(format_number(trigger)));
    }
}

/// `jData` for `PlaceOrder` (without `uid` / `actid`).
pub fn place_order_payload(native: &NativeOrder, exchange: &str, product: &str) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("exch".into(), json!(exchange));
    payload.insert("tsym".into(), json!(encode_symbol(&native.trading_symbol)));
    payload.insert("qty".into(), json!(format_number(native.quantity)));
    payload.insert("prd".into(), json!(product));
    payload.insert("trantype".into(), json!(native.side.code()));
    payload.insert("ret".into(), json!(RETENTION_DAY));
    price_fields(native, &mut payload);
    payload
}

/// `jData` for `ModifyOrder`; requires the exchange order number.
pub fn modify_order_payload(native: &NativeOrder, exchange: &str) -> Result<Map<String, Value>> {
    if native.order_number.is_empty() {
        return Err(FvError::Rejected("modify requires an order id".into()));
    }
    let mut payload = Map::new();
    payload.insert("norenordno".into(), json!(native.order_number));
    payload.insert("exch".into(), json!(exchange));
    payload.insert("tsym".into(), json!(encode_symbol(&native.trading_symbol)));
    payload.insert("qty".into(), json!(format_number(native.quantity)));
    payload.insert("ret".into(), json!(RETENTION_DAY));
    price_fields(native, &mut payload);
    Ok(payload)
}
