//! Order types, status lifecycle and trade fills.
//!
//! Status machine:
//! `new -> {partially_filled -> filled | cancelled | expired} | rejected`.
//! `new` and `partially_filled` may also move directly to `filled`,
//! `cancelled` or `expired`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{OrderId, Side, Timestamp, TradeId};

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Executes against the book at whatever levels are available.
    Market,
    /// Executes only at the limit price or better.
    Limit,
}

/// Order time in force options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good till canceled. Unfilled remainder stays open.
    #[serde(rename = "GTC")]
    Gtc,
    /// Immediate or cancel. Unfilled remainder is dropped.
    #[serde(rename = "IOC")]
    Ioc,
}

impl Default for TimeInForce {
    fn default() -> Self {
        Self::Gtc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Expired,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Expired | OrderStatus::Rejected
        )
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (New, PartiallyFilled | Filled | Cancelled | Expired | Rejected) => true,
            (PartiallyFilled, PartiallyFilled | Filled | Cancelled | Expired) => true,
            _ => false,
        }
    }
}

/// Why an order was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NonPositiveQuantity,
    InsufficientBalance,
    InvalidPrice,
}

/// What the caller asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    /// Base quantity
    pub quantity: Decimal,
    /// Limit price, required for limit orders
    pub price: Option<Decimal>,
    /// Quote amount to spend or receive; quick trades size from this when set
    pub quote_quantity: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub client_order_id: Option<String>,
}

impl OrderDraft {
    pub fn market(symbol: &str, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            quote_quantity: None,
            time_in_force: TimeInForce::Ioc,
            client_order_id: None,
        }
    }

    pub fn limit(symbol: &str, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            quote_quantity: None,
            time_in_force: TimeInForce::Gtc,
            client_order_id: None,
        }
    }

    /// Market order sized in quote currency ("buy $250 of BTC").
    pub fn quick(symbol: &str, side: Side, quote_amount: Decimal) -> Self {
        Self {
            quote_quantity: Some(quote_amount),
            ..Self::market(symbol, side, Decimal::ZERO)
        }
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }
}

/// A submitted order and its execution state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub client_order_id: Option<String>,
    pub filled_quantity: Decimal,
    pub avg_price: Option<Decimal>,
    pub status: OrderStatus,
    pub reject_reason: Option<RejectReason>,
    pub fees_paid: Decimal,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    pub fn from_draft(id: OrderId, draft: &OrderDraft, now: Timestamp) -> Self {
        Self {
            id,
            symbol: draft.symbol.clone(),
            side: draft.side,
            order_type: draft.order_type,
            quantity: draft.quantity,
            price: draft.price,
            time_in_force: draft.time_in_force,
            client_order_id: draft.client_order_id.clone(),
            filled_quantity: Decimal::ZERO,
            avg_price: None,
            status: OrderStatus::New,
            reject_reason: None,
            fees_paid: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining_quantity(&self) -> Decimal {
        (self.quantity - self.filled_quantity).max(Decimal::ZERO)
    }

    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn reject(mut self, reason: RejectReason) -> Self {
        self.status = OrderStatus::Rejected;
        self.reject_reason = Some(reason);
        self
    }

    /// Move to `next` if the lifecycle allows it. Returns whether it moved.
    pub fn transition(&mut self, next: OrderStatus, now: Timestamp) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at = now;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liquidity {
    Maker,
    Taker,
}

/// One execution. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeFill {
    pub id: TradeId,
    /// None for synthetic tape prints that belong to no local order
    pub order_id: Option<OrderId>,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub fee: Decimal,
    pub liquidity: Liquidity,
    pub timestamp: Timestamp,
}

impl TradeFill {
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}
