// 5.1: order blotter. open orders, archived history, and every local fill.
// orders only enter history once they reach a terminal status.

use serde::{Deserialize, Serialize};

use crate::engine::ExecutionReport;
use crate::order::{Order, OrderStatus, TimeInForce, TradeFill};
use crate::types::{OrderId, Timestamp};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrdersState {
    /// Newest first
    pub open_orders: Vec<Order>,
    /// Newest first
    pub order_history: Vec<Order>,
    /// Newest first
    pub trade_history: Vec<TradeFill>,
}

impl OrdersState {
    /// Store the outcome of an execution. IOC orders never stay open.
    pub fn record(&mut self, report: &ExecutionReport) {
        let mut order = report.order.clone();

        if !order.status.is_terminal() && order.time_in_force == TimeInForce::Ioc {
            order.transition(OrderStatus::Expired, order.updated_at);
        }

        for fill in report.fills.iter().rev() {
            self.trade_history.insert(0, fill.clone());
        }

        if order.status.is_terminal() {
            self.order_history.insert(0, order);
        } else {
            self.open_orders.insert(0, order);
        }
    }

    pub fn open_order(&self, id: OrderId) -> Option<&Order> {
        self.open_orders.iter().find(|o| o.id == id)
    }

    pub fn open_for(&self, symbol: &str) -> Vec<&Order> {
        self.open_orders.iter().filter(|o| o.symbol == symbol).collect()
    }

    /// Cancel a resting order and archive it.
    pub fn cancel(&mut self, id: OrderId, now: Timestamp) -> Result<Order, OrdersError> {
        let Some(index) = self.open_orders.iter().position(|o| o.id == id) else {
            return if self.order_history.iter().any(|o| o.id == id) {
                Err(OrdersError::AlreadyClosed(id))
            } else {
                Err(OrdersError::OrderNotFound(id))
            };
        };

        let mut order = self.open_orders.remove(index);
        if !order.transition(OrderStatus::Cancelled, now) {
            let status = order.status;
            self.open_orders.insert(index, order);
            return Err(OrdersError::InvalidTransition { id, status });
        }

        log::info!("cancelled {} on {}", order.id, order.symbol);
        self.order_history.insert(0, order.clone());
        Ok(order)
    }

    /// Expire every open order created before `cutoff`. Returns how many moved.
    pub fn expire_before(&mut self, cutoff: Timestamp, now: Timestamp) -> usize {
        let (stale, fresh): (Vec<Order>, Vec<Order>) = self
            .open_orders
            .drain(..)
            .partition(|o| o.created_at < cutoff);
        self.open_orders = fresh;

        let count = stale.len();
        for mut order in stale {
            order.transition(OrderStatus::Expired, now);
            self.order_history.insert(0, order);
        }
        count
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrdersError {
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    #[error("Order {0} is already closed")]
    AlreadyClosed(OrderId),

    #[error("Order {id} cannot leave status {status:?}")]
    InvalidTransition { id: OrderId, status: OrderStatus },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderDraft;
    use crate::portfolio::PortfolioState;
    use crate::types::Side;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn report(id: u64, draft: OrderDraft, status: OrderStatus, created: i64) -> ExecutionReport {
        let mut order = Order::from_draft(OrderId(id), &draft, Timestamp::from_millis(created));
        order.status = status;
        ExecutionReport {
            remaining_quantity: order.remaining_quantity(),
            order,
            fills: Vec::new(),
            updated_portfolio: PortfolioState::new("USDT"),
            slippage: None,
        }
    }

    #[test]
    fn resting_limit_goes_to_open() {
        let mut orders = OrdersState::default();
        let draft = OrderDraft::limit("BTCUSDT", Side::Buy, dec!(1), dec!(60000));
        orders.record(&report(1, draft, OrderStatus::New, 0));

        assert_eq!(orders.open_orders.len(), 1);
        assert!(orders.order_history.is_empty());
        assert_eq!(orders.open_for("BTCUSDT").len(), 1);
    }

    #[test]
    fn ioc_remainder_is_expired() {
        let mut orders = OrdersState::default();
        let draft = OrderDraft::limit("BTCUSDT", Side::Buy, dec!(1), dec!(60000)).with_time_in_force(TimeInForce::Ioc);
        orders.record(&report(1, draft, OrderStatus::PartiallyFilled, 0));

        assert!(orders.open_orders.is_empty());
        assert_eq!(orders.order_history[0].status, OrderStatus::Expired);
    }

    #[test]
    fn cancel_moves_to_history() {
        let mut orders = OrdersState::default();
        let draft = OrderDraft::limit("ETHUSDT", Side::Sell, dec!(2), dec!(3500));
        orders.record(&report(7, draft, OrderStatus::New, 0));

        let cancelled = orders.cancel(OrderId(7), Timestamp::from_millis(100)).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(orders.open_orders.is_empty());
        assert_eq!(orders.cancel(OrderId(7), Timestamp::from_millis(200)), Err(OrdersError::AlreadyClosed(OrderId(7))));
        assert_eq!(orders.cancel(OrderId(99), Timestamp::from_millis(200)), Err(OrdersError::OrderNotFound(OrderId(99))));
    }

    #[test]
    fn expire_only_stale_orders() {
        let mut orders = OrdersState::default();
        let draft = OrderDraft::limit("ETHUSDT", Side::Buy, dec!(1), dec!(2000));
        orders.record(&report(1, draft.clone(), OrderStatus::New, 0));
        orders.record(&report(2, draft, OrderStatus::New, 5_000));

        let expired = orders.expire_before(Timestamp::from_millis(1_000), Timestamp::from_millis(6_000));
        assert_eq!(expired, 1);
        assert_eq!(orders.open_orders[0].id, OrderId(2));
        assert_eq!(orders.order_history[0].status, OrderStatus::Expired);
        assert_eq!(orders.order_history[0].filled_quantity, Decimal::ZERO);
    }
}
