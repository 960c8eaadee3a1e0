//! Balance bookkeeping shared by every execution strategy.

use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::context::MatchContext;
use crate::market::MarketPair;
use crate::portfolio::{EquityPoint, PortfolioState};
use crate::types::{OrderId, Side, TradeId};

/// Order and trade id counters. Clones share the same counters so both
/// strategies draw from one sequence.
#[derive(Debug, Clone)]
pub struct IdSequence {
    orders: Arc<AtomicU64>,
    trades: Arc<AtomicU64>,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            orders: Arc::new(AtomicU64::new(first)),
            trades: Arc::new(AtomicU64::new(first)),
        }
    }

    pub fn next_order(&self) -> OrderId {
        OrderId(self.orders.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_trade(&self) -> TradeId {
        TradeId(self.trades.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate of the fills of one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub side: Side,
    pub quantity: Decimal,
    pub notional: Decimal,
    pub fees: Decimal,
}

impl Settlement {
    /// Buy: quote -= notional + fees, base += quantity.
    /// Sell: base -= quantity, quote += notional - fees.
    /// Every balance is clamped at zero.
    pub fn apply(&self, portfolio: &mut PortfolioState, pair: &MarketPair) {
        if self.quantity <= Decimal::ZERO {
            return;
        }
        match self.side {
            Side::Buy => {
                portfolio.debit(&pair.quote_asset, self.notional + self.fees);
                portfolio.credit(&pair.base_asset, self.quantity);
            }
            Side::Sell => {
                portfolio.debit(&pair.base_asset, self.quantity);
                portfolio.credit(&pair.quote_asset, self.notional - self.fees);
            }
        }
    }
}

/// Settle into a copy of the context portfolio, revalue it and append an equity point.
pub(crate) fn settle_into_copy(
    settlement: &Settlement,
    ctx: &MatchContext<'_>,
    equity_history_limit: usize,
) -> PortfolioState {
    let mut portfolio = ctx.portfolio.clone();
    settlement.apply(&mut portfolio, ctx.pair);

    let value = portfolio.revalue(&ctx.valuation_prices());
    portfolio.push_equity(
        EquityPoint {
            timestamp: ctx.now,
            value,
        },
        equity_history_limit,
    );
    portfolio.updated_at = Some(ctx.now);
    portfolio
}
