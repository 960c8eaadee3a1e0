//! Book-aware execution.
//!
//! Walks the opposing side of the supplied depth snapshot best level first,
//! respecting the limit price, and settles the result into a copy of the
//! caller's portfolio. Deterministic given the snapshot.

use rust_decimal::Decimal;

use super::config::EngineConfig;
use super::context::MatchContext;
use super::results::{EngineError, ExecutionReport};
use super::settlement::{settle_into_copy, IdSequence, Settlement};
use super::strategy::ExecutionStrategy;
use crate::order::{Liquidity, Order, OrderDraft, OrderStatus, OrderType, RejectReason, TimeInForce, TradeFill};
use crate::precision::{fee, floor_dp, round_dp, FEE_DP};
use crate::types::Side;

#[derive(Debug, Clone)]
pub struct BookMatcher {
    config: EngineConfig,
    ids: IdSequence,
}

impl BookMatcher {
    pub fn new(config: EngineConfig, ids: IdSequence) -> Self {
        Self { config, ids }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Limit orders use their own price. Market orders use the best opposing
    /// level, or the last traded price when that side is empty.
    fn reference_price(draft: &OrderDraft, ctx: &MatchContext<'_>) -> Decimal {
        match draft.order_type {
            OrderType::Limit => draft.price.unwrap_or(Decimal::ZERO),
            OrderType::Market => ctx
                .order_book
                .opposing_levels(draft.side)
                .first()
                .map(|level| level.price)
                .unwrap_or(ctx.ticker.last_price),
        }
    }

    fn has_sufficient_balance(&self, order: &Order, reference: Decimal, ctx: &MatchContext<'_>) -> bool {
        match order.side {
            Side::Buy => {
                let required = reference * order.quantity * (Decimal::ONE + self.config.fee_rate);
                ctx.portfolio.free(&ctx.pair.quote_asset) >= required
            }
            Side::Sell => ctx.portfolio.free(&ctx.pair.base_asset) >= order.quantity,
        }
    }

    fn make_fill(&self, order: &Order, price: Decimal, quantity: Decimal, ctx: &MatchContext<'_>) -> TradeFill {
        TradeFill {
            id: self.ids.next_trade(),
            order_id: Some(order.id),
            symbol: order.symbol.clone(),
            side: order.side,
            price,
            quantity,
            fee: fee(price * quantity, self.config.fee_rate),
            liquidity: Liquidity::Taker,
            timestamp: ctx.now,
        }
    }

    /// Consume opposing levels until the order is done or the limit stops it.
    fn walk_book(&self, order: &Order, ctx: &MatchContext<'_>) -> Vec<TradeFill> {
        let levels = ctx.order_book.opposing_levels(order.side);
        let precision = ctx.pair.quantity_precision;
        let mut remaining = order.quantity;
        let mut fills = Vec::new();

        for level in levels {
            if remaining <= Decimal::ZERO {
                break;
            }
            if let (OrderType::Limit, Some(limit)) = (order.order_type, order.price) {
                let crosses = match order.side {
                    Side::Buy => level.price <= limit,
                    Side::Sell => level.price >= limit,
                };
                if !crosses {
                    break;
                }
            }

            let quantity = floor_dp(level.quantity.min(remaining), precision);
            if quantity <= Decimal::ZERO {
                continue;
            }
            fills.push(self.make_fill(order, level.price, quantity, ctx));
            remaining -= quantity;
        }

        // market orders always make progress while the opposing side has liquidity
        if fills.is_empty() && order.order_type == OrderType::Market {
            if let Some(best) = levels.first() {
                let quantity = best.quantity.min(remaining);
                if quantity > Decimal::ZERO {
                    fills.push(self.make_fill(order, best.price, quantity, ctx));
                }
            }
        }

        fills
    }

    fn rejected(&self, order: Order, reason: RejectReason, ctx: &MatchContext<'_>) -> ExecutionReport {
        log::info!("rejected {} {} {}: {:?}", order.id, order.side, order.symbol, reason);
        ExecutionReport {
            remaining_quantity: order.quantity.max(Decimal::ZERO),
            order: order.reject(reason),
            fills: Vec::new(),
            updated_portfolio: ctx.portfolio.clone(),
            slippage: None,
        }
    }
}

impl ExecutionStrategy for BookMatcher {
    fn name(&self) -> &'static str {
        "book_match"
    }

    fn execute(&mut self, draft: &OrderDraft, ctx: &MatchContext<'_>) -> Result<ExecutionReport, EngineError> {
        if draft.symbol != ctx.pair.symbol {
            return Err(EngineError::SymbolMismatch {
                draft: draft.symbol.clone(),
                context: ctx.pair.symbol.clone(),
            });
        }
        if draft.order_type == OrderType::Limit && draft.price.is_none() {
            return Err(EngineError::MissingLimitPrice(draft.symbol.clone()));
        }

        let mut order = Order::from_draft(self.ids.next_order(), draft, ctx.now);

        // sub-step precision could never be filled and would leave dust open
        order.quantity = floor_dp(draft.quantity, ctx.pair.quantity_precision);
        if order.quantity <= Decimal::ZERO {
            return Ok(self.rejected(order, RejectReason::NonPositiveQuantity, ctx));
        }

        let reference = Self::reference_price(draft, ctx);
        if reference <= Decimal::ZERO {
            return Ok(self.rejected(order, RejectReason::InvalidPrice, ctx));
        }
        if !self.has_sufficient_balance(&order, reference, ctx) {
            return Ok(self.rejected(order, RejectReason::InsufficientBalance, ctx));
        }

        let fills = self.walk_book(&order, ctx);

        let filled: Decimal = fills.iter().map(|f| f.quantity).sum();
        let notional: Decimal = fills.iter().map(|f| f.notional()).sum();
        let fees: Decimal = fills.iter().map(|f| f.fee).sum();
        let remaining = (order.quantity - filled).max(Decimal::ZERO);

        order.filled_quantity = filled;
        order.fees_paid = round_dp(fees, FEE_DP);
        order.avg_price = (filled > Decimal::ZERO).then(|| round_dp(notional / filled, FEE_DP));
        order.updated_at = ctx.now;
        order.status = if filled.is_zero() {
            match (order.order_type, order.time_in_force) {
                (OrderType::Limit, TimeInForce::Gtc) => OrderStatus::New,
                _ => OrderStatus::Expired,
            }
        } else if remaining.is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };

        let updated_portfolio = if filled > Decimal::ZERO {
            let settlement = Settlement {
                side: order.side,
                quantity: filled,
                notional,
                fees: order.fees_paid,
            };
            settle_into_copy(&settlement, ctx, self.config.equity_history_limit)
        } else {
            ctx.portfolio.clone()
        };

        log::debug!(
            "{} {} {} {}: {} fills, filled {} of {} ({:?})",
            self.name(),
            order.id,
            order.side,
            order.symbol,
            fills.len(),
            filled,
            order.quantity,
            order.status
        );

        Ok(ExecutionReport {
            order,
            fills,
            remaining_quantity: remaining,
            updated_portfolio,
            slippage: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{MarketPair, MarketTicker};
    use crate::order_book::OrderBookSnapshot;
    use crate::portfolio::PortfolioState;
    use crate::types::Timestamp;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct Fixture {
        pair: MarketPair,
        ticker: MarketTicker,
        book: OrderBookSnapshot,
        portfolio: PortfolioState,
        prices: HashMap<String, Decimal>,
    }

    impl Fixture {
        fn new(asks: &[(Decimal, Decimal)], bids: &[(Decimal, Decimal)]) -> Self {
            let pair = MarketPair::btc_usdt();
            let now = Timestamp::from_millis(1_000);
            let mut portfolio = PortfolioState::new("USDT");
            portfolio.set_balance("USDT", dec!(100000));
            portfolio.set_balance("BTC", dec!(2));
            Self {
                ticker: MarketTicker::new(&pair.symbol, dec!(68000), now),
                book: OrderBookSnapshot::from_levels(&pair.symbol, bids, asks, now),
                pair,
                portfolio,
                prices: HashMap::from([("BTC".to_string(), dec!(68000))]),
            }
        }

        fn ctx(&self) -> MatchContext<'_> {
            MatchContext {
                pair: &self.pair,
                ticker: &self.ticker,
                order_book: &self.book,
                portfolio: &self.portfolio,
                price_map: &self.prices,
                base_currency: "USDT",
                now: Timestamp::from_millis(2_000),
            }
        }
    }

    fn matcher() -> BookMatcher {
        BookMatcher::new(EngineConfig::default(), IdSequence::new())
    }

    #[test]
    fn market_buy_walks_levels() {
        let fx = Fixture::new(&[(dec!(68000), dec!(0.5)), (dec!(68010), dec!(1))], &[]);
        let report = matcher()
            .execute(&OrderDraft::market("BTCUSDT", Side::Buy, dec!(0.8)), &fx.ctx())
            .unwrap();

        assert_eq!(report.order.status, OrderStatus::Filled);
        assert_eq!(report.fills.len(), 2);
        assert_eq!(report.fills[1].quantity, dec!(0.3));
        assert_eq!(report.notional(), dec!(54403));
        assert_eq!(report.updated_portfolio.free("BTC"), dec!(2.8));
    }

    #[test]
    fn limit_buy_stops_at_limit() {
        let fx = Fixture::new(&[(dec!(68000), dec!(0.5)), (dec!(68010), dec!(1))], &[]);
        let report = matcher()
            .execute(&OrderDraft::limit("BTCUSDT", Side::Buy, dec!(1), dec!(68005)), &fx.ctx())
            .unwrap();

        assert_eq!(report.order.status, OrderStatus::PartiallyFilled);
        assert_eq!(report.order.filled_quantity, dec!(0.5));
        assert_eq!(report.remaining_quantity, dec!(0.5));
        assert_eq!(report.order.avg_price, Some(dec!(68000)));
    }

    #[test]
    fn limit_sell_without_crossing_bids_rests() {
        let fx = Fixture::new(&[(dec!(68000), dec!(0.5))], &[(dec!(67990), dec!(1))]);
        let report = matcher()
            .execute(&OrderDraft::limit("BTCUSDT", Side::Sell, dec!(0.5), dec!(68500)), &fx.ctx())
            .unwrap();

        assert_eq!(report.order.status, OrderStatus::New);
        assert!(report.fills.is_empty());
        assert_eq!(report.updated_portfolio, fx.portfolio);
    }

    #[test]
    fn ioc_limit_without_fill_expires() {
        let fx = Fixture::new(&[(dec!(68000), dec!(0.5))], &[]);
        let draft = OrderDraft::limit("BTCUSDT", Side::Buy, dec!(0.1), dec!(60000)).with_time_in_force(TimeInForce::Ioc);
        let report = matcher().execute(&draft, &fx.ctx()).unwrap();

        assert_eq!(report.order.status, OrderStatus::Expired);
    }

    #[test]
    fn market_order_on_empty_side_expires() {
        let fx = Fixture::new(&[], &[]);
        let report = matcher()
            .execute(&OrderDraft::market("BTCUSDT", Side::Buy, dec!(0.1)), &fx.ctx())
            .unwrap();

        assert_eq!(report.order.status, OrderStatus::Expired);
        assert_eq!(report.updated_portfolio, fx.portfolio);
    }

    #[test]
    fn dust_level_is_forced_through() {
        let fx = Fixture::new(&[(dec!(68000), dec!(0.0000004))], &[]);
        let report = matcher()
            .execute(&OrderDraft::market("BTCUSDT", Side::Buy, dec!(0.1)), &fx.ctx())
            .unwrap();

        assert_eq!(report.order.status, OrderStatus::PartiallyFilled);
        assert_eq!(report.fills.len(), 1);
        assert_eq!(report.fills[0].quantity, dec!(0.0000004));
    }

    #[test]
    fn quantity_is_floored_to_step_at_intake() {
        let fx = Fixture::new(&[(dec!(68000), dec!(5)), (dec!(68010), dec!(5))], &[]);
        let report = matcher()
            .execute(&OrderDraft::market("BTCUSDT", Side::Buy, dec!(0.1234567)), &fx.ctx())
            .unwrap();

        assert_eq!(report.order.status, OrderStatus::Filled);
        assert_eq!(report.order.quantity, dec!(0.123456));
        assert_eq!(report.order.filled_quantity, dec!(0.123456));
        assert_eq!(report.remaining_quantity, Decimal::ZERO);
    }

    #[test]
    fn sub_step_quantity_is_rejected() {
        let fx = Fixture::new(&[(dec!(68000), dec!(0.5))], &[]);
        let report = matcher()
            .execute(&OrderDraft::market("BTCUSDT", Side::Buy, dec!(0.0000001)), &fx.ctx())
            .unwrap();

        assert_eq!(report.order.status, OrderStatus::Rejected);
        assert_eq!(report.order.reject_reason, Some(RejectReason::NonPositiveQuantity));
        assert_eq!(report.updated_portfolio, fx.portfolio);
    }

    #[test]
    fn sell_needs_base_balance() {
        let fx = Fixture::new(&[], &[(dec!(67990), dec!(5))]);
        let report = matcher()
            .execute(&OrderDraft::market("BTCUSDT", Side::Sell, dec!(3)), &fx.ctx())
            .unwrap();

        assert_eq!(report.order.status, OrderStatus::Rejected);
        assert_eq!(report.order.reject_reason, Some(RejectReason::InsufficientBalance));
    }

    #[test]
    fn mismatched_symbol_is_an_error() {
        let fx = Fixture::new(&[], &[]);
        let err = matcher()
            .execute(&OrderDraft::market("ETHUSDT", Side::Buy, dec!(1)), &fx.ctx())
            .unwrap_err();
        assert!(matches!(err, EngineError::SymbolMismatch { .. }));
    }

    #[test]
    fn limit_without_price_is_an_error() {
        let fx = Fixture::new(&[], &[]);
        let mut draft = OrderDraft::limit("BTCUSDT", Side::Buy, dec!(1), dec!(1));
        draft.price = None;
        assert_eq!(
            matcher().execute(&draft, &fx.ctx()).unwrap_err(),
            EngineError::MissingLimitPrice("BTCUSDT".to_string())
        );
    }

    #[test]
    fn fill_appends_equity_point() {
        let fx = Fixture::new(&[(dec!(68000), dec!(0.5))], &[]);
        let report = matcher()
            .execute(&OrderDraft::market("BTCUSDT", Side::Buy, dec!(0.1)), &fx.ctx())
            .unwrap();

        let portfolio = &report.updated_portfolio;
        assert_eq!(portfolio.equity_history.len(), 1);
        assert_eq!(portfolio.equity_history[0].value, portfolio.total_value);
        assert_eq!(portfolio.updated_at, Some(Timestamp::from_millis(2_000)));
    }
}
