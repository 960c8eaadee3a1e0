//! Quick trade: one execution at last price plus random slippage.
//!
//! Skips the book entirely. Sized from a quote amount when the draft carries
//! one, otherwise from its base quantity. No balance check is made; the
//! settlement clamps at zero instead.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};
use rust_decimal::Decimal;

use super::config::EngineConfig;
use super::context::MatchContext;
use super::results::{EngineError, ExecutionReport};
use super::settlement::{settle_into_copy, IdSequence, Settlement};
use super::strategy::ExecutionStrategy;
use crate::config::ConfigError;
use crate::order::{Liquidity, Order, OrderDraft, OrderStatus, RejectReason, TradeFill};
use crate::precision::{fee, floor_dp, round_dp, to_decimal};
use crate::types::Side;

#[derive(Debug, Clone)]
pub struct QuickTrade<R: Rng = StdRng> {
    config: EngineConfig,
    ids: IdSequence,
    slippage: Uniform<f64>,
    rng: R,
}

impl QuickTrade<StdRng> {
    pub fn new(config: EngineConfig, ids: IdSequence) -> Result<Self, ConfigError> {
        Self::with_rng(config, ids, StdRng::from_entropy())
    }
}

impl<R: Rng> QuickTrade<R> {
    /// Fails if `config` does not pass [`EngineConfig::validate`].
    pub fn with_rng(config: EngineConfig, ids: IdSequence, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let slippage = Uniform::new_inclusive(config.slippage_min, config.slippage_max);
        Ok(Self {
            config,
            ids,
            slippage,
            rng,
        })
    }

    fn sample_slippage(&mut self) -> Decimal {
        round_dp(to_decimal(self.slippage.sample(&mut self.rng)), 6)
    }

    /// Convert `amount` of `from` into `to` through the context pair, in
    /// either direction.
    pub fn swap(
        &mut self,
        from: &str,
        to: &str,
        amount: Decimal,
        ctx: &MatchContext<'_>,
    ) -> Result<ExecutionReport, EngineError> {
        let pair = ctx.pair;
        let draft = if from == pair.quote_asset && to == pair.base_asset {
            OrderDraft::quick(&pair.symbol, Side::Buy, amount)
        } else if from == pair.base_asset && to == pair.quote_asset {
            OrderDraft::market(&pair.symbol, Side::Sell, amount)
        } else {
            return Err(EngineError::UnsupportedSwap {
                from: from.to_string(),
                to: to.to_string(),
                symbol: pair.symbol.clone(),
            });
        };
        self.execute(&draft, ctx)
    }

    fn rejected(&self, order: Order, reason: RejectReason, ctx: &MatchContext<'_>) -> ExecutionReport {
        log::info!("rejected quick {} {} {}: {:?}", order.id, order.side, order.symbol, reason);
        ExecutionReport {
            remaining_quantity: order.quantity.max(Decimal::ZERO),
            order: order.reject(reason),
            fills: Vec::new(),
            updated_portfolio: ctx.portfolio.clone(),
            slippage: None,
        }
    }
}

impl<R: Rng> ExecutionStrategy for QuickTrade<R> {
    fn name(&self) -> &'static str {
        "quick_trade"
    }

    fn execute(&mut self, draft: &OrderDraft, ctx: &MatchContext<'_>) -> Result<ExecutionReport, EngineError> {
        if draft.symbol != ctx.pair.symbol {
            return Err(EngineError::SymbolMismatch {
                draft: draft.symbol.clone(),
                context: ctx.pair.symbol.clone(),
            });
        }

        let mut order = Order::from_draft(self.ids.next_order(), draft, ctx.now);
        let pair = ctx.pair;
        let last = ctx.ticker.last_price;

        let sized = draft.quote_quantity.unwrap_or(draft.quantity);
        if sized <= Decimal::ZERO {
            return Ok(self.rejected(order, RejectReason::NonPositiveQuantity, ctx));
        }
        if last <= Decimal::ZERO {
            return Ok(self.rejected(order, RejectReason::InvalidPrice, ctx));
        }

        let slippage = self.sample_slippage();
        let adjusted = match draft.side {
            Side::Buy => last * (Decimal::ONE + slippage),
            Side::Sell => last * (Decimal::ONE - slippage),
        };
        let price = round_dp(adjusted, pair.price_precision).max(pair.tick_size);

        let quantity = match draft.quote_quantity {
            Some(fiat) => floor_dp(fiat / price, pair.quantity_precision),
            None => floor_dp(draft.quantity, pair.quantity_precision),
        };
        if quantity <= Decimal::ZERO {
            return Ok(self.rejected(order, RejectReason::NonPositiveQuantity, ctx));
        }

        let notional = price * quantity;
        let fill = TradeFill {
            id: self.ids.next_trade(),
            order_id: Some(order.id),
            symbol: pair.symbol.clone(),
            side: draft.side,
            price,
            quantity,
            fee: fee(notional, self.config.fee_rate),
            liquidity: Liquidity::Taker,
            timestamp: ctx.now,
        };

        order.quantity = quantity;
        order.price = Some(price);
        order.filled_quantity = quantity;
        order.avg_price = Some(price);
        order.fees_paid = fill.fee;
        order.status = OrderStatus::Filled;
        order.updated_at = ctx.now;

        let settlement = Settlement {
            side: draft.side,
            quantity,
            notional,
            fees: fill.fee,
        };
        let updated_portfolio = settle_into_copy(&settlement, ctx, self.config.equity_history_limit);

        log::debug!(
            "{} {} {} {} {} @ {} (slippage {})",
            self.name(),
            order.id,
            order.side,
            quantity,
            order.symbol,
            price,
            slippage
        );

        Ok(ExecutionReport {
            order,
            fills: vec![fill],
            remaining_quantity: Decimal::ZERO,
            updated_portfolio,
            slippage: Some(slippage),
        })
    }
}
