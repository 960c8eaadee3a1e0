// 8.1: matching engine facade. owns one strategy per execution mode and
// routes drafts to them. both strategies draw ids from one sequence.

use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::Decimal;

use super::book_match::BookMatcher;
use super::config::EngineConfig;
use super::context::MatchContext;
use super::quick_trade::QuickTrade;
use super::results::{EngineError, ExecutionReport};
use super::settlement::IdSequence;
use super::strategy::{ExecutionMode, ExecutionStrategy};
use crate::config::ConfigError;
use crate::order::OrderDraft;

#[derive(Debug, Clone)]
pub struct MatchingEngine<R: Rng = StdRng> {
    book: BookMatcher,
    quick: QuickTrade<R>,
    ids: IdSequence,
}

impl MatchingEngine<StdRng> {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let ids = IdSequence::new();
        Ok(Self {
            book: BookMatcher::new(config.clone(), ids.clone()),
            quick: QuickTrade::new(config, ids.clone())?,
            ids,
        })
    }
}

impl<R: Rng> MatchingEngine<R> {
    /// Engine whose quick trades draw slippage from `rng`.
    pub fn with_rng(config: EngineConfig, ids: IdSequence, rng: R) -> Result<Self, ConfigError> {
        Ok(Self {
            book: BookMatcher::new(config.clone(), ids.clone()),
            quick: QuickTrade::with_rng(config, ids.clone(), rng)?,
            ids,
        })
    }

    pub fn ids(&self) -> &IdSequence {
        &self.ids
    }

    pub fn config(&self) -> &EngineConfig {
        self.book.config()
    }

    pub fn strategy(&mut self, mode: ExecutionMode) -> &mut dyn ExecutionStrategy {
        match mode {
            ExecutionMode::BookMatch => &mut self.book,
            ExecutionMode::QuickTrade => &mut self.quick,
        }
    }

    pub fn execute(
        &mut self,
        mode: ExecutionMode,
        draft: &OrderDraft,
        ctx: &MatchContext<'_>,
    ) -> Result<ExecutionReport, EngineError> {
        self.strategy(mode).execute(draft, ctx)
    }

    pub fn book_match(&mut self, draft: &OrderDraft, ctx: &MatchContext<'_>) -> Result<ExecutionReport, EngineError> {
        self.book.execute(draft, ctx)
    }

    pub fn quick_trade(&mut self, draft: &OrderDraft, ctx: &MatchContext<'_>) -> Result<ExecutionReport, EngineError> {
        self.quick.execute(draft, ctx)
    }

    pub fn swap(
        &mut self,
        from: &str,
        to: &str,
        amount: Decimal,
        ctx: &MatchContext<'_>,
    ) -> Result<ExecutionReport, EngineError> {
        self.quick.swap(from, to, amount, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{MarketPair, MarketTicker};
    use crate::order::OrderStatus;
    use crate::order_book::OrderBookSnapshot;
    use crate::portfolio::PortfolioState;
    use crate::types::{OrderId, Side, Timestamp};
    use rand::SeedableRng;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn modes_share_one_id_sequence() {
        let pair = MarketPair::btc_usdt();
        let now = Timestamp::from_millis(0);
        let ticker = MarketTicker::new(&pair.symbol, dec!(68000), now);
        let book = OrderBookSnapshot::from_levels(&pair.symbol, &[(dec!(67990), dec!(1))], &[(dec!(68010), dec!(1))], now);
        let prices = HashMap::from([("BTC".to_string(), dec!(68000))]);
        let mut portfolio = PortfolioState::new("USDT");
        portfolio.set_balance("USDT", dec!(100000));
        let ctx = MatchContext {
            pair: &pair,
            ticker: &ticker,
            order_book: &book,
            portfolio: &portfolio,
            price_map: &prices,
            base_currency: "USDT",
            now,
        };

        let mut engine = MatchingEngine::with_rng(EngineConfig::default(), IdSequence::new(), StdRng::seed_from_u64(1)).unwrap();
        let first = engine
            .execute(ExecutionMode::BookMatch, &OrderDraft::market("BTCUSDT", Side::Buy, dec!(0.1)), &ctx)
            .unwrap();
        let second = engine
            .execute(ExecutionMode::QuickTrade, &OrderDraft::quick("BTCUSDT", Side::Buy, dec!(500)), &ctx)
            .unwrap();

        assert_eq!(first.order.id, OrderId(1));
        assert_eq!(second.order.id, OrderId(2));
        assert_eq!(first.order.status, OrderStatus::Filled);
        assert_eq!(second.order.status, OrderStatus::Filled);
        assert!(second.slippage.is_some());
        assert!(first.slippage.is_none());
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = EngineConfig {
            equity_history_limit: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            MatchingEngine::new(config),
            Err(ConfigError::InvalidPortfolio { .. })
        ));
    }
}
