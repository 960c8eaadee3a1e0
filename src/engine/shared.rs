// 8.4: portfolio shared between concurrent order submitters.
// the balance check and the settlement happen under one lock so two orders
// can never both pass against the same funds.

use std::sync::{Arc, Mutex, MutexGuard};

use super::context::MatchContext;
use super::results::{EngineError, ExecutionReport};
use super::strategy::ExecutionStrategy;
use crate::market::MarketState;
use crate::order::{OrderDraft, OrderStatus};
use crate::portfolio::PortfolioState;
use crate::types::Timestamp;

#[derive(Debug, Clone)]
pub struct SharedPortfolio {
    inner: Arc<Mutex<PortfolioState>>,
}

impl SharedPortfolio {
    pub fn new(portfolio: PortfolioState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(portfolio)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PortfolioState> {
        // the only write is a whole-value assignment, so a poisoned lock is still consistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> PortfolioState {
        self.lock().clone()
    }

    pub fn replace(&self, portfolio: PortfolioState) {
        *self.lock() = portfolio;
    }

    /// Run `strategy` against the current balances and commit the result
    /// before releasing the lock. Rejected orders leave the balances alone.
    pub fn execute<S>(
        &self,
        strategy: &mut S,
        draft: &OrderDraft,
        market: &MarketState,
        now: Timestamp,
    ) -> Result<ExecutionReport, EngineError>
    where
        S: ExecutionStrategy + ?Sized,
    {
        let mut guard = self.lock();
        let report = {
            let current: &PortfolioState = &guard;
            let ctx = MatchContext::from_market(market, &draft.symbol, current, now)?;
            strategy.execute(draft, &ctx)?
        };
        if report.order.status != OrderStatus::Rejected {
            *guard = report.updated_portfolio.clone();
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BookMatcher, EngineConfig, IdSequence};
    use crate::market::{MarketPair, MarketTicker};
    use crate::order_book::OrderBookSnapshot;
    use crate::types::Side;
    use rust_decimal_macros::dec;
    use std::thread;

    fn market() -> MarketState {
        let pair = MarketPair::btc_usdt();
        let now = Timestamp::from_millis(0);
        let mut market = MarketState::default();
        market
            .tickers
            .insert(pair.symbol.clone(), MarketTicker::new(&pair.symbol, dec!(68000), now));
        market.order_books.insert(
            pair.symbol.clone(),
            OrderBookSnapshot::from_levels(
                &pair.symbol,
                &[(dec!(67990), dec!(5))],
                &[(dec!(68010), dec!(5))],
                now,
            ),
        );
        market.price_map.insert("BTC".to_string(), dec!(68000));
        market.pairs.push(pair);
        market
    }

    #[test]
    fn concurrent_buys_cannot_overspend() {
        let market = Arc::new(market());
        let mut portfolio = PortfolioState::new("USDT");
        portfolio.set_balance("USDT", dec!(70000));
        let shared = SharedPortfolio::new(portfolio);
        let ids = IdSequence::new();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let shared = shared.clone();
                let market = Arc::clone(&market);
                let ids = ids.clone();
                thread::spawn(move || {
                    let mut matcher = BookMatcher::new(EngineConfig::default(), ids);
                    let draft = OrderDraft::market("BTCUSDT", Side::Buy, dec!(1));
                    shared
                        .execute(&mut matcher, &draft, &market, Timestamp::from_millis(1))
                        .unwrap()
                        .order
                        .status
                })
            })
            .collect();

        let statuses: Vec<OrderStatus> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let filled = statuses.iter().filter(|s| **s == OrderStatus::Filled).count();
        let rejected = statuses.iter().filter(|s| **s == OrderStatus::Rejected).count();
        assert_eq!((filled, rejected), (1, 1));

        let after = shared.snapshot();
        assert_eq!(after.free("BTC"), dec!(1));
        assert!(!after.has_negative_balance());
    }

    #[test]
    fn unknown_symbol_leaves_portfolio_alone() {
        let market = market();
        let mut portfolio = PortfolioState::new("USDT");
        portfolio.set_balance("USDT", dec!(10));
        let shared = SharedPortfolio::new(portfolio.clone());
        let mut matcher = BookMatcher::new(EngineConfig::default(), IdSequence::new());

        let err = shared
            .execute(
                &mut matcher,
                &OrderDraft::market("ETHUSDT", Side::Buy, dec!(1)),
                &market,
                Timestamp::from_millis(1),
            )
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownSymbol("ETHUSDT".to_string()));
        assert_eq!(shared.snapshot(), portfolio);
    }
}
