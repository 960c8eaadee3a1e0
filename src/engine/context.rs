//! Read-only inputs to an execution.

use rust_decimal::Decimal;
use std::collections::HashMap;

use super::results::EngineError;
use crate::market::{MarketPair, MarketState, MarketTicker};
use crate::order_book::OrderBookSnapshot;
use crate::portfolio::PortfolioState;
use crate::types::Timestamp;

/// Everything a strategy reads. Borrowed, so strategies cannot mutate it.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub pair: &'a MarketPair,
    pub ticker: &'a MarketTicker,
    pub order_book: &'a OrderBookSnapshot,
    pub portfolio: &'a PortfolioState,
    pub price_map: &'a HashMap<String, Decimal>,
    pub base_currency: &'a str,
    pub now: Timestamp,
}

impl<'a> MatchContext<'a> {
    /// Pull the pieces for `symbol` out of the live market state.
    pub fn from_market(
        market: &'a MarketState,
        symbol: &str,
        portfolio: &'a PortfolioState,
        now: Timestamp,
    ) -> Result<Self, EngineError> {
        let pair = market
            .pair(symbol)
            .ok_or_else(|| EngineError::UnknownSymbol(symbol.to_string()))?;
        let ticker = market.ticker(symbol).ok_or_else(|| EngineError::MissingMarketData {
            symbol: symbol.to_string(),
            what: "ticker",
        })?;
        let order_book = market.order_book(symbol).ok_or_else(|| EngineError::MissingMarketData {
            symbol: symbol.to_string(),
            what: "order book",
        })?;

        Ok(Self {
            pair,
            ticker,
            order_book,
            portfolio,
            price_map: &market.price_map,
            base_currency: &portfolio.base_currency,
            now,
        })
    }

    /// Price map with the traded pair's base asset marked at the ticker price.
    pub fn valuation_prices(&self) -> HashMap<String, Decimal> {
        let mut prices = self.price_map.clone();
        prices.insert(self.pair.base_asset.clone(), self.ticker.last_price);
        prices
    }
}
