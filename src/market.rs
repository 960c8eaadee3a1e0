//! Market configuration and state.
//!
//! A pair is static once created. Tickers, candles, depth and the trade tape
//! are owned by the feed and overwritten or appended on every tick.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::candle::{Candle, CandleInterval, WindowSummary};
use crate::order::TradeFill;
use crate::order_book::OrderBookSnapshot;
use crate::types::Timestamp;

/// Static pair configuration (immutable after creation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPair {
    /// Exchange-style symbol (e.g. "BTCUSDT")
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    /// Decimal places carried on prices
    pub price_precision: u32,
    /// Decimal places carried on quantities
    pub quantity_precision: u32,
    /// Minimum price increment
    pub tick_size: Decimal,
    /// Minimum quantity increment
    pub step_size: Decimal,
    /// Smallest order value in quote units
    pub min_notional: Decimal,
}

impl MarketPair {
    pub fn new(
        base_asset: &str,
        quote_asset: &str,
        price_precision: u32,
        quantity_precision: u32,
        min_notional: Decimal,
    ) -> Self {
        Self {
            symbol: format!("{base_asset}{quote_asset}"),
            base_asset: base_asset.to_string(),
            quote_asset: quote_asset.to_string(),
            price_precision,
            quantity_precision,
            tick_size: Decimal::new(1, price_precision),
            step_size: Decimal::new(1, quantity_precision),
            min_notional,
        }
    }

    pub fn btc_usdt() -> Self {
        Self::new("BTC", "USDT", 2, 6, dec!(10))
    }

    pub fn eth_usdt() -> Self {
        Self::new("ETH", "USDT", 2, 5, dec!(10))
    }

    pub fn doge_usdt() -> Self {
        Self::new("DOGE", "USDT", 5, 0, dec!(1))
    }

    pub fn notional(&self, price: Decimal, quantity: Decimal) -> Decimal {
        price * quantity
    }
}

/// Rolling 24h statistics for a pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTicker {
    pub symbol: String,
    pub last_price: Decimal,
    /// Price one day back, the reference for percent change
    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub price_change_percent: Decimal,
    /// Base volume over the window
    pub volume: Decimal,
    pub quote_volume: Decimal,
    /// Last price before the most recent update
    pub previous_close: Decimal,
    pub timestamp: Timestamp,
    /// Newest price last
    pub sparkline: VecDeque<Decimal>,
}

impl MarketTicker {
    pub fn new(symbol: &str, price: Decimal, timestamp: Timestamp) -> Self {
        Self {
            symbol: symbol.to_string(),
            last_price: price,
            open_price: price,
            high_price: price,
            low_price: price,
            price_change_percent: Decimal::ZERO,
            volume: Decimal::ZERO,
            quote_volume: Decimal::ZERO,
            previous_close: price,
            timestamp,
            sparkline: VecDeque::from([price]),
        }
    }

    /// Append to the sparkline and evict from the front beyond `window`.
    pub fn push_sparkline(&mut self, price: Decimal, window: usize) {
        self.sparkline.push_back(price);
        while self.sparkline.len() > window {
            self.sparkline.pop_front();
        }
    }

    /// Percent change of `last` against `open`, zero when open is degenerate.
    pub fn change_percent(open: Decimal, last: Decimal) -> Decimal {
        if open.is_zero() {
            return Decimal::ZERO;
        }
        ((last - open) / open * dec!(100)).round_dp(2)
    }

    /// Fraction form of the 24h change (0.05 = +5%).
    pub fn change_fraction(&self) -> Decimal {
        self.price_change_percent / dec!(100)
    }

    /// Replace the day statistics with those of a trailing candle window.
    /// `last_price` is kept and folded into the extrema.
    pub fn roll_window(&mut self, window: &WindowSummary) {
        self.open_price = window.open;
        self.high_price = window.high.max(self.last_price);
        self.low_price = window.low.min(self.last_price);
        self.volume = window.volume;
        self.quote_volume = window.quote_volume;
        self.price_change_percent = Self::change_percent(self.open_price, self.last_price);
    }
}

/// Candle series of every supported interval for one symbol.
pub type CandleBook = HashMap<CandleInterval, VecDeque<Candle>>;

/// Everything the feed owns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketState {
    /// Catalog order; the feed iterates pairs in this order
    pub pairs: Vec<MarketPair>,
    pub tickers: HashMap<String, MarketTicker>,
    pub candles: HashMap<String, CandleBook>,
    pub order_books: HashMap<String, OrderBookSnapshot>,
    /// Newest trade last
    pub trades: HashMap<String, VecDeque<TradeFill>>,
    /// Asset symbol to price in the base currency
    pub price_map: HashMap<String, Decimal>,
    pub last_updated: Option<Timestamp>,
}

impl MarketState {
    pub fn pair(&self, symbol: &str) -> Option<&MarketPair> {
        self.pairs.iter().find(|p| p.symbol == symbol)
    }

    pub fn ticker(&self, symbol: &str) -> Option<&MarketTicker> {
        self.tickers.get(symbol)
    }

    pub fn order_book(&self, symbol: &str) -> Option<&OrderBookSnapshot> {
        self.order_books.get(symbol)
    }

    pub fn candles(&self, symbol: &str, interval: CandleInterval) -> Option<&VecDeque<Candle>> {
        self.candles.get(symbol).and_then(|book| book.get(&interval))
    }

    pub fn trades(&self, symbol: &str) -> Option<&VecDeque<TradeFill>> {
        self.trades.get(symbol)
    }

    pub fn price_of(&self, asset: &str) -> Option<Decimal> {
        self.price_map.get(asset).copied()
    }

    /// Append to the per-symbol tape, dropping the oldest beyond `cap`.
    pub fn record_trade(&mut self, fill: TradeFill, cap: usize) {
        let tape = self.trades.entry(fill.symbol.clone()).or_default();
        tape.push_back(fill);
        while tape.len() > cap {
            tape.pop_front();
        }
    }

    /// Case-insensitive match on symbol or base asset.
    pub fn search(&self, term: &str) -> Vec<&MarketPair> {
        let needle = term.trim().to_uppercase();
        self.pairs
            .iter()
            .filter(|p| needle.is_empty() || p.symbol.contains(&needle) || p.base_asset.contains(&needle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Liquidity;
    use crate::types::{Side, TradeId};

    #[test]
    fn pair_precision_defaults() {
        let pair = MarketPair::btc_usdt();
        assert_eq!(pair.symbol, "BTCUSDT");
        assert_eq!(pair.tick_size, dec!(0.01));
        assert_eq!(pair.step_size, dec!(0.000001));

        let doge = MarketPair::doge_usdt();
        assert_eq!(doge.step_size, dec!(1));
    }

    #[test]
    fn sparkline_is_bounded() {
        let mut ticker = MarketTicker::new("BTCUSDT", dec!(100), Timestamp::from_millis(0));
        for i in 0..10 {
            ticker.push_sparkline(Decimal::from(101 + i), 4);
        }
        assert_eq!(ticker.sparkline.len(), 4);
        assert_eq!(ticker.sparkline.back().copied(), Some(dec!(110)));
        assert_eq!(ticker.sparkline.front().copied(), Some(dec!(107)));
    }

    #[test]
    fn change_percent_handles_zero_open() {
        assert_eq!(MarketTicker::change_percent(dec!(100), dec!(105)), dec!(5));
        assert_eq!(MarketTicker::change_percent(Decimal::ZERO, dec!(105)), Decimal::ZERO);
    }

    #[test]
    fn trade_tape_is_capped() {
        let mut state = MarketState::default();
        for i in 0..5 {
            state.record_trade(
                TradeFill {
                    id: TradeId(i),
                    order_id: None,
                    symbol: "BTCUSDT".to_string(),
                    side: Side::Buy,
                    price: dec!(100),
                    quantity: dec!(1),
                    fee: dec!(0.1),
                    liquidity: Liquidity::Taker,
                    timestamp: Timestamp::from_millis(i as i64),
                },
                3,
            );
        }
        let tape = state.trades("BTCUSDT").unwrap();
        assert_eq!(tape.len(), 3);
        assert_eq!(tape.front().unwrap().id, TradeId(2));
    }

    #[test]
    fn search_matches_symbol_and_base() {
        let state = MarketState {
            pairs: vec![MarketPair::btc_usdt(), MarketPair::eth_usdt()],
            ..Default::default()
        };
        assert_eq!(state.search("eth").len(), 1);
        assert_eq!(state.search("usdt").len(), 2);
        assert_eq!(state.search("").len(), 2);
    }
}
