//! Synthetic depth snapshots.
//!
//! The simulated venue has no resting orders from other participants, only a
//! generated ladder of levels around the current price. Bids and asks are
//! stored best-first, each level carrying the running cumulative quantity.

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::BookConfig;
use crate::market::MarketPair;
use crate::precision::{floor_dp, round_dp, round_to_tick, to_decimal};
use crate::types::{Side, Timestamp};

/// A single price level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: Decimal,
    pub quantity: Decimal,
    /// Prefix sum of quantity from the best level up to and including this one.
    pub cumulative: Decimal,
}

/// Bid and ask ladders for one symbol, best level first on both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
    pub timestamp: Timestamp,
}

impl OrderBookSnapshot {
    pub fn empty(symbol: &str, timestamp: Timestamp) -> Self {
        Self {
            symbol: symbol.to_string(),
            bids: Vec::new(),
            asks: Vec::new(),
            timestamp,
        }
    }

    /// Build a snapshot from `(price, quantity)` pairs given best-first.
    /// Cumulative quantities are computed here.
    pub fn from_levels(
        symbol: &str,
        bids: &[(Decimal, Decimal)],
        asks: &[(Decimal, Decimal)],
        timestamp: Timestamp,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            bids: with_cumulative(bids),
            asks: with_cumulative(asks),
            timestamp,
        }
    }

    pub fn best_bid(&self) -> Option<&OrderBookLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&OrderBookLevel> {
        self.asks.first()
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / Decimal::TWO),
            _ => None,
        }
    }

    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// The side an order of `side` trades against: asks for a buy, bids for a sell.
    pub fn opposing_levels(&self, side: Side) -> &[OrderBookLevel] {
        match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        }
    }

    /// Bids strictly descending, asks strictly ascending, cumulative non-decreasing.
    pub fn is_well_formed(&self) -> bool {
        let bids_ordered = self.bids.windows(2).all(|w| w[0].price > w[1].price);
        let asks_ordered = self.asks.windows(2).all(|w| w[0].price < w[1].price);
        let cumulative_ok = |levels: &[OrderBookLevel]| {
            levels.windows(2).all(|w| w[0].cumulative <= w[1].cumulative)
        };
        bids_ordered && asks_ordered && cumulative_ok(&self.bids) && cumulative_ok(&self.asks)
    }

    pub fn total_quantity(&self, side: Side) -> Decimal {
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        levels.last().map(|l| l.cumulative).unwrap_or(Decimal::ZERO)
    }
}

fn with_cumulative(levels: &[(Decimal, Decimal)]) -> Vec<OrderBookLevel> {
    let mut running = Decimal::ZERO;
    levels
        .iter()
        .map(|(price, quantity)| {
            running += *quantity;
            OrderBookLevel {
                price: *price,
                quantity: *quantity,
                cumulative: running,
            }
        })
        .collect()
}

/// Generate a ladder of `config.depth` levels per side around `mid`.
///
/// Level `i` (1-based) sits `max(mid * spread * i, tick * i)` away from mid,
/// snapped to the tick grid, so consecutive levels are always at least one
/// tick apart. Bid levels that would fall below one tick are dropped. A
/// config without a usable quantity band sizes every level flat.
pub fn build_order_book<R: Rng + ?Sized>(
    pair: &MarketPair,
    mid: Decimal,
    config: &BookConfig,
    rng: &mut R,
    timestamp: Timestamp,
) -> OrderBookSnapshot {
    let mid = mid.max(pair.tick_size);
    let spread = config.spread_bps.as_fraction();
    let band = config
        .has_usable_band()
        .then(|| Uniform::new(config.quantity_band_low, config.quantity_band_high));
    let base_quantity = config.level_notional / mid;

    let mut bids = Vec::with_capacity(config.depth);
    let mut asks = Vec::with_capacity(config.depth);

    for i in 1..=config.depth {
        let step = Decimal::from(i as u64);
        let offset = (mid * spread * step).max(pair.tick_size * step);

        let ask_price = round_dp(round_to_tick(mid + offset, pair.tick_size), pair.price_precision);
        asks.push((ask_price, level_quantity(pair, base_quantity, band.map_or(1.0, |b| b.sample(rng)))));

        let bid_price = round_dp(round_to_tick(mid - offset, pair.tick_size), pair.price_precision);
        if bid_price >= pair.tick_size {
            bids.push((bid_price, level_quantity(pair, base_quantity, band.map_or(1.0, |b| b.sample(rng)))));
        }
    }

    OrderBookSnapshot::from_levels(&pair.symbol, &bids, &asks, timestamp)
}

fn level_quantity(pair: &MarketPair, base_quantity: Decimal, factor: f64) -> Decimal {
    let raw = base_quantity * to_decimal(factor);
    floor_dp(raw, pair.quantity_precision).max(pair.step_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketPair;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;

    #[test]
    fn from_levels_prefix_sums() {
        let book = OrderBookSnapshot::from_levels(
            "BTCUSDT",
            &[(dec!(99), dec!(1)), (dec!(98), dec!(2))],
            &[(dec!(101), dec!(0.5)), (dec!(102), dec!(1.5))],
            Timestamp::from_millis(0),
        );

        assert_eq!(book.bids[1].cumulative, dec!(3));
        assert_eq!(book.asks[1].cumulative, dec!(2));
        assert_eq!(book.mid_price(), Some(dec!(100)));
        assert_eq!(book.spread(), Some(dec!(2)));
        assert_eq!(book.opposing_levels(Side::Buy)[0].price, dec!(101));
        assert!(book.is_well_formed());
    }

    #[test]
    fn generated_book_is_monotonic() {
        let mut rng = StdRng::seed_from_u64(7);
        let pair = MarketPair::btc_usdt();
        let config = BookConfig::default();

        let book = build_order_book(&pair, dec!(68000), &config, &mut rng, Timestamp::from_millis(0));

        assert_eq!(book.bids.len(), 18);
        assert_eq!(book.asks.len(), 18);
        assert!(book.is_well_formed());
        assert!(book.best_bid().unwrap().price < dec!(68000));
        assert!(book.best_ask().unwrap().price > dec!(68000));
        for level in book.bids.iter().chain(book.asks.iter()) {
            assert!(level.quantity >= pair.step_size);
        }
    }

    #[test]
    fn tiny_prices_drop_bids_below_tick() {
        let mut rng = StdRng::seed_from_u64(11);
        let pair = MarketPair::doge_usdt();
        let config = BookConfig::default();

        let book = build_order_book(&pair, pair.tick_size, &config, &mut rng, Timestamp::from_millis(0));

        assert!(book.bids.is_empty());
        assert_eq!(book.asks.len(), config.depth);
        assert!(book.is_well_formed());
    }

    #[test]
    fn degenerate_band_sizes_levels_flat() {
        let mut rng = StdRng::seed_from_u64(3);
        let pair = MarketPair::btc_usdt();
        let config = BookConfig {
            quantity_band_low: 1.0,
            quantity_band_high: 1.0,
            ..BookConfig::default()
        };

        let book = build_order_book(&pair, dec!(68000), &config, &mut rng, Timestamp::from_millis(0));

        assert!(book.is_well_formed());
        for level in book.bids.iter().chain(book.asks.iter()) {
            assert_eq!(level.quantity, dec!(0.367647));
        }
    }

    #[test]
    fn empty_book_has_no_mid() {
        let book = OrderBookSnapshot::empty("ETHUSDT", Timestamp::from_millis(0));
        assert!(book.is_empty());
        assert!(book.mid_price().is_none());
        assert_eq!(book.total_quantity(Side::Buy), Decimal::ZERO);
    }
}
