// 9.0: seed generator. builds a complete, self-consistent market and
// portfolio from nothing. create_seed cannot fail; create_seed_with only
// fails on an invalid config. not reproducible unless the caller supplies a
// seeded rng through create_seed_with.

use std::collections::{HashMap, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::candle::{aggregate, CandleInterval};
use crate::config::{ConfigError, SimulationConfig};
use crate::market::{CandleBook, MarketPair, MarketState, MarketTicker};
use crate::order_book::build_order_book;
use crate::orders::OrdersState;
use crate::portfolio::{EquityPoint, PortfolioState};
use crate::precision::{floor_dp, round_dp, to_decimal, FEE_DP};
use crate::snapshot::{SimulationSettings, SimulationSnapshot};
use crate::types::Timestamp;

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MINUTES: usize = 1440;

/// One tradable asset of the fixed catalog.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub asset: &'static str,
    pub reference_price: Decimal,
    pub price_precision: u32,
    pub quantity_precision: u32,
    pub min_notional: Decimal,
}

const fn entry(
    asset: &'static str,
    reference_price: Decimal,
    price_precision: u32,
    quantity_precision: u32,
    min_notional: Decimal,
) -> CatalogEntry {
    CatalogEntry {
        asset,
        reference_price,
        price_precision,
        quantity_precision,
        min_notional,
    }
}

/// Reference prices are in USD terms. Catalog order is feed order.
pub const CATALOG: [CatalogEntry; 8] = [
    entry("BTC", dec!(68000), 2, 6, dec!(10)),
    entry("ETH", dec!(3000), 2, 5, dec!(10)),
    entry("SOL", dec!(150), 2, 3, dec!(5)),
    entry("DOGE", dec!(0.12), 5, 0, dec!(1)),
    entry("CRO", dec!(0.18), 5, 0, dec!(1)),
    entry("XRP", dec!(0.55), 4, 1, dec!(1)),
    entry("USDC", dec!(1), 4, 2, dec!(1)),
    entry("USDT", dec!(1), 4, 2, dec!(1)),
];

/// Starting balances.
pub const ALLOCATION: [(&str, Decimal); 8] = [
    ("BTC", dec!(0.225)),
    ("ETH", dec!(2.15)),
    ("SOL", dec!(120)),
    ("DOGE", dec!(12000)),
    ("CRO", dec!(2500)),
    ("XRP", dec!(3000)),
    ("USDT", dec!(2500)),
    ("USDC", dec!(5200)),
];

const BASE_CURRENCY_FLOAT: Decimal = dec!(2500);

/// Every catalog asset quoted in `base_currency`, skipping the base itself.
pub fn catalog_pairs(base_currency: &str) -> Vec<(MarketPair, Decimal)> {
    CATALOG
        .iter()
        .filter(|e| e.asset != base_currency)
        .map(|e| {
            let pair = MarketPair::new(
                e.asset,
                base_currency,
                e.price_precision,
                e.quantity_precision,
                e.min_notional,
            );
            (pair, e.reference_price)
        })
        .collect()
}

/// Seed with fresh entropy at `timestamp`, or now.
pub fn create_seed(base_currency: &str, timestamp: Option<Timestamp>) -> SimulationSnapshot {
    let mut rng = StdRng::from_entropy();
    let now = timestamp.unwrap_or_else(Timestamp::now);
    build_seed(&mut rng, base_currency, now, &SimulationConfig::default())
}

/// Seed from `rng` with a caller-supplied config, which is validated first.
pub fn create_seed_with<R: Rng + ?Sized>(
    rng: &mut R,
    base_currency: &str,
    now: Timestamp,
    config: &SimulationConfig,
) -> Result<SimulationSnapshot, ConfigError> {
    config.validate()?;
    Ok(build_seed(rng, base_currency, now, config))
}

fn build_seed<R: Rng + ?Sized>(
    rng: &mut R,
    base_currency: &str,
    now: Timestamp,
    config: &SimulationConfig,
) -> SimulationSnapshot {
    let market = seed_market(rng, base_currency, now, config);
    let portfolio = seed_portfolio(rng, base_currency, &market, now, config);
    log::info!(
        "seeded {} pairs, portfolio {} {}",
        market.pairs.len(),
        portfolio.total_value,
        base_currency
    );

    SimulationSnapshot {
        market,
        portfolio,
        orders: OrdersState::default(),
        settings: SimulationSettings::new(base_currency),
        earn_positions: Vec::new(),
    }
}

/// Per-minute `(timestamp, price, volume)` samples ending at the minute of `now`.
/// A negative `volatility` is taken by magnitude; a non-finite one walks flat.
pub fn random_walk<R: Rng + ?Sized>(
    rng: &mut R,
    pair: &MarketPair,
    start: Decimal,
    now: Timestamp,
    minutes: usize,
    volatility: f64,
    trade_notional: Decimal,
) -> Vec<(Timestamp, Decimal, Decimal)> {
    let bound = if volatility.is_finite() { volatility.abs() } else { 0.0 };
    let drift = Uniform::new_inclusive(-bound, bound);
    let volume_factor = Uniform::new(0.2, 1.0);
    let last_minute = CandleInterval::OneMinute.bucket(now);

    let mut price = round_dp(start.max(pair.tick_size), pair.price_precision).max(pair.tick_size);
    let mut samples = Vec::with_capacity(minutes);
    for i in 0..minutes {
        if i > 0 {
            let moved = price * (Decimal::ONE + to_decimal(drift.sample(rng)));
            price = round_dp(moved.max(pair.tick_size), pair.price_precision).max(pair.tick_size);
        }
        let volume = floor_dp(
            trade_notional / price * to_decimal(volume_factor.sample(rng)),
            pair.quantity_precision,
        )
        .max(pair.step_size);
        let back = (minutes - 1 - i) as i64;
        samples.push((last_minute.minus_millis(back * MINUTE_MS), price, volume));
    }
    samples
}

/// Ticker over the trailing day of `samples`.
fn ticker_from(pair: &MarketPair, samples: &[(Timestamp, Decimal, Decimal)], now: Timestamp, window: usize) -> MarketTicker {
    let day_start = samples.len().saturating_sub(DAY_MINUTES + 1);
    let day = &samples[day_start..];

    let (_, open, _) = day[0];
    let (_, last, _) = day[day.len() - 1];
    let previous_close = if day.len() > 1 { day[day.len() - 2].1 } else { last };

    let mut ticker = MarketTicker::new(&pair.symbol, last, now);
    ticker.open_price = open;
    ticker.previous_close = previous_close;
    ticker.high_price = day.iter().map(|s| s.1).max().unwrap_or(last);
    ticker.low_price = day.iter().map(|s| s.1).min().unwrap_or(last);
    ticker.volume = day.iter().map(|s| s.2).sum();
    ticker.quote_volume = round_dp(day.iter().map(|s| s.1 * s.2).sum(), FEE_DP);
    ticker.price_change_percent = MarketTicker::change_percent(open, last);
    ticker.sparkline = samples.iter().rev().take(window).rev().map(|s| s.1).collect();
    ticker
}

fn seed_market<R: Rng + ?Sized>(
    rng: &mut R,
    base_currency: &str,
    now: Timestamp,
    config: &SimulationConfig,
) -> MarketState {
    let mut market = MarketState::default();

    for (pair, reference) in catalog_pairs(base_currency) {
        let samples = random_walk(
            rng,
            &pair,
            reference,
            now,
            config.seed.history_minutes.max(1),
            config.seed.volatility,
            config.feed.trade_notional,
        );
        let ticker = ticker_from(&pair, &samples, now, config.feed.sparkline_window);

        let candles: CandleBook = CandleInterval::SUPPORTED
            .iter()
            .map(|&interval| (interval, aggregate(&samples, interval, config.feed.max_candles)))
            .collect();

        let book = build_order_book(&pair, ticker.last_price, &config.book, rng, now);

        market.price_map.insert(pair.base_asset.clone(), ticker.last_price);
        market.candles.insert(pair.symbol.clone(), candles);
        market.order_books.insert(pair.symbol.clone(), book);
        market.trades.insert(pair.symbol.clone(), VecDeque::new());
        market.tickers.insert(pair.symbol.clone(), ticker);
        market.pairs.push(pair);
    }

    market.last_updated = Some(now);
    market
}

fn seed_portfolio<R: Rng + ?Sized>(
    rng: &mut R,
    base_currency: &str,
    market: &MarketState,
    now: Timestamp,
    config: &SimulationConfig,
) -> PortfolioState {
    let mut portfolio = PortfolioState::new(base_currency);
    for (asset, amount) in ALLOCATION {
        portfolio.set_balance(asset, amount);
    }
    if portfolio.asset(base_currency).is_none() {
        portfolio.set_balance(base_currency, BASE_CURRENCY_FLOAT);
    }

    let total = portfolio.revalue(&market.price_map);
    portfolio.equity_history = equity_walk(rng, total, now, config.seed.equity_points);
    portfolio.updated_at = Some(now);
    portfolio
}

/// Hourly equity points ending at `now`, starting at 97% of `total` and
/// kept within half and one and a half times `total`.
fn equity_walk<R: Rng + ?Sized>(rng: &mut R, total: Decimal, now: Timestamp, points: usize) -> VecDeque<EquityPoint> {
    let step = Uniform::new_inclusive(-0.01, 0.0105);
    let floor = total * dec!(0.5);
    let ceiling = total * dec!(1.5);

    let mut value = total * dec!(0.97);
    let mut history = VecDeque::with_capacity(points);
    for i in 0..points {
        if i > 0 {
            value = (value * (Decimal::ONE + to_decimal(step.sample(rng)))).clamp(floor, ceiling);
        }
        let back = (points - 1 - i) as i64;
        history.push_back(EquityPoint {
            timestamp: now.minus_millis(back * HOUR_MS),
            value: round_dp(value, 2),
        });
    }
    history
}

/// Starting prices for every catalog asset, for callers that want to value
/// balances before a market exists.
pub fn reference_prices() -> HashMap<String, Decimal> {
    CATALOG
        .iter()
        .map(|e| (e.asset.to_string(), e.reference_price))
        .collect()
}
