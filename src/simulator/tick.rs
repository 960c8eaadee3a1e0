// 11.2: one feed step. per pair, in catalog order:
// price drift -> ticker -> candles -> depth -> one tape print -> price map.
// ticker day statistics roll over the trailing 24 hourly candles.

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use rust_decimal::Decimal;

use super::core::MarketSimulator;
use crate::candle::{apply_price, summarize_since, CandleInterval};
use crate::events::{CandleEvent, SimulatorEvent};
use crate::market::MarketPair;
use crate::order::{Liquidity, TradeFill};
use crate::order_book::build_order_book;
use crate::precision::{fee, floor_dp, round_dp, to_decimal};
use crate::types::{Side, Timestamp, TradeId};

// hourly candles folded into the ticker's day statistics
const ROLLING_HOURS: i64 = 24;

impl<R: Rng> MarketSimulator<R> {
    /// Advance every pair by one step stamped `now`. Returns the number of
    /// events published.
    pub fn tick(&mut self, now: Timestamp) -> usize {
        let pairs = self.state.pairs.clone();
        let mut published = 0;
        for pair in &pairs {
            published += self.step_pair(pair, now);
        }
        self.state.last_updated = Some(now);
        log::debug!("tick at {} published {} events", now.as_millis(), published);
        published
    }

    fn step_pair(&mut self, pair: &MarketPair, now: Timestamp) -> usize {
        let Some(last) = self.state.ticker(&pair.symbol).map(|t| t.last_price) else {
            log::warn!("no ticker for {}, skipping", pair.symbol);
            return 0;
        };
        let mut published = 0;

        let price = self.drift(pair, last);
        let volume_delta = self.volume_delta(pair, price);

        // candles first, the rolling day is read back from the hourly series
        let max_candles = self.config.feed.max_candles;
        let book = self.state.candles.entry(pair.symbol.clone()).or_default();
        let mut touched = Vec::with_capacity(CandleInterval::SUPPORTED.len());
        for interval in CandleInterval::SUPPORTED {
            let series = book.entry(interval).or_default();
            let (_, candle) = apply_price(series, interval, now, price, volume_delta, max_candles);
            touched.push(CandleEvent {
                symbol: pair.symbol.clone(),
                interval,
                candle,
            });
        }
        let window_start = CandleInterval::OneHour
            .bucket(now)
            .minus_millis((ROLLING_HOURS - 1) * CandleInterval::OneHour.duration_ms());
        let day = book
            .get(&CandleInterval::OneHour)
            .and_then(|series| summarize_since(series, window_start));

        // ticker
        let sparkline_window = self.config.feed.sparkline_window;
        let ticker = match self.state.tickers.get_mut(&pair.symbol) {
            Some(ticker) => ticker,
            None => return 0,
        };
        ticker.previous_close = ticker.last_price;
        ticker.last_price = price;
        if let Some(day) = &day {
            ticker.roll_window(day);
        }
        ticker.timestamp = now;
        ticker.push_sparkline(price, sparkline_window);
        let ticker = ticker.clone();
        published += self.bus.emit(&SimulatorEvent::Ticker(ticker));

        for event in touched {
            published += self.bus.emit(&SimulatorEvent::Candle(event));
        }

        // depth
        let depth = build_order_book(pair, price, &self.config.book, &mut self.rng, now);
        self.state.order_books.insert(pair.symbol.clone(), depth.clone());
        published += self.bus.emit(&SimulatorEvent::Depth(depth));

        // tape, side deliberately independent of the drift direction
        let side = if self.rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let liquidity = if self.rng.gen_bool(0.5) {
            Liquidity::Maker
        } else {
            Liquidity::Taker
        };
        let fill = TradeFill {
            id: TradeId(self.next_trade_id),
            order_id: None,
            symbol: pair.symbol.clone(),
            side,
            price,
            quantity: volume_delta,
            fee: fee(price * volume_delta, self.config.fees.fee_rate),
            liquidity,
            timestamp: now,
        };
        self.next_trade_id += 1;
        self.state.record_trade(fill.clone(), self.config.feed.max_trades);
        published += self.bus.emit(&SimulatorEvent::Trade(fill));

        self.state.price_map.insert(pair.base_asset.clone(), price);
        published
    }

    /// Multiplicative random walk step, bounded by volatility times speed.
    fn drift(&mut self, pair: &MarketPair, last: Decimal) -> Decimal {
        let bound = self.config.feed.volatility * f64::from(self.speed.multiplier());
        let change = Uniform::new_inclusive(-bound, bound).sample(&mut self.rng);
        let moved = last * (Decimal::ONE + to_decimal(change));
        round_dp(moved.max(pair.tick_size), pair.price_precision).max(pair.tick_size)
    }

    fn volume_delta(&mut self, pair: &MarketPair, price: Decimal) -> Decimal {
        let factor = to_decimal(self.rng.gen_range(0.2..1.0));
        let raw = self.config.feed.trade_notional / price * factor;
        floor_dp(raw, pair.quantity_precision).max(pair.step_size)
    }
}
