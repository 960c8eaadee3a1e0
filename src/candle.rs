//! OHLCV candles and time bucketing.
//!
//! A candle covers `[open_time, open_time + interval)`. The feed either
//! extends the newest candle in place or opens a new one when the tick lands
//! in a later bucket.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::precision::{round_dp, FEE_DP};
use crate::types::Timestamp;

/// Supported candle widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CandleInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
}

impl CandleInterval {
    pub const SUPPORTED: [CandleInterval; 4] = [
        CandleInterval::OneMinute,
        CandleInterval::FiveMinutes,
        CandleInterval::OneHour,
        CandleInterval::OneDay,
    ];

    /// Number of one-minute samples that make up one candle.
    pub fn minutes(&self) -> usize {
        match self {
            CandleInterval::OneMinute => 1,
            CandleInterval::FiveMinutes => 5,
            CandleInterval::OneHour => 60,
            CandleInterval::OneDay => 1440,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.minutes() as i64 * 60_000
    }

    /// `floor(time / duration) * duration`
    pub fn bucket(&self, ts: Timestamp) -> Timestamp {
        let width = self.duration_ms();
        Timestamp::from_millis(ts.as_millis().div_euclid(width) * width)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CandleInterval::OneMinute => "1m",
            CandleInterval::FiveMinutes => "5m",
            CandleInterval::OneHour => "1h",
            CandleInterval::OneDay => "1d",
        }
    }
}

/// A single OHLCV bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: Timestamp,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    #[serde(default)]
    pub quote_volume: Decimal,
}

impl Candle {
    /// Opening candle of a fresh bucket: open = high = low = close.
    pub fn flat(open_time: Timestamp, price: Decimal) -> Self {
        Self {
            open_time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: Decimal::ZERO,
            quote_volume: Decimal::ZERO,
        }
    }

    /// Fold a new price into the candle. Negative volume deltas are ignored so
    /// volume never decreases within a bucket.
    pub fn apply(&mut self, price: Decimal, volume_delta: Decimal) {
        self.close = price;
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        if volume_delta > Decimal::ZERO {
            self.volume += volume_delta;
            self.quote_volume += round_dp(price * volume_delta, FEE_DP);
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.high >= self.open.max(self.close) && self.low <= self.open.min(self.close)
    }
}

/// What happened to a series when a price was folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleUpdate {
    Extended,
    Appended,
}

/// Fold a tick into a capped candle series. Returns a copy of the touched candle.
pub fn apply_price(
    series: &mut VecDeque<Candle>,
    interval: CandleInterval,
    ts: Timestamp,
    price: Decimal,
    volume_delta: Decimal,
    cap: usize,
) -> (CandleUpdate, Candle) {
    let bucket = interval.bucket(ts);

    if let Some(last) = series.back_mut() {
        if last.open_time == bucket {
            last.apply(price, volume_delta);
            return (CandleUpdate::Extended, last.clone());
        }
    }

    let mut candle = Candle::flat(bucket, price);
    candle.apply(price, volume_delta);
    series.push_back(candle.clone());
    while series.len() > cap {
        series.pop_front();
    }
    (CandleUpdate::Appended, candle)
}

/// Aggregate over a trailing run of candles.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSummary {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: Decimal,
    pub quote_volume: Decimal,
}

/// Summarize the candles of a chronological `series` that open at or after
/// `since`. `None` when no candle qualifies.
pub fn summarize_since(series: &VecDeque<Candle>, since: Timestamp) -> Option<WindowSummary> {
    let mut window = series.iter().skip_while(|c| c.open_time < since);
    let first = window.next()?;
    let mut summary = WindowSummary {
        open: first.open,
        high: first.high,
        low: first.low,
        volume: first.volume,
        quote_volume: first.quote_volume,
    };
    for candle in window {
        summary.high = summary.high.max(candle.high);
        summary.low = summary.low.min(candle.low);
        summary.volume += candle.volume;
        summary.quote_volume += candle.quote_volume;
    }
    Some(summary)
}

/// Bucket per-minute `(timestamp, price, volume)` samples into candles, keeping
/// at most `cap` of the newest.
pub fn aggregate(
    samples: &[(Timestamp, Decimal, Decimal)],
    interval: CandleInterval,
    cap: usize,
) -> VecDeque<Candle> {
    let mut series = VecDeque::new();
    for (ts, price, volume) in samples {
        apply_price(&mut series, interval, *ts, *price, *volume, cap);
    }
    series
}
