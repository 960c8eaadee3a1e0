// 7.0 config.rs: all tunables in one place. fees, book shape, feed cadence, seed shape.
// 7.1 every group has a Default; Environment picks a preset.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Bps;

/** 7.2: flat fee applied to every fill */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    // fraction of notional, 0.001 = 0.1%
    pub fee_rate: Decimal,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self { fee_rate: dec!(0.001) }
    }
}

// Synthetic depth shape used by the seed and by every feed tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookConfig {
    // levels per side
    pub depth: usize,
    // distance between consecutive levels
    pub spread_bps: Bps,
    // quote notional a level is sized around
    pub level_notional: Decimal,
    // random band applied to the base level quantity
    pub quantity_band_low: f64,
    pub quantity_band_high: f64,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            depth: 18,
            spread_bps: Bps::new(5),
            level_notional: dec!(25000),
            quantity_band_low: 0.35,
            quantity_band_high: 1.65,
        }
    }
}

impl BookConfig {
    /// Positive, finite and strictly ordered. Rules out NaN bounds too.
    pub fn has_usable_band(&self) -> bool {
        let (low, high) = (self.quantity_band_low, self.quantity_band_high);
        low > 0.0 && low < high && high.is_finite()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth == 0 || self.spread_bps.value() == 0 {
            return Err(ConfigError::InvalidBook {
                reason: "book needs at least one level and a non-zero spread".to_string(),
            });
        }

        if !self.has_usable_band() {
            return Err(ConfigError::InvalidBook {
                reason: "quantity band must be positive, finite and strictly ordered".to_string(),
            });
        }

        if self.level_notional <= Decimal::ZERO {
            return Err(ConfigError::InvalidBook {
                reason: "level notional must be positive".to_string(),
            });
        }

        Ok(())
    }
}

// Feed cadence and retention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub base_interval_ms: u64,
    // the timer never fires faster than this, whatever the speed
    pub min_interval_ms: u64,
    // max absolute drift per tick at 1x
    pub volatility: f64,
    pub sparkline_window: usize,
    pub max_candles: usize,
    pub max_trades: usize,
    // quote notional around which each tick's volume and tape print are sized
    pub trade_notional: Decimal,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 1000,
            min_interval_ms: 250,
            volatility: 0.0025,
            sparkline_window: 60,
            max_candles: 240,
            max_trades: 50,
            trade_notional: dec!(1500),
        }
    }
}

// Initial market history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    // per-minute samples generated per pair, must cover at least one day
    pub history_minutes: usize,
    // max absolute drift per minute
    pub volatility: f64,
    // hourly points of synthetic equity history
    pub equity_points: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            history_minutes: 3 * 1440,
            volatility: 0.0015,
            equity_points: 168,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    pub equity_history_limit: usize,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            equity_history_limit: 720,
        }
    }
}

// The complete simulation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub fees: FeeConfig,
    pub book: BookConfig,
    pub feed: FeedConfig,
    pub seed: SeedConfig,
    pub portfolio: PortfolioConfig,
}

impl SimulationConfig {
    // Slow feed with a shallow book, handy for watching a single pair
    pub fn demo() -> Self {
        let mut config = Self::default();
        config.feed.base_interval_ms = 2000;
        config.book.depth = 10;
        config.seed.history_minutes = 2 * 1440;
        config
    }

    // Wide swings and a deep book to push the engine around
    pub fn stress() -> Self {
        let mut config = Self::default();
        config.feed.volatility = 0.02;
        config.seed.volatility = 0.01;
        config.book.depth = 40;
        config.book.spread_bps = Bps::new(15);
        config.feed.max_trades = 200;
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fees.fee_rate < Decimal::ZERO || self.fees.fee_rate >= dec!(0.05) {
            return Err(ConfigError::InvalidFees {
                reason: "fee rate must be within [0, 5%)".to_string(),
            });
        }

        self.book.validate()?;

        if self.feed.min_interval_ms == 0 || self.feed.base_interval_ms < self.feed.min_interval_ms {
            return Err(ConfigError::InvalidFeed {
                reason: "base interval must be at least the minimum interval".to_string(),
            });
        }

        if !(self.feed.volatility > 0.0 && self.feed.volatility < 0.5) {
            return Err(ConfigError::InvalidFeed {
                reason: "volatility must be within (0, 0.5)".to_string(),
            });
        }

        if self.feed.max_candles == 0 || self.feed.max_trades == 0 || self.feed.sparkline_window == 0 {
            return Err(ConfigError::InvalidFeed {
                reason: "retention windows must be non-zero".to_string(),
            });
        }

        if self.feed.trade_notional <= Decimal::ZERO {
            return Err(ConfigError::InvalidFeed {
                reason: "trade notional must be positive".to_string(),
            });
        }

        if !(self.seed.volatility > 0.0 && self.seed.volatility < 0.5) {
            return Err(ConfigError::InvalidSeed {
                reason: "volatility must be within (0, 0.5)".to_string(),
            });
        }

        if self.seed.history_minutes < 1440 {
            return Err(ConfigError::InvalidSeed {
                reason: "seed history must cover at least one day".to_string(),
            });
        }

        if self.portfolio.equity_history_limit == 0 {
            return Err(ConfigError::InvalidPortfolio {
                reason: "equity history limit must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid fees: {reason}")]
    InvalidFees { reason: String },

    #[error("Invalid book: {reason}")]
    InvalidBook { reason: String },

    #[error("Invalid feed: {reason}")]
    InvalidFeed { reason: String },

    #[error("Invalid seed: {reason}")]
    InvalidSeed { reason: String },

    #[error("Invalid portfolio: {reason}")]
    InvalidPortfolio { reason: String },

    #[error("Invalid slippage: {reason}")]
    InvalidSlippage { reason: String },

    #[error("Unsupported simulation speed {0}x, expected 1, 5 or 20")]
    UnsupportedSpeed(u32),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Demo,
    Stress,
}

impl Environment {
    pub fn config(&self) -> SimulationConfig {
        match self {
            Environment::Development => SimulationConfig::default(),
            Environment::Demo => SimulationConfig::demo(),
            Environment::Stress => SimulationConfig::stress(),
        }
    }
}
