// 1.0: primitives shared by the feed, the seed generator and the matching engine.
// ids, sides, timestamps, basis points, simulation speed. newtypes so the compiler catches mixups.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ord-{}", self.0)
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trd-{}", self.0)
    }
}

// Buy = spend quote, receive base. Sell = spend base, receive quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Buy => dec!(1),
            Side::Sell => dec!(-1),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

// 1.1: basis points. 100 bps = 1%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bps(pub u32);

impl Bps {
    pub fn new(bps: u32) -> Self {
        Self(bps)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(self.0 as i64, 4)
    }
}

// 1.2: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn plus_millis(&self, ms: i64) -> Self {
        Self(self.0 + ms)
    }

    pub fn minus_millis(&self, ms: i64) -> Self {
        Self(self.0 - ms)
    }

    pub fn elapsed_days(&self, later: &Timestamp) -> Decimal {
        let diff_ms = (later.0 - self.0).max(0);
        Decimal::new(diff_ms, 0) / dec!(86_400_000)
    }
}

// 1.3: feed speed multiplier. only 1x, 5x and 20x are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SimulationSpeed {
    Normal,
    Fast,
    Turbo,
}

impl SimulationSpeed {
    pub fn multiplier(&self) -> u32 {
        match self {
            SimulationSpeed::Normal => 1,
            SimulationSpeed::Fast => 5,
            SimulationSpeed::Turbo => 20,
        }
    }

    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.multiplier())
    }
}

impl Default for SimulationSpeed {
    fn default() -> Self {
        Self::Normal
    }
}

impl TryFrom<u32> for SimulationSpeed {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SimulationSpeed::Normal),
            5 => Ok(SimulationSpeed::Fast),
            20 => Ok(SimulationSpeed::Turbo),
            other => Err(ConfigError::UnsupportedSpeed(other)),
        }
    }
}

impl From<SimulationSpeed> for u32 {
    fn from(speed: SimulationSpeed) -> Self {
        speed.multiplier()
    }
}

impl fmt::Display for SimulationSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}
