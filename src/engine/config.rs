//! Engine configuration options.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::{ConfigError, SimulationConfig};

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Flat fee charged on every fill, as a fraction of notional.
    pub fee_rate: Decimal,
    /// Maximum number of equity points kept on a portfolio.
    pub equity_history_limit: usize,
    /// Quick trades draw slippage uniformly from this range.
    pub slippage_min: f64,
    pub slippage_max: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee_rate: dec!(0.001),
            equity_history_limit: 720,
            slippage_min: 0.0002,
            slippage_max: 0.0015,
        }
    }
}

impl From<&SimulationConfig> for EngineConfig {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            fee_rate: config.fees.fee_rate,
            equity_history_limit: config.portfolio.equity_history_limit,
            ..Self::default()
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= dec!(0.05) {
            return Err(ConfigError::InvalidFees {
                reason: "fee rate must be within [0, 5%)".to_string(),
            });
        }

        let (low, high) = (self.slippage_min, self.slippage_max);
        if !(low >= 0.0 && low <= high && high < 1.0) {
            return Err(ConfigError::InvalidSlippage {
                reason: format!("slippage range [{}, {}] must lie within [0, 1) and be ordered", low, high),
            });
        }

        if self.equity_history_limit == 0 {
            return Err(ConfigError::InvalidPortfolio {
                reason: "equity history limit must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
        assert!(EngineConfig::from(&SimulationConfig::stress()).validate().is_ok());
    }

    #[test]
    fn inverted_slippage_is_rejected() {
        let config = EngineConfig {
            slippage_min: 0.002,
            slippage_max: 0.001,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSlippage { .. })));

        let nan = EngineConfig {
            slippage_max: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(matches!(nan.validate(), Err(ConfigError::InvalidSlippage { .. })));
    }

    #[test]
    fn zero_width_slippage_is_allowed() {
        let config = EngineConfig {
            slippage_min: 0.001,
            slippage_max: 0.001,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
