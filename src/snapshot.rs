// 13.0: whole-simulation snapshot for persistence between sessions.
// a missing or unreadable blob never fails a restore, it reseeds instead.

use serde::{Deserialize, Serialize};

use crate::earn::EarnPosition;
use crate::market::MarketState;
use crate::orders::OrdersState;
use crate::portfolio::PortfolioState;
use crate::seed::create_seed;
use crate::types::SimulationSpeed;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub base_currency: String,
    pub simulation_speed: SimulationSpeed,
}

impl SimulationSettings {
    pub fn new(base_currency: &str) -> Self {
        Self {
            base_currency: base_currency.to_string(),
            simulation_speed: SimulationSpeed::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub market: MarketState,
    pub portfolio: PortfolioState,
    pub orders: OrdersState,
    pub settings: SimulationSettings,
    #[serde(default)]
    pub earn_positions: Vec<EarnPosition>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot is for base currency {found}, expected {expected}")]
    BaseCurrencyMismatch { expected: String, found: String },
}

impl SimulationSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode `blob` if present and valid for `base_currency`, otherwise seed fresh.
    pub fn restore_or_seed(blob: Option<&str>, base_currency: &str) -> Self {
        let Some(json) = blob else {
            log::info!("no saved snapshot, seeding");
            return create_seed(base_currency, None);
        };

        let restored = Self::from_json(json).and_then(|snapshot| {
            if snapshot.settings.base_currency == base_currency {
                Ok(snapshot)
            } else {
                Err(SnapshotError::BaseCurrencyMismatch {
                    expected: base_currency.to_string(),
                    found: snapshot.settings.base_currency,
                })
            }
        });

        match restored {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log::warn!("discarding saved snapshot: {}", err);
                create_seed(base_currency, None)
            }
        }
    }
}
