// 12.0: earn products and simple-interest yield accrual.
// accrual runs on simulated time: elapsed wall days are scaled by the feed speed.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::precision::{round_dp, FEE_DP};
use crate::types::Timestamp;

const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnProduct {
    pub id: String,
    pub asset: String,
    pub chain: String,
    /// Annual rate as a fraction, 0.045 = 4.5%
    pub apy: Decimal,
    /// Zero means flexible
    pub lock_period_days: u32,
}

impl EarnProduct {
    pub fn new(id: &str, asset: &str, chain: &str, apy: Decimal, lock_period_days: u32) -> Self {
        Self {
            id: id.to_string(),
            asset: asset.to_string(),
            chain: chain.to_string(),
            apy,
            lock_period_days,
        }
    }

    pub fn is_flexible(&self) -> bool {
        self.lock_period_days == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnPosition {
    pub product_id: String,
    pub amount: Decimal,
    pub start: Timestamp,
    pub accrued_reward: Decimal,
}

impl EarnPosition {
    pub fn open(product: &EarnProduct, amount: Decimal, start: Timestamp) -> Self {
        Self {
            product_id: product.id.clone(),
            amount,
            start,
            accrued_reward: Decimal::ZERO,
        }
    }

    pub fn unlocks_at(&self, product: &EarnProduct) -> Timestamp {
        self.start.plus_millis(i64::from(product.lock_period_days) * DAY_MS)
    }

    pub fn is_locked(&self, product: &EarnProduct, now: Timestamp) -> bool {
        now < self.unlocks_at(product)
    }
}

/// Recompute the accrued reward of every position as of `now`.
///
/// `reward = amount * apy * (elapsed_days * speed_multiplier / 365)`, rounded
/// to fee precision. Positions whose product is unknown are returned as-is.
pub fn accrue_yield(
    positions: &[EarnPosition],
    products: &[EarnProduct],
    now: Timestamp,
    speed_multiplier: Decimal,
) -> Vec<EarnPosition> {
    positions
        .iter()
        .map(|position| {
            let Some(product) = products.iter().find(|p| p.id == position.product_id) else {
                return position.clone();
            };
            let elapsed = position.start.elapsed_days(&now) * speed_multiplier;
            let reward = position.amount * product.apy * (elapsed / dec!(365));
            EarnPosition {
                accrued_reward: round_dp(reward, FEE_DP),
                ..position.clone()
            }
        })
        .collect()
}

pub fn seed_earn_products() -> Vec<EarnProduct> {
    vec![
        EarnProduct::new("earn-btc-flex", "BTC", "Bitcoin", dec!(0.045), 0),
        EarnProduct::new("earn-cro-180", "CRO", "Cronos", dec!(0.085), 180),
        EarnProduct::new("earn-usdc-90", "USDC", "Ethereum", dec!(0.065), 90),
        EarnProduct::new("earn-sol-30", "SOL", "Solana", dec!(0.1), 30),
    ]
}
