//! Asset balances and valuation.
//!
//! Balances are only changed by the matching engine or by explicit
//! balance-set actions. Debits clamp at zero rather than going negative.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::market::MarketState;
use crate::types::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAsset {
    pub symbol: String,
    pub free: Decimal,
    pub locked: Decimal,
}

impl PortfolioAsset {
    pub fn new(symbol: &str, free: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            free,
            locked: Decimal::ZERO,
        }
    }

    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: Timestamp,
    pub value: Decimal,
}

/// 24h change attributed to one holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPnl {
    pub symbol: String,
    pub absolute: Decimal,
    pub percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub assets: BTreeMap<String, PortfolioAsset>,
    /// Derived. Recomputed after every settlement.
    pub total_value: Decimal,
    pub base_currency: String,
    /// Oldest first
    pub equity_history: VecDeque<EquityPoint>,
    pub updated_at: Option<Timestamp>,
}

impl PortfolioState {
    pub fn new(base_currency: &str) -> Self {
        Self {
            assets: BTreeMap::new(),
            total_value: Decimal::ZERO,
            base_currency: base_currency.to_string(),
            equity_history: VecDeque::new(),
            updated_at: None,
        }
    }

    pub fn asset(&self, symbol: &str) -> Option<&PortfolioAsset> {
        self.assets.get(symbol)
    }

    pub fn free(&self, symbol: &str) -> Decimal {
        self.assets.get(symbol).map(|a| a.free).unwrap_or(Decimal::ZERO)
    }

    pub fn locked(&self, symbol: &str) -> Decimal {
        self.assets.get(symbol).map(|a| a.locked).unwrap_or(Decimal::ZERO)
    }

    /// Explicit balance override. Negative input is floored at zero.
    pub fn set_balance(&mut self, symbol: &str, free: Decimal) {
        let asset = self
            .assets
            .entry(symbol.to_string())
            .or_insert_with(|| PortfolioAsset::new(symbol, Decimal::ZERO));
        asset.free = free.max(Decimal::ZERO);
    }

    pub fn credit(&mut self, symbol: &str, amount: Decimal) {
        let asset = self
            .assets
            .entry(symbol.to_string())
            .or_insert_with(|| PortfolioAsset::new(symbol, Decimal::ZERO));
        asset.free = (asset.free + amount).max(Decimal::ZERO);
    }

    /// Subtract from free balance, clamping at zero.
    pub fn debit(&mut self, symbol: &str, amount: Decimal) {
        self.credit(symbol, -amount);
    }

    /// Σ (free + locked) * price. The base currency falls back to 1 when
    /// missing from the map; any other unpriced asset counts as zero.
    pub fn valuation(&self, price_map: &HashMap<String, Decimal>) -> Decimal {
        self.assets
            .values()
            .map(|asset| {
                let price = match price_map.get(&asset.symbol) {
                    Some(p) => *p,
                    None if asset.symbol == self.base_currency => Decimal::ONE,
                    None => Decimal::ZERO,
                };
                asset.total() * price
            })
            .sum()
    }

    pub fn revalue(&mut self, price_map: &HashMap<String, Decimal>) -> Decimal {
        self.total_value = self.valuation(price_map);
        self.total_value
    }

    /// Append a point and evict the oldest beyond `limit`.
    pub fn push_equity(&mut self, point: EquityPoint, limit: usize) {
        self.equity_history.push_back(point);
        while self.equity_history.len() > limit {
            self.equity_history.pop_front();
        }
    }

    pub fn has_negative_balance(&self) -> bool {
        self.assets
            .values()
            .any(|a| a.free < Decimal::ZERO || a.locked < Decimal::ZERO)
    }

    /// 24h change for every holding quoted against the base currency.
    pub fn pnl_24h(&self, market: &MarketState) -> Vec<PositionPnl> {
        self.assets
            .values()
            .filter_map(|asset| {
                let pair = market
                    .pairs
                    .iter()
                    .find(|p| p.base_asset == asset.symbol && p.quote_asset == self.base_currency)?;
                let ticker = market.ticker(&pair.symbol)?;
                let value = asset.total() * ticker.last_price;
                let before = value / (Decimal::ONE + ticker.change_fraction());
                Some(PositionPnl {
                    symbol: asset.symbol.clone(),
                    absolute: (value - before).round_dp(2),
                    percent: ticker.price_change_percent,
                })
            })
            .collect()
    }
}
