// 8.0.2: result types and errors for order execution.

use rust_decimal::Decimal;

use crate::order::{Order, TradeFill};
use crate::portfolio::PortfolioState;

/// Outcome of one execution. A rejected order is a normal report with
/// `order.status == Rejected`, never an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub order: Order,
    pub fills: Vec<TradeFill>,
    pub remaining_quantity: Decimal,
    /// Fresh copy. The caller's portfolio is never touched.
    pub updated_portfolio: PortfolioState,
    /// Only set by quick trades
    pub slippage: Option<Decimal>,
}

impl ExecutionReport {
    pub fn filled_quantity(&self) -> Decimal {
        self.order.filled_quantity
    }

    pub fn notional(&self) -> Decimal {
        self.fills.iter().map(|f| f.notional()).sum()
    }

    pub fn fees(&self) -> Decimal {
        self.fills.iter().map(|f| f.fee).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Symbol {0} not found")]
    UnknownSymbol(String),

    #[error("No {what} available for {symbol}")]
    MissingMarketData { symbol: String, what: &'static str },

    #[error("Draft is for {draft} but context is for {context}")]
    SymbolMismatch { draft: String, context: String },

    #[error("Limit order for {0} has no price")]
    MissingLimitPrice(String),

    #[error("Cannot swap {from} into {to} through {symbol}")]
    UnsupportedSwap { from: String, to: String, symbol: String },
}
