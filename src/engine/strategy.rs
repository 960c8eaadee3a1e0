//! The order execution capability and its two price-discovery modes.

use super::context::MatchContext;
use super::results::{EngineError, ExecutionReport};
use crate::order::OrderDraft;

/// Turns a draft plus a market context into an order, its fills and an
/// updated portfolio copy. Implementations never mutate the context.
pub trait ExecutionStrategy {
    fn name(&self) -> &'static str;

    fn execute(&mut self, draft: &OrderDraft, ctx: &MatchContext<'_>) -> Result<ExecutionReport, EngineError>;
}

/// Which order-entry path to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Walk the synthetic book level by level.
    BookMatch,
    /// Single execution at last price plus random slippage.
    QuickTrade,
}
