// 8.0: matching engine. turns order drafts into fills against the synthetic
// book or the last price, and settles them into a copy of the portfolio.
// pure given its inputs; the only randomness is quick-trade slippage.

mod book_match;
mod config;
mod context;
mod core;
mod quick_trade;
mod results;
mod settlement;
mod shared;
mod strategy;

pub use book_match::BookMatcher;
pub use config::EngineConfig;
pub use context::MatchContext;
pub use core::MatchingEngine;
pub use quick_trade::QuickTrade;
pub use results::{EngineError, ExecutionReport};
pub use settlement::{IdSequence, Settlement};
pub use shared::SharedPortfolio;
pub use strategy::{ExecutionMode, ExecutionStrategy};
