// spot-sim-core: spot crypto trading simulation.
// a synthetic market feed and a local matching engine over an in-memory
// portfolio. no network, no real funds. everything is priced in Decimal.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: OrderId, Side, Timestamp, Bps, SimulationSpeed
//   1.4  precision.rs: rounding helpers shared by feed, seed and engine
//   2.x  order.rs: order drafts, lifecycle, trade fills
//   3.x  order_book.rs: synthetic depth snapshots
//   4.x  candle.rs: OHLCV candles and interval bucketing
//   5.x  portfolio.rs: balances, valuation, equity history
//   5.1  orders.rs: open orders, order and trade history
//   6.x  market.rs: pairs, tickers, market state
//   7.x  config.rs: fees, book shape, feed cadence, env presets
//   8.x  engine/: matching engine: book match, quick trade, settlement
//   9.x  seed.rs: initial market and portfolio
//   10.x events.rs: simulator events and the observer registry
//   11.x simulator/: market simulator and its tokio driver
//   12.x earn.rs: earn products and yield accrual
//   13.x snapshot.rs: persistence snapshot

// domain model
pub mod candle;
pub mod market;
pub mod order;
pub mod order_book;
pub mod orders;
pub mod portfolio;
pub mod precision;
pub mod types;

// market data and execution
pub mod engine;
pub mod events;
pub mod seed;
pub mod simulator;

// integration modules
pub mod config;
pub mod earn;
pub mod snapshot;

// re exports for convenience
pub use candle::*;
pub use engine::*;
pub use events::*;
pub use market::*;
pub use order::*;
pub use order_book::*;
pub use orders::*;
pub use portfolio::*;
pub use types::*;
pub use config::{BookConfig, ConfigError, Environment, FeeConfig, FeedConfig, SimulationConfig};
pub use earn::{accrue_yield, seed_earn_products, EarnPosition, EarnProduct};
pub use seed::{create_seed, create_seed_with};
pub use simulator::{MarketSimulator, SimulatorCommand, SimulatorError, SimulatorHandle};
pub use snapshot::{SimulationSettings, SimulationSnapshot, SnapshotError};
