// 11.0: market simulator. mutates the seeded market on a timer and publishes
// every change through the event bus. no network, no failure modes.

mod core;
pub mod driver;
mod tick;

pub use core::MarketSimulator;
pub use driver::{SimulatorCommand, SimulatorError, SimulatorHandle};
