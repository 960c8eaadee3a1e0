// 11.1: simulator state machine. stopped <-> running, idempotent both ways.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ConfigError, SimulationConfig};
use crate::events::{EventBus, EventKind, SimulatorEvent, SimulatorStatus, StatusEvent, Subscription};
use crate::market::MarketState;
use crate::types::SimulationSpeed;

#[derive(Debug)]
pub struct MarketSimulator<R: Rng = StdRng> {
    pub(super) state: MarketState,
    pub(super) config: SimulationConfig,
    pub(super) speed: SimulationSpeed,
    pub(super) status: SimulatorStatus,
    pub(super) bus: EventBus,
    pub(super) rng: R,
    pub(super) next_trade_id: u64,
}

impl MarketSimulator<StdRng> {
    pub fn new(state: MarketState, config: SimulationConfig) -> Result<Self, ConfigError> {
        Self::with_rng(state, config, StdRng::from_entropy())
    }
}

impl<R: Rng> MarketSimulator<R> {
    /// Fails if `config` does not pass [`SimulationConfig::validate`].
    pub fn with_rng(state: MarketState, config: SimulationConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;

        // tape ids continue after whatever the seed already printed
        let next_trade_id = state
            .trades
            .values()
            .flatten()
            .map(|fill| fill.id.0)
            .max()
            .unwrap_or(0)
            + 1;

        Ok(Self {
            state,
            config,
            speed: SimulationSpeed::default(),
            status: SimulatorStatus::Stopped,
            bus: EventBus::new(),
            rng,
            next_trade_id,
        })
    }

    pub fn state(&self) -> &MarketState {
        &self.state
    }

    pub fn into_state(self) -> MarketState {
        self.state
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn status(&self) -> SimulatorStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == SimulatorStatus::Running
    }

    pub fn speed(&self) -> SimulationSpeed {
        self.speed
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&SimulatorEvent) + 'static,
    {
        self.bus.on(kind, listener)
    }

    pub fn once<F>(&self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&SimulatorEvent) + 'static,
    {
        self.bus.once(kind, listener)
    }

    /// Returns false if already running.
    pub fn start(&mut self) -> bool {
        self.transition(SimulatorStatus::Running)
    }

    /// Returns false if already stopped.
    pub fn stop(&mut self) -> bool {
        self.transition(SimulatorStatus::Stopped)
    }

    fn transition(&mut self, next: SimulatorStatus) -> bool {
        if self.status == next {
            return false;
        }
        self.status = next;
        log::info!("simulator {:?} at {}", next, self.speed);
        self.publish_status();
        true
    }

    /// Takes effect from the next scheduled tick.
    pub fn set_simulation_speed(&mut self, speed: SimulationSpeed) {
        if self.speed == speed {
            return;
        }
        log::info!("simulation speed {} -> {}", self.speed, speed);
        self.speed = speed;
        self.publish_status();
    }

    /// `max(min_interval, base_interval / speed)`
    pub fn tick_interval(&self) -> Duration {
        let feed = &self.config.feed;
        let scaled = feed.base_interval_ms / u64::from(self.speed.multiplier());
        Duration::from_millis(scaled.max(feed.min_interval_ms))
    }

    fn publish_status(&self) {
        self.bus.emit(&SimulatorEvent::Status(StatusEvent {
            status: self.status,
            speed: self.speed,
        }));
    }
}
