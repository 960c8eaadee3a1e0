// 11.3: timer loop around a simulator. one logical thread: commands and ticks
// are handled in turn by a single future, so ticks never overlap.
//
// The simulator holds its listeners in an Rc, so the future is !Send. Drive it
// with `block_on`, a current-thread runtime or a LocalSet.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{sleep, Instant};

use rand::Rng;

use super::core::MarketSimulator;
use crate::types::{SimulationSpeed, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorCommand {
    Start,
    Stop,
    SetSpeed(SimulationSpeed),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulatorError {
    #[error("Simulator driver is no longer running")]
    DriverClosed,
}

/// Sending half of the command channel. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct SimulatorHandle {
    sender: UnboundedSender<SimulatorCommand>,
}

impl SimulatorHandle {
    pub fn send(&self, command: SimulatorCommand) -> Result<(), SimulatorError> {
        self.sender.send(command).map_err(|_| SimulatorError::DriverClosed)
    }

    pub fn start(&self) -> Result<(), SimulatorError> {
        self.send(SimulatorCommand::Start)
    }

    pub fn stop(&self) -> Result<(), SimulatorError> {
        self.send(SimulatorCommand::Stop)
    }

    pub fn set_speed(&self, speed: SimulationSpeed) -> Result<(), SimulatorError> {
        self.send(SimulatorCommand::SetSpeed(speed))
    }

    pub fn shutdown(&self) -> Result<(), SimulatorError> {
        self.send(SimulatorCommand::Shutdown)
    }
}

pub fn channel() -> (SimulatorHandle, UnboundedReceiver<SimulatorCommand>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (SimulatorHandle { sender }, receiver)
}

/// What a command did to the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Unchanged,
    Changed,
    Shutdown,
}

fn apply<R: Rng>(sim: &mut MarketSimulator<R>, command: SimulatorCommand) -> Applied {
    let changed = match command {
        SimulatorCommand::Start => sim.start(),
        SimulatorCommand::Stop => sim.stop(),
        SimulatorCommand::SetSpeed(speed) => {
            let before = sim.speed();
            sim.set_simulation_speed(speed);
            sim.speed() != before
        }
        SimulatorCommand::Shutdown => return Applied::Shutdown,
    };
    if changed {
        Applied::Changed
    } else {
        Applied::Unchanged
    }
}

/// Run until `Shutdown` arrives or every handle is dropped. Ticks are
/// stamped with wall time at entry plus elapsed runtime time. A command that
/// changes the status or speed rebuilds the timer, so speed changes apply to
/// the next tick; no-op commands leave the pending tick alone. Returns the
/// number of ticks performed.
pub async fn run<R: Rng>(sim: &mut MarketSimulator<R>, mut commands: UnboundedReceiver<SimulatorCommand>) -> usize {
    let origin = Timestamp::now();
    let started = Instant::now();
    let mut ticks = 0;
    log::info!("simulator driver started");

    let timer = sleep(sim.tick_interval());
    tokio::pin!(timer);

    loop {
        let command = if sim.is_running() {
            tokio::select! {
                _ = &mut timer => {
                    let elapsed = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
                    sim.tick(origin.plus_millis(elapsed));
                    ticks += 1;
                    timer.as_mut().reset(Instant::now() + sim.tick_interval());
                    continue;
                }
                command = commands.recv() => command,
            }
        } else {
            commands.recv().await
        };

        let Some(command) = command else {
            break;
        };
        match apply(sim, command) {
            Applied::Shutdown => break,
            Applied::Changed => timer.as_mut().reset(Instant::now() + sim.tick_interval()),
            Applied::Unchanged => {}
        }
    }

    sim.stop();
    log::info!("simulator driver stopped after {} ticks", ticks);
    ticks
}
