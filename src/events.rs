// 10.0: simulator events and the observer registry they are delivered through.
// delivery is synchronous and single threaded. listeners may subscribe or
// unsubscribe from inside a callback.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::candle::{Candle, CandleInterval};
use crate::market::MarketTicker;
use crate::order::TradeFill;
use crate::order_book::OrderBookSnapshot;
use crate::types::SimulationSpeed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Ticker,
    Candle,
    Depth,
    Trade,
    Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleEvent {
    pub symbol: String,
    pub interval: CandleInterval,
    pub candle: Candle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulatorStatus {
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: SimulatorStatus,
    pub speed: SimulationSpeed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulatorEvent {
    Ticker(MarketTicker),
    Candle(CandleEvent),
    Depth(OrderBookSnapshot),
    Trade(TradeFill),
    Status(StatusEvent),
}

impl SimulatorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SimulatorEvent::Ticker(_) => EventKind::Ticker,
            SimulatorEvent::Candle(_) => EventKind::Candle,
            SimulatorEvent::Depth(_) => EventKind::Depth,
            SimulatorEvent::Trade(_) => EventKind::Trade,
            SimulatorEvent::Status(_) => EventKind::Status,
        }
    }
}

type Listener = Rc<dyn Fn(&SimulatorEvent)>;

struct Entry {
    id: u64,
    kind: EventKind,
    once: bool,
    listener: Listener,
}

#[derive(Default)]
struct Registry {
    entries: Vec<Entry>,
    next_id: u64,
}

impl Registry {
    fn insert(&mut self, kind: EventKind, once: bool, listener: Listener) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.push(Entry {
            id,
            kind,
            once,
            listener,
        });
        id
    }

    fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    fn contains(&self, id: u64) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }
}

/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("EventBus")
            .field("listeners", &registry.entries.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&SimulatorEvent) + 'static,
    {
        self.subscribe(kind, false, Rc::new(listener))
    }

    /// Like [`EventBus::on`], but the listener is dropped after its first delivery.
    pub fn once<F>(&self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&SimulatorEvent) + 'static,
    {
        self.subscribe(kind, true, Rc::new(listener))
    }

    fn subscribe(&self, kind: EventKind, once: bool, listener: Listener) -> Subscription {
        let id = self.registry.borrow_mut().insert(kind, once, listener);
        Subscription {
            registry: Rc::downgrade(&self.registry),
            kind,
            id,
        }
    }

    /// Deliver `event` to every listener registered for its kind, in
    /// registration order. Returns how many listeners were called.
    pub fn emit(&self, event: &SimulatorEvent) -> usize {
        let kind = event.kind();
        let targets: Vec<(u64, bool, Listener)> = self
            .registry
            .borrow()
            .entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| (e.id, e.once, Rc::clone(&e.listener)))
            .collect();

        let mut delivered = 0;
        for (id, once, listener) in targets {
            // an earlier listener in this round may have unsubscribed it
            let live = if once {
                self.registry.borrow_mut().remove(id)
            } else {
                self.registry.borrow().contains(id)
            };
            if live {
                listener(event);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registry.borrow().entries.iter().filter(|e| e.kind == kind).count()
    }

    pub fn clear(&self) {
        self.registry.borrow_mut().entries.clear();
    }
}

/// Handle returned by [`EventBus::on`]. Dropping it keeps the listener registered.
#[derive(Debug, Clone)]
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns false if the listener was already gone.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.borrow_mut().remove(self.id),
            None => false,
        }
    }
}
