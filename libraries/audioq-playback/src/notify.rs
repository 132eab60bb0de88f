//! Change notifications
//!
//! Observer fan-out for engine state changes. Three event kinds exist, each
//! with its own registry: project-name changes, settings changes, and cue
//! list changes (no payload; observers re-snapshot the queue).
//!
//! Every observer gets its own bounded queue, so delivery to one observer
//! can never block or delay delivery to another, and publishing never
//! blocks the control path. When a queue is full the oldest queued event is
//! dropped to make room for the newest. Registration is append-only and
//! events are delivered in registration order; publishing with zero
//! observers simply drops the event.

use crossbeam_channel::{bounded, Receiver, TrySendError};
use tracing::debug;

use crate::settings::Settings;

/// Default capacity of each observer's event queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Receiving end of one observer's event queue.
pub struct Subscription<T> {
    rx: Receiver<T>,
}

impl<T> Subscription<T> {
    /// Next queued event, if any, without blocking.
    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Block until the next event arrives.
    ///
    /// Returns `None` only if the engine (and with it the bus) is gone.
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Queued event count.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// One registered observer queue.
///
/// The bus keeps a receiver clone alongside the sender so it can pop the
/// oldest event when the queue is full.
struct Slot<T> {
    tx: crossbeam_channel::Sender<T>,
    rx: Receiver<T>,
}

impl<T> Slot<T> {
    fn new(capacity: usize) -> (Self, Subscription<T>) {
        let (tx, rx) = bounded(capacity);
        let slot = Self { tx, rx: rx.clone() };
        (slot, Subscription { rx })
    }

    /// Non-blocking send with drop-oldest overflow.
    fn deliver(&self, event: T) {
        let mut event = event;
        loop {
            match self.tx.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    if self.rx.try_recv().is_ok() {
                        debug!("observer queue full, dropped oldest event");
                    }
                    event = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

/// Fan-out registry for engine change events.
pub struct NotificationBus {
    capacity: usize,
    name: Vec<Slot<String>>,
    settings: Vec<Slot<Settings>>,
    cue_list: Vec<Slot<()>>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            name: Vec::new(),
            settings: Vec::new(),
            cue_list: Vec::new(),
        }
    }

    /// Register an observer for project-name changes.
    pub fn subscribe_name(&mut self) -> Subscription<String> {
        let (slot, subscription) = Slot::new(self.capacity);
        self.name.push(slot);
        subscription
    }

    /// Register an observer for settings changes.
    pub fn subscribe_settings(&mut self) -> Subscription<Settings> {
        let (slot, subscription) = Slot::new(self.capacity);
        self.settings.push(slot);
        subscription
    }

    /// Register an observer for cue list changes.
    pub fn subscribe_cue_list(&mut self) -> Subscription<()> {
        let (slot, subscription) = Slot::new(self.capacity);
        self.cue_list.push(slot);
        subscription
    }

    pub fn publish_name(&self, name: &str) {
        for slot in &self.name {
            slot.deliver(name.to_owned());
        }
    }

    pub fn publish_settings(&self, settings: &Settings) {
        for slot in &self.settings {
            slot.deliver(settings.clone());
        }
    }

    pub fn publish_cue_list(&self) {
        for slot in &self.cue_list {
            slot.deliver(());
        }
    }
}
