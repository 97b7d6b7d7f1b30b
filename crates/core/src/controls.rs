//! Typed control events and a publish/subscribe bus.
//!
//! Controller surfaces (MIDI hardware, UI) translate their raw input into
//! [`ControlEvent`]s keyed by a closed [`ControlId`] enum. Interested parts
//! of the application subscribe per control and receive events through the
//! [`ControlBus`]; dropping the returned [`Subscription`] removes the
//! listener.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::deck::DeckId;

/// Every control surface action the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlId {
    /// Toggle play/pause on a deck.
    PlayPause(DeckId),
    /// Absolute tempo fader position for a deck.
    TempoFader(DeckId),
    /// Momentary tempo nudge on a deck.
    TempoNudge(DeckId),
    /// Jump to the cue point on a deck.
    CuePoint(DeckId),
    /// Crossfader position between the decks.
    Crossfader,
    /// Load the next queued track onto the idle deck.
    LoadNext,
    /// Enable or disable automatic transitions.
    ToggleAutoMix,
}

/// Payload carried by a control event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlValue {
    /// Momentary action (button press).
    Trigger,
    /// Continuous controller position, normalized by the input layer.
    Continuous(f64),
    /// On/off state.
    Toggle(bool),
}

/// A single control action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlEvent {
    pub control: ControlId,
    pub value: ControlValue,
}

type Callback = Arc<dyn Fn(&ControlEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<ControlId, Vec<(u64, Callback)>>,
}

/// Publish/subscribe channel for control events.
///
/// Cloning the bus shares the same listener registry. Publishing never
/// blocks on subscribers; callbacks run on the publishing thread and are
/// expected to hand work off (e.g. send on a channel) rather than do it
/// inline.
#[derive(Clone, Default)]
pub struct ControlBus {
    inner: Arc<Mutex<Registry>>,
}

impl ControlBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one control. The listener stays active
    /// until the returned [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(&self, control: ControlId, callback: F) -> Subscription
    where
        F: Fn(&ControlEvent) + Send + Sync + 'static,
    {
        let mut registry = self.inner.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .listeners
            .entry(control)
            .or_default()
            .push((id, Arc::new(callback)));
        Subscription {
            registry: Arc::downgrade(&self.inner),
            control,
            id,
        }
    }

    /// Deliver an event to every listener registered for its control.
    pub fn publish(&self, event: &ControlEvent) {
        // Snapshot the callbacks so listeners can subscribe/unsubscribe
        // from inside a callback without deadlocking the registry.
        let callbacks: Vec<Callback> = {
            let registry = self.inner.lock();
            registry
                .listeners
                .get(&event.control)
                .map(|entries| entries.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default()
        };
        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of active listeners for a control.
    pub fn listener_count(&self, control: ControlId) -> usize {
        self.inner
            .lock()
            .listeners
            .get(&control)
            .map_or(0, Vec::len)
    }
}

/// Handle to an active control listener.
///
/// Unsubscribes on drop; [`Subscription::unsubscribe`] makes the removal
/// explicit at the call site.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    control: ControlId,
    id: u64,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock();
            if let Some(entries) = registry.listeners.get_mut(&self.control) {
                entries.retain(|(id, _)| *id != self.id);
            }
        }
    }
}
