//! Game Events
//!
//! Events the session emits for presentation and audio collaborators, and
//! the observer registry that delivers them.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Serialize, Deserialize};

use crate::game::card::SlotIndex;
use crate::game::session::SessionPhase;

/// Something observable happened in the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A card was accepted as a selection and starts flipping up.
    CardFlipped {
        /// Selected slot
        slot: SlotIndex,
    },

    /// A flip-up finished.
    CardRevealed {
        /// Revealed slot
        slot: SlotIndex,
    },

    /// A flip-down finished.
    CardHidden {
        /// Hidden slot
        slot: SlotIndex,
    },

    /// Two selected cards share a token.
    CardsMatched {
        /// First selection
        first: SlotIndex,
        /// Second selection
        second: SlotIndex,
    },

    /// Two selected cards differ.
    CardsMismatched {
        /// First selection
        first: SlotIndex,
        /// Second selection
        second: SlotIndex,
    },

    /// Score changed.
    ScoreChanged {
        /// New total
        score: u32,
    },

    /// Combo level changed.
    ComboChanged {
        /// New level
        level: u32,
    },

    /// Combo countdown progressed.
    ComboTimerUpdate {
        /// Remaining time as a fraction of the limit, in `[0, 1]`
        remaining: f32,
    },

    /// Session phase changed.
    GameStateChanged {
        /// New phase
        phase: SessionPhase,
    },

    /// Every pair was found.
    GameCompleted,
}

/// Receiver of session events.
pub trait EventSink {
    /// Handle one event.
    fn on_event(&mut self, event: &GameEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&GameEvent),
{
    fn on_event(&mut self, event: &GameEvent) {
        self(event)
    }
}

/// Registration handle returned by [`EventBus::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Ordered observer registry.
///
/// Sinks receive every event synchronously, in registration order.
#[derive(Default)]
pub struct EventBus {
    listeners: BTreeMap<ListenerId, Box<dyn EventSink>>,
    next_id: u64,
}

impl EventBus {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink.
    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id, sink);
        id
    }

    /// Remove a sink. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Number of registered sinks.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// No sinks registered?
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver an event to every sink.
    pub fn dispatch(&mut self, event: &GameEvent) {
        for sink in self.listeners.values_mut() {
            sink.on_event(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Sink that records events into a shared buffer.
///
/// Clone it before subscribing and keep the clone to read the log.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<GameEvent>>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<GameEvent> {
        self.events.borrow().clone()
    }

    /// Take everything recorded so far.
    pub fn drain(&self) -> Vec<GameEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Nothing recorded?
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl EventSink for EventLog {
    fn on_event(&mut self, event: &GameEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();

        for tag in ["audio", "hud", "board"] {
            let order = Rc::clone(&order);
            bus.subscribe(Box::new(move |_: &GameEvent| order.borrow_mut().push(tag)));
        }

        bus.dispatch(&GameEvent::GameCompleted);
        assert_eq!(*order.borrow(), vec!["audio", "hud", "board"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let log = EventLog::new();
        let mut bus = EventBus::new();
        let id = bus.subscribe(Box::new(log.clone()));

        bus.dispatch(&GameEvent::ScoreChanged { score: 150 });
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.dispatch(&GameEvent::ScoreChanged { score: 300 });

        assert_eq!(log.events(), vec![GameEvent::ScoreChanged { score: 150 }]);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_event_log_drain() {
        let mut log = EventLog::new();
        log.on_event(&GameEvent::ComboChanged { level: 2 });

        assert_eq!(log.len(), 1);
        assert_eq!(log.drain(), vec![GameEvent::ComboChanged { level: 2 }]);
        assert!(log.is_empty());
    }
}
