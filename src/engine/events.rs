// Game events
//
// Engine-level lifecycle notifications (room swaps, scene swaps) with
// subscribe/emit plumbing. A listener controls its own lifetime
// through its return value: `Keep` stays subscribed, `Unsubscribe`
// removes it after the current emit.

use log::debug;
use serde_json::Value;

/// Whether the event fires before or after the operation it surrounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventPhase {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The active room is being swapped; `data` carries the room id
    RoomChange,
    /// The whole scene is being replaced
    SceneChange,
}

/// One emitted event. `data` is operation-specific JSON, `Value::Null`
/// when the operation has nothing to say.
#[derive(Debug, Clone)]
pub struct GameEvent {
    pub phase: EventPhase,
    pub kind: EventKind,
    pub data: Value,
}

/// A listener's verdict on its own subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerAction {
    Keep,
    Unsubscribe,
}

struct Listener {
    /// `None` subscribes to every kind
    kind: Option<EventKind>,
    callback: Box<dyn FnMut(&GameEvent) -> ListenerAction>,
}

/// Dispatches game events to subscribed listeners.
#[derive(Default)]
pub struct GameEventHandler {
    listeners: Vec<Listener>,
}

impl GameEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event kind, or to every kind with `None`
    pub fn subscribe<F>(&mut self, kind: Option<EventKind>, callback: F)
    where
        F: FnMut(&GameEvent) -> ListenerAction + 'static,
    {
        self.listeners.push(Listener {
            kind,
            callback: Box::new(callback),
        });
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Fire an event at every matching listener, in subscription order.
    /// Listeners answering `Unsubscribe` are dropped afterwards.
    pub fn emit(&mut self, event: &GameEvent) {
        debug!("event {:?}/{:?}", event.kind, event.phase);

        self.listeners.retain_mut(|listener| {
            match listener.kind {
                Some(kind) if kind != event.kind => true,
                _ => (listener.callback)(event) == ListenerAction::Keep,
            }
        });
    }

    /// Run an operation bracketed by `Before` and `After` events of the
    /// same kind and data.
    pub fn surround<R>(&mut self, kind: EventKind, data: Value, operation: impl FnOnce() -> R) -> R {
        self.emit(&GameEvent {
            phase: EventPhase::Before,
            kind,
            data: data.clone(),
        });

        let result = operation();

        self.emit(&GameEvent {
            phase: EventPhase::After,
            kind,
            data,
        });
        result
    }
}
