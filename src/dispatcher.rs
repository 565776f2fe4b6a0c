//! Per-side drag event registry
//!
//! A [`PoseDragger`] maps event names to a single handler each; registering
//! again under the same name replaces the previous handler. Firing a name
//! with no handler does nothing. A [`PersonDragger`] bundles one dragger per
//! tracked side, which is what game modules subscribe to.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::tracker::{GestureEvent, Side};

/// Event name carrying a drag step: `[dx, dy, x, y, null, side]`
pub const VALUE_UPDATE: &str = "value-update";

/// Callback type for drag events
///
/// Receives the positional argument list the event was fired with.
pub type DragHandler = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Named-event registry for one tracked side
#[derive(Default)]
pub struct PoseDragger {
    events: HashMap<String, DragHandler>,
}

impl PoseDragger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`, replacing any existing one
    pub fn on(&mut self, event: impl Into<String>, handler: DragHandler) {
        let event = event.into();
        if self.events.insert(event.clone(), handler).is_some() {
            trace!("Replaced handler for '{}'", event);
        }
    }

    /// Register a typed handler for drag steps
    pub fn on_value_update<F>(&mut self, handler: F)
    where
        F: Fn(&GestureEvent) + Send + Sync + 'static,
    {
        self.on(
            VALUE_UPDATE,
            Arc::new(move |args: &[Value]| match GestureEvent::from_args(args) {
                Some(event) => handler(&event),
                None => warn!("Ignoring malformed {} arguments: {:?}", VALUE_UPDATE, args),
            }),
        );
    }

    /// Invoke the handler for `event` with `args`
    ///
    /// Returns whether a handler ran.
    pub fn fire(&self, event: &str, args: &[Value]) -> bool {
        match self.events.get(event) {
            Some(handler) => {
                handler(args);
                true
            }
            None => {
                trace!("No handler for '{}', dropping event", event);
                false
            }
        }
    }

    /// Fire a drag step under [`VALUE_UPDATE`]
    pub fn fire_gesture(&self, event: &GestureEvent) -> bool {
        self.fire(VALUE_UPDATE, &event.to_args())
    }

    pub fn has_handler(&self, event: &str) -> bool {
        self.events.contains_key(event)
    }

    /// Drop the handler for `event`, if any
    pub fn off(&mut self, event: &str) -> bool {
        self.events.remove(event).is_some()
    }
}

impl std::fmt::Debug for PoseDragger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseDragger")
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// One dragger per tracked side of a person
#[derive(Debug, Default)]
pub struct PersonDragger {
    pub left: PoseDragger,
    pub right: PoseDragger,
}

impl PersonDragger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn side(&self, side: Side) -> &PoseDragger {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut PoseDragger {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Route a drag step to the dragger of its side
    pub fn dispatch(&self, event: &GestureEvent) -> bool {
        self.side(event.side).fire_gesture(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counter() -> (Arc<AtomicUsize>, DragHandler) {
        let count = Arc::new(AtomicUsize::new(0));
        let clone = count.clone();
        let handler: DragHandler = Arc::new(move |_args: &[Value]| {
            clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, handler)
    }

    #[test]
    fn test_last_registration_wins() {
        let mut dragger = PoseDragger::new();
        let (a_count, a) = counter();
        let (b_count, b) = counter();

        dragger.on(VALUE_UPDATE, a);
        dragger.on(VALUE_UPDATE, b);
        assert!(dragger.fire(VALUE_UPDATE, &[]));

        assert_eq!(a_count.load(Ordering::SeqCst), 0);
        assert_eq!(b_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregistered_event_is_noop() {
        let mut dragger = PoseDragger::new();
        assert!(!dragger.fire("startDrag", &[Value::Null]));

        let (count, handler) = counter();
        dragger.on("startDrag", handler);
        assert!(dragger.off("startDrag"));
        assert!(!dragger.has_handler("startDrag"));
        assert!(!dragger.fire("startDrag", &[]));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_args_passed_in_order() {
        let mut dragger = PoseDragger::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let clone = seen.clone();
        dragger.on(
            VALUE_UPDATE,
            Arc::new(move |args: &[Value]| clone.lock().unwrap().extend_from_slice(args)),
        );

        let event = GestureEvent { dx: 1.0, dy: 2.0, x: 3.0, y: 4.0, side: Side::Right };
        assert!(dragger.fire_gesture(&event));

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, event.to_args());
        assert_eq!(seen[5], Value::from("right"));
    }

    #[test]
    fn test_typed_handler_receives_event() {
        let mut person = PersonDragger::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let clone = received.clone();
        person
            .side_mut(Side::Left)
            .on_value_update(move |event| clone.lock().unwrap().push(*event));

        let left = GestureEvent { dx: 10.0, dy: -5.0, x: 110.0, y: 95.0, side: Side::Left };
        let right = GestureEvent { side: Side::Right, ..left };

        assert!(person.dispatch(&left));
        // Nothing registered on the right side
        assert!(!person.dispatch(&right));

        assert_eq!(*received.lock().unwrap(), vec![left]);
    }

    #[test]
    fn test_typed_handler_ignores_malformed_args() {
        let mut dragger = PoseDragger::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let clone = hits.clone();
        dragger.on_value_update(move |_| {
            clone.fetch_add(1, Ordering::SeqCst);
        });

        // Handler is registered, so fire reports it ran, but the event is dropped
        assert!(dragger.fire(VALUE_UPDATE, &[Value::from("oops")]));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
