//! Event routing to registered callbacks.
//!
//! Transaction-less inbound messages are classified by kind and delivered to
//! per-key handlers. Each key holds at most one handler per phase; binding
//! again replaces the previous one. Handlers run synchronously on the
//! receive path and must hand off anything that blocks.

use crate::touch::TouchZone;
use deckwire_protocol::{Button, ButtonState, Event, Knob, Message, MessageKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Callback for button press/release events.
pub type ButtonHandler = Arc<dyn Fn(Button, ButtonState) + Send + Sync>;
/// Callback for knob rotation events; the delta is -1/+1 for detent knobs,
/// an absolute position for dials.
pub type KnobHandler = Arc<dyn Fn(Knob, i32) + Send + Sync>;
/// Callback for touch events: zone, phase, absolute x, absolute y.
pub type TouchHandler = Arc<dyn Fn(TouchZone, ButtonState, u16, u16) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Bindings {
    button_down: RwLock<HashMap<Button, ButtonHandler>>,
    button_up: RwLock<HashMap<Button, ButtonHandler>>,
    knob: RwLock<HashMap<Knob, KnobHandler>>,
    touch_down: RwLock<HashMap<TouchZone, TouchHandler>>,
    touch_up: RwLock<HashMap<TouchZone, TouchHandler>>,
}

impl Bindings {
    pub fn bind_button(&self, button: Button, handler: ButtonHandler) {
        self.button_down.write().insert(button, handler);
    }

    pub fn bind_button_up(&self, button: Button, handler: ButtonHandler) {
        self.button_up.write().insert(button, handler);
    }

    pub fn bind_knob(&self, knob: Knob, handler: KnobHandler) {
        self.knob.write().insert(knob, handler);
    }

    pub fn bind_touch(&self, zone: TouchZone, handler: TouchHandler) {
        self.touch_down.write().insert(zone, handler);
    }

    pub fn bind_touch_up(&self, zone: TouchZone, handler: TouchHandler) {
        self.touch_up.write().insert(zone, handler);
    }

    /// Routes one transaction-less message.
    ///
    /// Never fails: malformed events are logged and dropped, unbound events
    /// are dropped, non-event traffic is ignored.
    pub fn route(&self, msg: &Message) {
        let event = match Event::decode(msg) {
            Ok(Some(event)) => event,
            Ok(None) => {
                match msg.kind {
                    MessageKind::Unknown(code) => {
                        tracing::debug!(code, "dropping message with unknown type");
                    }
                    // Acknowledgements and untagged query responses; any
                    // correlated copy was already consumed by the
                    // transaction registry.
                    _ => tracing::trace!(kind = ?msg.kind, "ignoring non-event message"),
                }
                return;
            }
            Err(err) => {
                tracing::warn!(%err, "dropping malformed event");
                return;
            }
        };

        // Handlers are invoked after the read guard is released so that a
        // callback may re-bind without deadlocking.
        match event {
            Event::Button { button, state } => {
                let map = match state {
                    ButtonState::Down => &self.button_down,
                    ButtonState::Up => &self.button_up,
                };
                let handler = map.read().get(&button).cloned();
                match handler {
                    Some(handler) => handler(button, state),
                    None => {
                        tracing::debug!(button = button.0, ?state, "unbound button event");
                    }
                }
            }
            Event::Knob { knob, delta } => {
                let handler = self.knob.read().get(&knob).cloned();
                match handler {
                    Some(handler) => handler(knob, delta),
                    None => tracing::debug!(knob = knob.0, delta, "unbound knob event"),
                }
            }
            Event::TouchBegin { x, y, .. } => {
                let zone = TouchZone::from_coord(x, y);
                let handler = self.touch_down.read().get(&zone).cloned();
                match handler {
                    Some(handler) => handler(zone, ButtonState::Down, x, y),
                    None => tracing::debug!(zone = zone.0, x, y, "unbound touch event"),
                }
            }
            Event::TouchEnd { x, y, .. } => {
                let zone = TouchZone::from_coord(x, y);
                let handler = self.touch_up.read().get(&zone).cloned();
                match handler {
                    Some(handler) => handler(zone, ButtonState::Up, x, y),
                    None => tracing::debug!(zone = zone.0, x, y, "unbound touch end event"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

    fn msg(kind: MessageKind, payload: &[u8]) -> Message {
        Message::new(kind, Bytes::copy_from_slice(payload))
    }

    #[test]
    fn test_button_routing_by_phase() {
        let bindings = Bindings::default();
        let downs = Arc::new(AtomicU32::new(0));
        let ups = Arc::new(AtomicU32::new(0));

        let d = downs.clone();
        bindings.bind_button(Button::CIRCLE, Arc::new(move |_, _| {
            d.fetch_add(1, Ordering::SeqCst);
        }));
        let u = ups.clone();
        bindings.bind_button_up(Button::CIRCLE, Arc::new(move |_, _| {
            u.fetch_add(1, Ordering::SeqCst);
        }));

        bindings.route(&msg(MessageKind::ButtonPress, &[0, 7, 0]));
        bindings.route(&msg(MessageKind::ButtonPress, &[0, 7, 1]));
        bindings.route(&msg(MessageKind::ButtonPress, &[0, 7, 0]));

        assert_eq!(downs.load(Ordering::SeqCst), 2);
        assert_eq!(ups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unbound_event_dropped() {
        let bindings = Bindings::default();
        // No handler registered; must not panic.
        bindings.route(&msg(MessageKind::ButtonPress, &[0, 9, 0]));
        bindings.route(&msg(MessageKind::KnobRotate, &[0, 1, 255]));
    }

    #[test]
    fn test_binding_replaced() {
        let bindings = Bindings::default();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        let f = first.clone();
        bindings.bind_knob(Knob::KNOB_1, Arc::new(move |_, _| {
            f.fetch_add(1, Ordering::SeqCst);
        }));
        let s = second.clone();
        bindings.bind_knob(Knob::KNOB_1, Arc::new(move |_, _| {
            s.fetch_add(1, Ordering::SeqCst);
        }));

        bindings.route(&msg(MessageKind::KnobRotate, &[0, 1, 1]));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_knob_delta_reaches_handler() {
        let bindings = Bindings::default();
        let seen = Arc::new(AtomicI32::new(0));
        let s = seen.clone();
        bindings.bind_knob(Knob::DIAL, Arc::new(move |_, delta| {
            s.store(delta, Ordering::SeqCst);
        }));

        bindings.route(&msg(MessageKind::KnobRotate, &[0, 0, 255]));
        assert_eq!(seen.load(Ordering::SeqCst), -1);

        bindings.route(&msg(MessageKind::KnobRotate, &[0, 0, 1]));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_touch_maps_coordinate_to_zone() {
        let bindings = Bindings::default();
        let hits = Arc::new(AtomicU32::new(0));
        let h = hits.clone();
        bindings.bind_touch(TouchZone(5), Arc::new(move |zone, state, x, y| {
            assert_eq!(zone, TouchZone(5));
            assert_eq!(state, ButtonState::Down);
            assert_eq!((x, y), (70, 100));
            h.fetch_add(1, Ordering::SeqCst);
        }));

        // x = 70, y = 100 lands in grid zone 5.
        bindings.route(&msg(MessageKind::TouchBegin, &[0, 0, 0, 70, 0, 100, 1]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Touch end goes to the separate up-binding family.
        bindings.route(&msg(MessageKind::TouchEnd, &[0, 0, 0, 70, 0, 100, 1]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bezel_touch() {
        let bindings = Bindings::default();
        let hits = Arc::new(AtomicU32::new(0));
        let h = hits.clone();
        bindings.bind_touch_up(TouchZone::LEFT, Arc::new(move |_, _, _, _| {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        bindings.route(&msg(MessageKind::TouchEndAlt, &[0, 0, 0, 10, 0, 50, 1]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_non_events_ignored() {
        let bindings = Bindings::default();
        bindings.route(&msg(MessageKind::SetBrightness, &[]));
        bindings.route(&msg(MessageKind::Version, &[1, 2, 3]));
        bindings.route(&msg(MessageKind::Unknown(0x99), &[1, 2, 3]));
    }

    #[test]
    fn test_malformed_event_dropped() {
        let bindings = Bindings::default();
        bindings.route(&msg(MessageKind::ButtonPress, &[0]));
        bindings.route(&msg(MessageKind::TouchBegin, &[1, 2, 3]));
    }

    #[test]
    fn test_handler_may_rebind() {
        let bindings: Arc<Bindings> = Arc::new(Bindings::default());
        let hits = Arc::new(AtomicU32::new(0));

        let b = bindings.clone();
        let h = hits.clone();
        bindings.bind_button(Button::B1, Arc::new(move |button, _| {
            h.fetch_add(1, Ordering::SeqCst);
            // Re-binding from inside a handler must not deadlock.
            b.bind_button(button, Arc::new(|_, _| {}));
        }));

        bindings.route(&msg(MessageKind::ButtonPress, &[0, 8, 0]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // The replacement handler is in effect now.
        bindings.route(&msg(MessageKind::ButtonPress, &[0, 8, 0]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
