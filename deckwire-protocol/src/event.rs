//! Typed decoding of inbound hardware events.
//!
//! Events arrive with transaction id 0 and are distinguished purely by their
//! message kind. Each event kind has a fixed payload layout; everything else
//! on the stream (acknowledgements, query responses) is not an event and
//! decodes to `None` here.

use crate::error::ProtocolError;
use crate::message::{Message, MessageKind};

/// A physical button, including the click action of the knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Button(pub u16);

impl Button {
    pub const KNOB_1: Button = Button(1);
    pub const KNOB_2: Button = Button(2);
    pub const KNOB_3: Button = Button(3);
    pub const KNOB_4: Button = Button(4);
    pub const KNOB_5: Button = Button(5);
    pub const KNOB_6: Button = Button(6);

    /// The round button; doubles as button 0 of the labelled row.
    pub const CIRCLE: Button = Button(7);
    pub const B1: Button = Button(8);
    pub const B2: Button = Button(9);
    pub const B3: Button = Button(10);
    pub const B4: Button = Button(11);
    pub const B5: Button = Button(12);
    pub const B6: Button = Button(13);
    pub const B7: Button = Button(14);

    // Buttons only present on the large console models.
    pub const DIAL_CIRCLE: Button = Button(15);
    pub const UNDO: Button = Button(16);
    pub const KEYBOARD: Button = Button(17);
    pub const ENTER: Button = Button(18);
    pub const SAVE: Button = Button(19);
    pub const LEFT_FN: Button = Button(20);
    pub const UP: Button = Button(21);
    pub const LEFT: Button = Button(22);
    pub const RIGHT_FN: Button = Button(23);
    pub const DOWN: Button = Button(24);
    pub const RIGHT: Button = Button(25);
    pub const E: Button = Button(26);
}

/// A rotary knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Knob(pub u16);

impl Knob {
    /// The large center dial on the big console models.
    pub const DIAL: Knob = Knob(0);
    pub const KNOB_1: Knob = Knob(1);
    pub const KNOB_2: Knob = Knob(2);
    pub const KNOB_3: Knob = Knob(3);
    pub const KNOB_4: Knob = Knob(4);
    pub const KNOB_5: Knob = Knob(5);
    pub const KNOB_6: Knob = Knob(6);
}

/// Press phase of a button or touch contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonState {
    Down,
    Up,
}

impl ButtonState {
    pub fn from_byte(b: u8) -> Result<Self, ProtocolError> {
        match b {
            0 => Ok(ButtonState::Down),
            1 => Ok(ButtonState::Up),
            other => Err(ProtocolError::InvalidButtonState(other)),
        }
    }
}

/// Decodes the knob rotation byte.
///
/// 255 is one detent counter-clockwise; every other value passes through
/// unchanged, so signed-detent knobs and absolute-position dials share one
/// wire representation.
pub fn knob_delta(raw: u8) -> i32 {
    if raw == 255 {
        -1
    } else {
        raw as i32
    }
}

/// A decoded hardware event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Button {
        button: Button,
        state: ButtonState,
    },
    Knob {
        knob: Knob,
        delta: i32,
    },
    TouchBegin {
        x: u16,
        y: u16,
        /// Contact tracking id; carried through but not interpreted.
        contact: u8,
    },
    TouchEnd {
        x: u16,
        y: u16,
        contact: u8,
    },
}

impl Event {
    /// Decodes an event from a message, if the message is one.
    ///
    /// Returns `Ok(None)` for non-event kinds (acknowledgements, query
    /// responses, unknown codes); those are the router's business to log or
    /// ignore. Returns an error only when an event payload is shorter than
    /// its fixed layout.
    pub fn decode(msg: &Message) -> Result<Option<Event>, ProtocolError> {
        let p = &msg.payload;
        match msg.kind {
            MessageKind::ButtonPress => {
                require(msg, 3)?;
                Ok(Some(Event::Button {
                    button: Button(u16::from_be_bytes([p[0], p[1]])),
                    state: ButtonState::from_byte(p[2])?,
                }))
            }
            MessageKind::KnobRotate => {
                require(msg, 3)?;
                Ok(Some(Event::Knob {
                    knob: Knob(u16::from_be_bytes([p[0], p[1]])),
                    delta: knob_delta(p[2]),
                }))
            }
            MessageKind::TouchBegin | MessageKind::TouchBeginAlt => {
                require(msg, 7)?;
                Ok(Some(Event::TouchBegin {
                    x: u16::from_be_bytes([p[2], p[3]]),
                    y: u16::from_be_bytes([p[4], p[5]]),
                    contact: p[6],
                }))
            }
            MessageKind::TouchEnd | MessageKind::TouchEndAlt => {
                require(msg, 7)?;
                Ok(Some(Event::TouchEnd {
                    x: u16::from_be_bytes([p[2], p[3]]),
                    y: u16::from_be_bytes([p[4], p[5]]),
                    contact: p[6],
                }))
            }
            _ => Ok(None),
        }
    }
}

fn require(msg: &Message, needed: usize) -> Result<(), ProtocolError> {
    if msg.payload.len() < needed {
        return Err(ProtocolError::TruncatedEvent {
            kind: msg.kind,
            len: msg.payload.len(),
            needed,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn msg(kind: MessageKind, payload: &[u8]) -> Message {
        Message::new(kind, Bytes::copy_from_slice(payload))
    }

    #[test]
    fn test_button_down() {
        let ev = Event::decode(&msg(MessageKind::ButtonPress, &[0, 7, 0]))
            .unwrap()
            .unwrap();
        assert_eq!(
            ev,
            Event::Button {
                button: Button::CIRCLE,
                state: ButtonState::Down
            }
        );
    }

    #[test]
    fn test_button_up() {
        let ev = Event::decode(&msg(MessageKind::ButtonPress, &[0, 8, 1]))
            .unwrap()
            .unwrap();
        assert_eq!(
            ev,
            Event::Button {
                button: Button::B1,
                state: ButtonState::Up
            }
        );
    }

    #[test]
    fn test_button_invalid_state() {
        let err = Event::decode(&msg(MessageKind::ButtonPress, &[0, 7, 2])).unwrap_err();
        assert_eq!(err, ProtocolError::InvalidButtonState(2));
    }

    #[test]
    fn test_knob_delta_decoding() {
        assert_eq!(knob_delta(255), -1);
        assert_eq!(knob_delta(1), 1);
        assert_eq!(knob_delta(0), 0);
        assert_eq!(knob_delta(254), 254);
    }

    #[test]
    fn test_knob_event() {
        let ev = Event::decode(&msg(MessageKind::KnobRotate, &[0, 3, 255]))
            .unwrap()
            .unwrap();
        assert_eq!(
            ev,
            Event::Knob {
                knob: Knob::KNOB_3,
                delta: -1
            }
        );
    }

    #[test]
    fn test_touch_begin() {
        // x = 0x0102, y = 0x0030, contact = 5
        let ev = Event::decode(&msg(MessageKind::TouchBegin, &[0, 0, 1, 2, 0, 0x30, 5]))
            .unwrap()
            .unwrap();
        assert_eq!(
            ev,
            Event::TouchBegin {
                x: 0x0102,
                y: 0x0030,
                contact: 5
            }
        );
    }

    #[test]
    fn test_touch_end_alt_surface() {
        let ev = Event::decode(&msg(MessageKind::TouchEndAlt, &[0, 0, 0, 90, 0, 10, 1]))
            .unwrap()
            .unwrap();
        assert_eq!(
            ev,
            Event::TouchEnd {
                x: 90,
                y: 10,
                contact: 1
            }
        );
    }

    #[test]
    fn test_truncated_event() {
        let err = Event::decode(&msg(MessageKind::TouchBegin, &[0, 0, 1])).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::TruncatedEvent {
                kind: MessageKind::TouchBegin,
                len: 3,
                needed: 7
            }
        );
    }

    #[test]
    fn test_non_events_decode_to_none() {
        for kind in [
            MessageKind::SetColor,
            MessageKind::SetBrightness,
            MessageKind::SetVibration,
            MessageKind::Refresh,
            MessageKind::WriteFramebuffer,
            MessageKind::Serial,
            MessageKind::Version,
            MessageKind::Mcu,
            MessageKind::Reset,
            MessageKind::Unknown(0x99),
        ] {
            assert_eq!(Event::decode(&msg(kind, &[1, 2, 3])).unwrap(), None);
        }
    }
}
