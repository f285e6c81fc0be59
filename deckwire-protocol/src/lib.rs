//! # deckwire-protocol
//!
//! Wire protocol implementation for deckwire control panels.
//!
//! This crate provides:
//! - Binary message framing with the vendor length/type/transaction header
//! - The one-byte command and event code table
//! - Typed decoding of inbound hardware events
//! - Protocol error types
//!
//! The engine built on top of this lives in `deckwire-client`; this crate is
//! pure data transforms with no I/O.

pub mod error;
pub mod event;
pub mod message;

pub use error::ProtocolError;
pub use event::{Button, ButtonState, Event, Knob};
pub use message::{Message, MessageKind, HEADER_SIZE, MAX_WIRE_LENGTH};
