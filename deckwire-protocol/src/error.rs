//! Protocol error types.

use crate::message::MessageKind;
use thiserror::Error;

/// Errors raised while decoding wire bytes.
///
/// All of these are recoverable at the receive loop: the offending frame is
/// logged and dropped, and the loop continues.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("frame too short: {len} bytes (minimum 3)")]
    FrameTooShort { len: usize },

    #[error("truncated {kind:?} event: {len}-byte payload, need {needed}")]
    TruncatedEvent {
        kind: MessageKind,
        len: usize,
        needed: usize,
    },

    #[error("invalid button state byte: {0:#04x}")]
    InvalidButtonState(u8),
}
