//! Client error types.

use thiserror::Error;

/// Engine errors.
///
/// Transport failures always surface to the caller; decode-level anomalies
/// never appear here because the receive loop recovers from them locally.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] deckwire_protocol::ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("unknown device model: {0:?}")]
    UnknownModel(String),

    #[error("unknown display surface: {0:?}")]
    UnknownSurface(String),

    #[error("malformed {0} response")]
    MalformedResponse(&'static str),
}
