//! Binary message format for the panel protocol.
//!
//! Wire layout (3-byte header + payload):
//!
//! ```text
//! +--------+--------+----------------+------------------+
//! | length |  type  | transaction_id | payload          |
//! | 1 byte | 1 byte |     1 byte     | 0..n bytes       |
//! +--------+--------+----------------+------------------+
//! ```
//!
//! `length` is `payload length + 3`, saturating at 255. Framebuffer writes
//! carry payloads far larger than the byte can express, so the value is
//! informational only: the transport preserves frame boundaries and decoding
//! always takes the rest of the frame as the payload.

use crate::error::ProtocolError;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Size of the fixed message header in bytes.
pub const HEADER_SIZE: usize = 3;

/// Saturation point of the wire length byte.
pub const MAX_WIRE_LENGTH: u8 = 255;

/// One-byte command and event codes.
///
/// The same stream carries outbound commands, their acknowledgements and
/// unsolicited hardware events; the code alone decides the payload layout.
/// Codes not in the table decode as [`MessageKind::Unknown`] so that inbound
/// traffic from newer firmware never fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Button press or release event.
    ButtonPress,
    /// Knob rotation event.
    KnobRotate,
    /// Set the color of an LED button.
    SetColor,
    /// Serial number query / response.
    Serial,
    /// Device reset.
    Reset,
    /// Firmware version query / response.
    Version,
    /// Set display backlight brightness.
    SetBrightness,
    /// MCU-specific command.
    Mcu,
    /// Repaint a display surface from its framebuffer.
    Refresh,
    /// Write pixel data into a display framebuffer.
    WriteFramebuffer,
    /// Trigger the haptic motor.
    SetVibration,
    /// Touch contact started.
    TouchBegin,
    /// Touch contact started (knob dial surface).
    TouchBeginAlt,
    /// Touch contact ended.
    TouchEnd,
    /// Touch contact ended (knob dial surface).
    TouchEndAlt,
    /// Any code outside the known table.
    Unknown(u8),
}

impl MessageKind {
    /// Maps a wire code to a kind. Total: unlisted codes become `Unknown`.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => MessageKind::ButtonPress,
            0x01 => MessageKind::KnobRotate,
            0x02 => MessageKind::SetColor,
            0x03 => MessageKind::Serial,
            0x06 => MessageKind::Reset,
            0x07 => MessageKind::Version,
            0x09 => MessageKind::SetBrightness,
            0x0d => MessageKind::Mcu,
            0x0f => MessageKind::Refresh,
            0x10 => MessageKind::WriteFramebuffer,
            0x1b => MessageKind::SetVibration,
            0x4d => MessageKind::TouchBegin,
            0x52 => MessageKind::TouchBeginAlt,
            0x6d => MessageKind::TouchEnd,
            0x72 => MessageKind::TouchEndAlt,
            other => MessageKind::Unknown(other),
        }
    }

    /// Returns the wire code for this kind.
    pub fn code(&self) -> u8 {
        match self {
            MessageKind::ButtonPress => 0x00,
            MessageKind::KnobRotate => 0x01,
            MessageKind::SetColor => 0x02,
            MessageKind::Serial => 0x03,
            MessageKind::Reset => 0x06,
            MessageKind::Version => 0x07,
            MessageKind::SetBrightness => 0x09,
            MessageKind::Mcu => 0x0d,
            MessageKind::Refresh => 0x0f,
            MessageKind::WriteFramebuffer => 0x10,
            MessageKind::SetVibration => 0x1b,
            MessageKind::TouchBegin => 0x4d,
            MessageKind::TouchBeginAlt => 0x52,
            MessageKind::TouchEnd => 0x6d,
            MessageKind::TouchEndAlt => 0x72,
            MessageKind::Unknown(code) => *code,
        }
    }
}

/// A single wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Command or event code.
    pub kind: MessageKind,
    /// Correlation id; 0 means no response is expected (or the message is an
    /// unsolicited event). Non-zero ids are allocated from 1..=255.
    pub transaction_id: u8,
    /// Payload bytes; layout depends on `kind`.
    pub payload: Bytes,
}

impl Message {
    /// Creates a message with no transaction id (fire-and-forget / event).
    pub fn new(kind: MessageKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            transaction_id: 0,
            payload: payload.into(),
        }
    }

    /// Sets the transaction id.
    pub fn with_transaction(mut self, id: u8) -> Self {
        self.transaction_id = id;
        self
    }

    /// The value of the wire length byte: payload length + 3, saturating.
    pub fn wire_length(&self) -> u8 {
        (self.payload.len() + HEADER_SIZE).min(MAX_WIRE_LENGTH as usize) as u8
    }

    /// Encodes the message into wire bytes.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        buf.put_u8(self.wire_length());
        buf.put_u8(self.kind.code());
        buf.put_u8(self.transaction_id);
        buf.put_slice(&self.payload);
        buf
    }

    /// Decodes a message from one complete frame.
    ///
    /// The length byte is not trusted: everything past the header is the
    /// payload, which tolerates encoders that saturate or misreport it.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < HEADER_SIZE {
            return Err(ProtocolError::FrameTooShort { len: frame.len() });
        }

        Ok(Self {
            kind: MessageKind::from_code(frame[1]),
            transaction_id: frame[2],
            payload: Bytes::copy_from_slice(&frame[HEADER_SIZE..]),
        })
    }
}

impl fmt::Display for Message {
    /// Compact debug form; long payloads are cut at 16 bytes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.len() > 16 {
            write!(
                f,
                "{{len: {}, type: {:#04x}, txn: {:#04x}, data: {:02x?}..., actual_len: {}}}",
                self.wire_length(),
                self.kind.code(),
                self.transaction_id,
                &self.payload[..16],
                self.payload.len()
            )
        } else {
            write!(
                f,
                "{{len: {}, type: {:#04x}, txn: {:#04x}, data: {:02x?}}}",
                self.wire_length(),
                self.kind.code(),
                self.transaction_id,
                &self.payload[..]
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KNOWN_CODES: [u8; 15] = [
        0x00, 0x01, 0x02, 0x03, 0x06, 0x07, 0x09, 0x0d, 0x0f, 0x10, 0x1b, 0x4d, 0x52, 0x6d, 0x72,
    ];

    #[test]
    fn test_kind_code_roundtrip() {
        for code in 0..=255u8 {
            assert_eq!(MessageKind::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_unknown_kind() {
        assert_eq!(MessageKind::from_code(0x42), MessageKind::Unknown(0x42));
        for code in KNOWN_CODES {
            assert!(!matches!(
                MessageKind::from_code(code),
                MessageKind::Unknown(_)
            ));
        }
    }

    #[test]
    fn test_encode_layout() {
        let msg = Message::new(MessageKind::SetBrightness, vec![9u8]).with_transaction(0x2a);
        let bytes = msg.encode();
        assert_eq!(&bytes[..], &[4, 0x09, 0x2a, 9]);
    }

    #[test]
    fn test_roundtrip() {
        let msg = Message::new(MessageKind::Version, vec![1u8, 2, 3]).with_transaction(7);
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_short_frame() {
        assert_eq!(
            Message::decode(&[0x03, 0x06]),
            Err(ProtocolError::FrameTooShort { len: 2 })
        );
        assert_eq!(
            Message::decode(&[]),
            Err(ProtocolError::FrameTooShort { len: 0 })
        );
    }

    #[test]
    fn test_decode_header_only() {
        let msg = Message::decode(&[3, 0x06, 0]).unwrap();
        assert_eq!(msg.kind, MessageKind::Reset);
        assert_eq!(msg.transaction_id, 0);
        assert!(msg.payload.is_empty());
    }

    #[test]
    fn test_decode_ignores_length_byte() {
        // length claims 4 but the frame carries 5 payload bytes; the frame
        // boundary wins.
        let msg = Message::decode(&[4, 0x10, 0x01, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(&msg.payload[..], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_length_saturates() {
        let msg = Message::new(MessageKind::WriteFramebuffer, vec![0u8; 300]);
        assert_eq!(msg.wire_length(), 255);
        let bytes = msg.encode();
        assert_eq!(bytes[0], 255);
        assert_eq!(bytes.len(), 303);
    }

    #[test]
    fn test_length_at_boundary() {
        let msg = Message::new(MessageKind::Mcu, vec![0u8; 252]);
        assert_eq!(msg.wire_length(), 255);
        let msg = Message::new(MessageKind::Mcu, vec![0u8; 251]);
        assert_eq!(msg.wire_length(), 254);
    }

    #[test]
    fn test_display_truncates_long_payload() {
        let msg = Message::new(MessageKind::WriteFramebuffer, vec![0xabu8; 64]);
        let s = msg.to_string();
        assert!(s.contains("actual_len: 64"));

        let short = Message::new(MessageKind::Reset, Bytes::new());
        assert!(!short.to_string().contains("actual_len"));
    }

    proptest! {
        #[test]
        fn prop_roundtrip(code_idx in 0usize..KNOWN_CODES.len(),
                          txid in 0u8..=255,
                          payload in proptest::collection::vec(any::<u8>(), 0..=252)) {
            let code = KNOWN_CODES[code_idx];
            let msg = Message::new(MessageKind::from_code(code), payload.clone())
                .with_transaction(txid);
            let decoded = Message::decode(&msg.encode()).unwrap();
            prop_assert_eq!(decoded.kind.code(), code);
            prop_assert_eq!(decoded.transaction_id, txid);
            prop_assert_eq!(&decoded.payload[..], &payload[..]);
            prop_assert_eq!(msg.wire_length() as usize, payload.len() + 3);
        }
    }
}
