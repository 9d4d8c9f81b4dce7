//! Protocol error types.

use thiserror::Error;

/// Errors decoding a SwitchV2P frame.
///
/// Any of these means the frame is dropped without touching switch state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid packet type: 0x{0:02x}")]
    InvalidPacketType(u8),

    #[error("message too short: expected at least {expected}, got {got}")]
    MessageTooShort { expected: usize, got: usize },

    #[error("message too long: max {max}, got {got}")]
    MessageTooLong { max: usize, got: usize },

    #[error("unsupported IP version: {0}")]
    UnsupportedVersion(u8),

    #[error("unexpected {layer} protocol number: expected {expected}, got {got}")]
    UnexpectedProtocol {
        layer: &'static str,
        expected: u8,
        got: u8,
    },

    #[error("malformed message: {0}")]
    Malformed(String),
}
