//! Error types for the RSP client.

use thiserror::Error;

/// Errors raised while talking to a remote stub.
#[derive(Debug, Error)]
pub enum RspError {
    /// Transport-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stub closed the connection.
    #[error("connection closed by the stub")]
    Disconnected,

    /// A packet violated the wire format.
    #[error("malformed packet: {0}")]
    Protocol(String),

    /// A received packet failed checksum verification (no-ack mode, so it
    /// cannot be re-requested).
    #[error("checksum mismatch: packet carried {expected:#04x}, computed {computed:#04x}")]
    Checksum { expected: u8, computed: u8 },

    /// The stub answered `E NN`.
    #[error("stub replied with error {0:#04x}")]
    ErrorReply(u8),

    /// The stub answered with an empty packet, meaning the request is not
    /// recognized.
    #[error("stub does not support '{0}'")]
    Unsupported(String),

    /// A reply contained a non-hex digit where hex data was expected.
    #[error("invalid hex digit {0:#04x} in reply")]
    InvalidHex(u8),
}

pub type RspResult<T> = Result<T, RspError>;
