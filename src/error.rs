//! Error types for rcon-client.

use thiserror::Error;

/// Main error type for all RCON operations.
#[derive(Debug, Error)]
pub enum RconError {
    /// Bad host/port/password/timeout shape, detected before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport-level failure while opening the connection.
    #[error("connect failed: {0}")]
    ConnectError(#[source] std::io::Error),

    /// The connect deadline expired before the transport connected.
    #[error("connection timed out during connect")]
    ConnectTimeout,

    /// The server rejected the password.
    #[error("authentication failed")]
    AuthFailed,

    /// No authentication reply arrived within the deadline.
    #[error("connection timed out during authentication")]
    AuthTimeout,

    /// A frame's size field is inconsistent with protocol invariants.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A complete frame failed to decode.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// Payload would overflow the i32 size field.
    #[error("payload of {size} bytes exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// The transport rejected a write.
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    /// I/O error on the socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A command was submitted while disconnected.
    #[error("not connected to the server")]
    NotReady,

    /// The connection closed while an operation was outstanding.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Result type alias using RconError.
pub type Result<T> = std::result::Result<T, RconError>;
