//! Error types for the Reflex protocol.

use thiserror::Error;

/// Result type alias for Reflex operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during Reflex operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Cryptographic operation failed
    #[error("cryptographic error: {0}")]
    Crypto(String),

    /// AEAD authentication failed. Deliberately carries no detail about
    /// where in the stream the failure occurred.
    #[error("decryption failed")]
    Decrypt,

    /// Handshake record malformed
    #[error("handshake error: {0}")]
    Handshake(String),

    /// Handshake timestamp outside the acceptable window
    #[error("timestamp outside acceptable window")]
    TimestampSkew,

    /// Frame envelope malformed
    #[error("frame error: {0}")]
    Frame(String),

    /// Frame with a type byte this implementation does not know
    #[error("unknown frame type: 0x{0:02x}")]
    UnknownFrameType(u8),

    /// Request header malformed
    #[error("invalid request: {0}")]
    Request(String),

    /// No user with the presented ID
    #[error("user not found")]
    UserNotFound,

    /// User ID string is not a valid UUID
    #[error("invalid UUID")]
    InvalidUuid,

    /// No fallback entry matches the connection
    #[error("no fallback configured")]
    NoFallback,

    /// Fallback destination unreachable
    #[error("failed to connect to fallback: {0}")]
    FallbackConnect(std::io::Error),

    /// Network I/O error
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// Operation exceeded its deadline
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new cryptographic error
    pub fn crypto(msg: impl Into<String>) -> Self {
        Error::Crypto(msg.into())
    }

    /// Create a new handshake error
    pub fn handshake(msg: impl Into<String>) -> Self {
        Error::Handshake(msg.into())
    }

    /// Create a new frame error
    pub fn frame(msg: impl Into<String>) -> Self {
        Error::Frame(msg.into())
    }

    /// Create a new request error
    pub fn request(msg: impl Into<String>) -> Self {
        Error::Request(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Check whether this error indicates an authentication failure.
    ///
    /// Authentication failures are reported without positional detail so a
    /// probing peer learns nothing from the error surface.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::Decrypt | Error::UserNotFound)
    }

    /// Check whether this error closed the connection for policy reasons
    /// rather than malformed input.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(self, Error::TimestampSkew | Error::UserNotFound)
    }
}
