//! Handshake record encoding and decoding.
//!
//! Fixed big-endian layouts, no variable-length fields:
//!
//! ```text
//! ClientHandshake (76 B): magic(4) | pub(32) | user_id(16) | timestamp(8) | nonce(16)
//! ServerHandshake (40 B): pub(32) | timestamp(8)
//! ```
//!
//! The magic constant is the only plaintext structure on the wire; a
//! connection whose first four bytes differ is handed to the fallback
//! demultiplexer instead of being answered with an error.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Magic number opening a client handshake ("REFX" in ASCII).
pub const REFLEX_MAGIC: u32 = 0x5246_584C;

/// Size of an encoded client handshake in bytes.
pub const CLIENT_HANDSHAKE_SIZE: usize = 76;

/// Size of an encoded server handshake in bytes.
pub const SERVER_HANDSHAKE_SIZE: usize = 40;

/// Accepted clock skew between peers, in seconds.
///
/// Wide enough to absorb real-world clock drift, tight enough that a
/// captured handshake cannot be replayed much later.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 120;

/// The client's opening handshake record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHandshake {
    /// Client's ephemeral X25519 public key
    pub public_key: [u8; 32],
    /// User UUID bytes, looked up by the server's validator
    pub user_id: [u8; 16],
    /// Unix timestamp in seconds at send time
    pub timestamp: i64,
    /// Fresh random bytes, one value per connection
    pub nonce: [u8; 16],
}

impl ClientHandshake {
    /// Encode into the fixed 76-byte wire layout.
    pub fn encode(&self) -> [u8; CLIENT_HANDSHAKE_SIZE] {
        let mut buf = [0u8; CLIENT_HANDSHAKE_SIZE];
        buf[0..4].copy_from_slice(&REFLEX_MAGIC.to_be_bytes());
        buf[4..36].copy_from_slice(&self.public_key);
        buf[36..52].copy_from_slice(&self.user_id);
        buf[52..60].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[60..76].copy_from_slice(&self.nonce);
        buf
    }

    /// Decode from wire bytes.
    ///
    /// Fails with "packet too short" below 76 bytes and "invalid magic"
    /// when the opening constant does not match.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < CLIENT_HANDSHAKE_SIZE {
            return Err(Error::handshake("packet too short"));
        }

        let magic = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        if magic != REFLEX_MAGIC {
            return Err(Error::handshake("invalid magic"));
        }

        let mut public_key = [0u8; 32];
        public_key.copy_from_slice(&data[4..36]);
        let mut user_id = [0u8; 16];
        user_id.copy_from_slice(&data[36..52]);
        let timestamp = i64::from_be_bytes(data[52..60].try_into().expect("fixed slice"));
        let mut nonce = [0u8; 16];
        nonce.copy_from_slice(&data[60..76]);

        Ok(Self {
            public_key,
            user_id,
            timestamp,
            nonce,
        })
    }
}

/// The server's handshake response record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHandshake {
    /// Server's ephemeral X25519 public key
    pub public_key: [u8; 32],
    /// Unix timestamp in seconds at send time
    pub timestamp: i64,
}

impl ServerHandshake {
    /// Encode into the fixed 40-byte wire layout.
    pub fn encode(&self) -> [u8; SERVER_HANDSHAKE_SIZE] {
        let mut buf = [0u8; SERVER_HANDSHAKE_SIZE];
        buf[0..32].copy_from_slice(&self.public_key);
        buf[32..40].copy_from_slice(&self.timestamp.to_be_bytes());
        buf
    }

    /// Decode from wire bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < SERVER_HANDSHAKE_SIZE {
            return Err(Error::handshake("packet too short"));
        }

        let mut public_key = [0u8; 32];
        public_key.copy_from_slice(&data[0..32]);
        let timestamp = i64::from_be_bytes(data[32..40].try_into().expect("fixed slice"));

        Ok(Self {
            public_key,
            timestamp,
        })
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Check a handshake timestamp against the local clock.
///
/// Accepts `|now - timestamp| <= 120` seconds; the boundary itself is
/// accepted, one second past it is rejected.
pub fn validate_timestamp(timestamp: i64) -> bool {
    let diff = unix_now() - timestamp;
    diff.abs() <= TIMESTAMP_TOLERANCE_SECS
}
