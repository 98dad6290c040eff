//! Cryptographic primitives for Reflex.
//!
//! This module provides:
//! - X25519 Elliptic Curve Diffie-Hellman key agreement
//! - HKDF-SHA256 session-key derivation
//! - ChaCha20-Poly1305 AEAD encryption with counter-based nonces
//! - Secure random number generation
//!
//! All secret material is zeroized on drop to prevent memory leakage.
//! The shared secret produced by key agreement is never treated as
//! authenticated by itself; authentication happens per-frame in the AEAD.

mod aead;
mod kdf;
mod keys;
mod random;

pub use aead::{Aead, AeadKey, Nonce};
pub use kdf::{derive_session_key, SessionKeys};
pub use keys::{EphemeralSecret, PublicKey, SharedSecret, StaticSecret};
pub use random::{random_padding, SecureRandom};

/// Size of symmetric keys in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of AEAD nonce in bytes (96 bits for ChaCha20-Poly1305)
pub const NONCE_SIZE: usize = 12;

/// Size of AEAD authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of X25519 public keys in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// HKDF info string for session-key derivation
pub const SESSION_INFO: &[u8] = b"reflex-session-v1";
