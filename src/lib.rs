//! # Reflex
//!
//! A censorship-resistant proxy protocol. A client tunnels arbitrary TCP
//! traffic through a server; the wire image is engineered to resist both
//! passive and active detection.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Session Orchestrators                    │
//! │        (inbound / outbound state machines, relay)         │
//! ├──────────────────────────────────────────────────────────┤
//! │   Morphing Engine (profiles, padding, timed writes)       │
//! ├──────────────────────────────────────────────────────────┤
//! │   Frame Codec (length-prefixed AEAD, counter nonces)      │
//! ├──────────────────────────────────────────────────────────┤
//! │   Handshake Codec + Fallback Demultiplexer                │
//! ├──────────────────────────────────────────────────────────┤
//! │   Crypto Layer (X25519, HKDF-SHA256, ChaCha20-Poly1305)   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Goals
//!
//! 1. **Implicit handshake**: no protocol banner; beyond a 4-byte magic the
//!    opening bytes are indistinguishable from random.
//! 2. **Probe resistance**: non-Reflex connections and unknown users are
//!    transparently handed to a benign HTTP/TLS fallback back-end.
//! 3. **Forward secrecy**: fresh ephemeral X25519 keys on every connection.
//! 4. **Unobservability**: optional per-user traffic morphing shapes packet
//!    sizes and timing to mimic a cover application.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod codec;
pub mod crypto;
pub mod error;
pub mod fallback;
pub mod morphing;
pub mod server;
pub mod session;
pub mod validator;

pub use error::{Error, Result};

/// Default deadline for handshake completion (milliseconds).
pub const HANDSHAKE_TIMEOUT_MS: u64 = 10_000;
