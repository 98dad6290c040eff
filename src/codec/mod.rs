//! Wire codecs for the Reflex protocol.
//!
//! Two layers share this module:
//!
//! 1. **Handshake records**: fixed-layout, big-endian, sent in the clear.
//!    The client record opens with the protocol magic; everything after it
//!    is indistinguishable from random bytes to a passive observer.
//! 2. **Frames**: length-prefixed ChaCha20-Poly1305 envelopes with a
//!    counter-based nonce, carrying all post-handshake traffic.

mod frame;
mod handshake;

pub use frame::{Frame, FrameDecoder, FrameEncoder, FrameType, MAX_FRAME_PAYLOAD};
pub use handshake::{
    unix_now, validate_timestamp, ClientHandshake, ServerHandshake, CLIENT_HANDSHAKE_SIZE,
    REFLEX_MAGIC, SERVER_HANDSHAKE_SIZE, TIMESTAMP_TOLERANCE_SECS,
};
