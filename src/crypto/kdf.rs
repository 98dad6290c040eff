//! Session-key derivation.
//!
//! Uses HKDF-SHA256 to turn the raw X25519 shared secret into the symmetric
//! session key. Both peers call this with the same salt and arrive at the
//! same 32-byte key; the fixed info string `"reflex-session-v1"` domain-
//! separates the derivation from any other use of the shared secret.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{AeadKey, SharedSecret, KEY_SIZE, SESSION_INFO};
use crate::error::{Error, Result};

/// Derive the 32-byte session key from a shared secret.
///
/// `salt` is the derivation salt; the HKDF info string is fixed to
/// [`SESSION_INFO`]. Deterministic: the same shared secret and salt always
/// produce the same key, and different salts produce different keys.
pub fn derive_session_key(shared: &SharedSecret, salt: &[u8]) -> Result<[u8; KEY_SIZE]> {
    let hk = Hkdf::<Sha256>::new(Some(salt), shared.as_bytes());
    let mut session = [0u8; KEY_SIZE];
    hk.expand(SESSION_INFO, &mut session)
        .map_err(|_| Error::crypto("HKDF expansion failed"))?;
    Ok(session)
}

/// Key material for one connection.
///
/// Holds the raw X25519 output alongside the derived session key. Lives
/// exactly as long as the connection and is zeroized on drop; neither field
/// is ever persisted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    shared: [u8; KEY_SIZE],
    session: [u8; KEY_SIZE],
}

impl SessionKeys {
    /// Derive session keys from the shared secret with the given salt.
    pub fn derive(shared: &SharedSecret, salt: &[u8]) -> Result<Self> {
        Ok(Self {
            shared: *shared.as_bytes(),
            session: derive_session_key(shared, salt)?,
        })
    }

    /// The derived 32-byte session key.
    pub fn session(&self) -> &[u8; KEY_SIZE] {
        &self.session
    }

    /// The session key wrapped for AEAD construction.
    pub fn aead_key(&self) -> AeadKey {
        AeadKey::from_bytes(self.session)
    }
}
