//! Authenticated Encryption with Associated Data (AEAD).
//!
//! ChaCha20-Poly1305 with counter-based nonces. The frame layer places a
//! little-endian 64-bit counter in the first 8 bytes of the 12-byte nonce;
//! the trailing 4 bytes stay zero. A counter is never reused under one key
//! within one direction, which is what makes replayed frames fail
//! authentication.

use chacha20poly1305::{
    aead::{Aead as AeadTrait, KeyInit, Payload},
    ChaCha20Poly1305,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::error::{Error, Result};

/// A symmetric key for AEAD operations. Zeroized when dropped.
#[derive(Clone, Debug, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AeadKey([u8; KEY_SIZE]);

impl AeadKey {
    /// Create a new AEAD key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw key bytes. Secret material, handle with care.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl AsRef<[u8]> for AeadKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A nonce for AEAD operations.
///
/// Must be unique per encryption under one key. The frame codec derives it
/// from a strictly increasing counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Build a nonce from a 64-bit frame counter.
    ///
    /// The counter occupies the first 8 bytes, little-endian; the remaining
    /// 4 bytes are zero.
    pub fn from_counter(counter: u64) -> Self {
        let mut nonce = [0u8; NONCE_SIZE];
        nonce[..8].copy_from_slice(&counter.to_le_bytes());
        Self(nonce)
    }

    /// Get the raw nonce bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// ChaCha20-Poly1305 AEAD cipher bound to one key.
pub struct Aead {
    cipher: ChaCha20Poly1305,
}

impl Aead {
    /// Create a new AEAD instance with the given key.
    pub fn new(key: &AeadKey) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(key.as_bytes().into()),
        }
    }

    /// Encrypt plaintext; returns ciphertext with the 16-byte tag appended.
    pub fn seal(&self, nonce: &Nonce, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let payload = Payload {
            msg: plaintext,
            aad,
        };

        self.cipher
            .encrypt(nonce.as_bytes().into(), payload)
            .map_err(|_| Error::crypto("encryption failed"))
    }

    /// Decrypt and authenticate ciphertext.
    ///
    /// Fails closed: any authentication failure discards the plaintext and
    /// returns the generic [`Error::Decrypt`].
    pub fn open(&self, nonce: &Nonce, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < TAG_SIZE {
            return Err(Error::Decrypt);
        }

        let payload = Payload {
            msg: ciphertext,
            aad,
        };

        self.cipher
            .decrypt(nonce.as_bytes().into(), payload)
            .map_err(|_| Error::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> AeadKey {
        let mut bytes = [0u8; KEY_SIZE];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        AeadKey::from_bytes(bytes)
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let aead = Aead::new(&test_key());
        let nonce = Nonce::from_counter(1);

        let plaintext = b"Hello, server!";
        let ciphertext = aead.seal(&nonce, plaintext, b"").unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + TAG_SIZE);

        let opened = aead.open(&nonce, &ciphertext, b"").unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_nonce_layout() {
        // Counter sits little-endian in the first 8 bytes, trailing 4 zero.
        let nonce = Nonce::from_counter(0x0102_0304_0506_0708);
        let bytes = nonce.as_bytes();
        assert_eq!(&bytes[..8], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[8..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sender = Aead::new(&test_key());
        let receiver = Aead::new(&AeadKey::from_bytes([0x42; KEY_SIZE]));
        let nonce = Nonce::from_counter(1);

        let ciphertext = sender.seal(&nonce, b"secret", b"").unwrap();
        assert!(matches!(
            receiver.open(&nonce, &ciphertext, b""),
            Err(Error::Decrypt)
        ));
    }

    #[test]
    fn test_wrong_nonce_fails() {
        let aead = Aead::new(&test_key());

        let ciphertext = aead.seal(&Nonce::from_counter(1), b"secret", b"").unwrap();
        assert!(aead.open(&Nonce::from_counter(2), &ciphertext, b"").is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let aead = Aead::new(&test_key());
        let nonce = Nonce::from_counter(7);

        let mut ciphertext = aead.seal(&nonce, b"secret data", b"").unwrap();
        ciphertext[3] ^= 0x01;

        assert!(matches!(aead.open(&nonce, &ciphertext, b""), Err(Error::Decrypt)));
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let aead = Aead::new(&test_key());
        // Shorter than the tag can never authenticate.
        assert!(aead.open(&Nonce::from_counter(1), &[0u8; 8], b"").is_err());
    }
}
