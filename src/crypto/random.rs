//! Secure random number generation.
//!
//! Private keys, handshake nonces and padding bytes all come from the
//! operating system's entropy source. Morphing *sampling* may use a faster
//! non-cryptographic source; padding *contents* must not.

use rand::{CryptoRng, RngCore};
use rand_core::OsRng;

/// Cryptographically secure random number generator.
///
/// Wraps the OS-provided entropy source (/dev/urandom on Unix,
/// BCryptGenRandom on Windows).
pub struct SecureRandom;

impl SecureRandom {
    /// Fill a buffer with cryptographically secure random bytes.
    pub fn fill(dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }

    /// Generate a fixed-size array of random bytes.
    pub fn bytes<const N: usize>() -> [u8; N] {
        let mut buf = [0u8; N];
        OsRng.fill_bytes(&mut buf);
        buf
    }

    /// Get an RNG instance that implements CryptoRng.
    pub fn rng() -> impl RngCore + CryptoRng {
        OsRng
    }
}

/// Generate random padding of the specified length.
///
/// Padding bytes are indistinguishable from ciphertext to an observer, so
/// they come from the CSPRNG rather than a seeded generator.
pub fn random_padding(len: usize) -> Vec<u8> {
    let mut padding = vec![0u8; len];
    SecureRandom::fill(&mut padding);
    padding
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_produces_entropy() {
        let mut buf1 = [0u8; 32];
        let mut buf2 = [0u8; 32];

        SecureRandom::fill(&mut buf1);
        SecureRandom::fill(&mut buf2);

        assert!(!buf1.iter().all(|&b| b == 0));
        assert_ne!(buf1, buf2);
    }

    #[test]
    fn test_fixed_size_bytes() {
        let a: [u8; 16] = SecureRandom::bytes();
        let b: [u8; 16] = SecureRandom::bytes();
        assert_ne!(a, b);
    }

    #[test]
    fn test_random_padding_length() {
        let padding = random_padding(100);
        assert_eq!(padding.len(), 100);
        assert!(!padding.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_random_padding_empty() {
        assert!(random_padding(0).is_empty());
    }
}
