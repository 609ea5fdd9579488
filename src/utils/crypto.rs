//! # Frame Cipher
//!
//! The symmetric encryption boundary consumed by the framing core.
//!
//! The core requires an in-place, length-preserving, deterministic transform:
//! the deframer decrypts bytes `[2, L)` of an extracted frame without moving
//! them, and the outbound path encrypts a payload after the length prefix has
//! been written. A keystream cipher satisfies this exactly; an AEAD cannot,
//! since its tag changes the length.
//!
//! ## Security
//! - ChaCha20 keyed at construction; a fresh cipher instance per frame keeps
//!   the transform deterministic per the contract
//! - Key material can be generated with a cryptographically secure RNG via
//!   [`ChaChaFrameCipher::random`]

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;

/// In-place symmetric transform applied to frame payloads.
///
/// Implementations must be length-preserving and deterministic, with no side
/// effects beyond mutating the slice. `encrypt_in_place` and
/// `decrypt_in_place` must be inverses.
pub trait FrameCipher: Send + Sync + 'static {
    fn encrypt_in_place(&self, data: &mut [u8]);
    fn decrypt_in_place(&self, data: &mut [u8]);
}

/// ChaCha20 keystream cipher.
///
/// Encryption and decryption are the same XOR transform, so both sides of a
/// connection share one key. Every frame restarts the keystream, which keeps
/// the `decrypt(buffer, length, offset)` contract deterministic and
/// side-effect-free.
pub struct ChaChaFrameCipher {
    key: [u8; 32],
    nonce: [u8; 12],
}

impl ChaChaFrameCipher {
    /// Build a cipher from a pre-shared 32-byte key and a zero nonce.
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            key,
            nonce: [0u8; 12],
        }
    }

    /// Build a cipher from a pre-shared key and an explicit nonce.
    pub fn with_nonce(key: [u8; 32], nonce: [u8; 12]) -> Self {
        Self { key, nonce }
    }

    /// Generate a cipher with a fresh random key.
    pub fn random() -> Self {
        Self::new(rand::random())
    }

    fn apply(&self, data: &mut [u8]) {
        let mut cipher = ChaCha20::new(&self.key.into(), &self.nonce.into());
        cipher.apply_keystream(data);
    }
}

impl FrameCipher for ChaChaFrameCipher {
    fn encrypt_in_place(&self, data: &mut [u8]) {
        self.apply(data);
    }

    fn decrypt_in_place(&self, data: &mut [u8]) {
        self.apply(data);
    }
}

/// Identity transform: frames travel in the clear.
///
/// Useful for tests and for deployments that terminate encryption elsewhere.
pub struct PlaintextCipher;

impl FrameCipher for PlaintextCipher {
    fn encrypt_in_place(&self, _data: &mut [u8]) {}
    fn decrypt_in_place(&self, _data: &mut [u8]) {}
}
