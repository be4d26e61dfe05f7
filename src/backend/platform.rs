//! Platform engine: PBKDF2-HMAC-SHA256 key derivation and AES-256-GCM.
//!
//! Raw primitives over byte buffers. Framing of the AEAD container lives in the
//! provider; this module only knows keys, nonces and tags.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::rand_core::{OsRng, TryRngCore};
use sha2::Sha256;
use thiserror::Error;

use crate::config::{AEAD_KEY_SIZE, AEAD_NONCE_SIZE};

#[derive(Debug, Error)]
pub enum PlatformError {
    /// Tag verification failed: wrong key or modified ciphertext.
    #[error("aes-gcm authentication failed")]
    Authentication,

    #[error("aes-gcm encryption failed")]
    Encryption,

    #[error("invalid key length")]
    KeyLength,

    #[error("rng failed: {0}")]
    Rng(String),
}

/// Derives a 256-bit key from a password and salt.
pub fn derive_key(password: &[u8], salt: &[u8], iterations: u32) -> [u8; AEAD_KEY_SIZE] {
    let mut key = [0u8; AEAD_KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);
    key
}

/// Encrypts `plaintext`, returning `ciphertext || tag`.
pub fn seal(key: &[u8; AEAD_KEY_SIZE], nonce: &[u8; AEAD_NONCE_SIZE], plaintext: &[u8]) -> Result<Vec<u8>, PlatformError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| PlatformError::KeyLength)?;
    cipher.encrypt(Nonce::from_slice(nonce), plaintext).map_err(|_| PlatformError::Encryption)
}

/// Decrypts `ciphertext || tag`.
///
/// Any tag mismatch is reported as [`PlatformError::Authentication`]; AES-GCM does
/// not distinguish a wrong key from a modified ciphertext.
pub fn open(key: &[u8; AEAD_KEY_SIZE], nonce: &[u8; AEAD_NONCE_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>, PlatformError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| PlatformError::KeyLength)?;
    cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|_| PlatformError::Authentication)
}

/// Fills a fixed-size array from the operating system RNG.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], PlatformError> {
    let mut bytes = [0u8; N];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| PlatformError::Rng(e.to_string()))?;
    Ok(bytes)
}
