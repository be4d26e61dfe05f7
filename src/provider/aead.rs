//! Raw AEAD container: `salt(16) || nonce(12) || ciphertext || tag(16)`.
//!
//! The key is PBKDF2-HMAC-SHA256 over the password and the stored salt,
//! 100,000 iterations, 256-bit output. The container carries no header, so a
//! wrong password and a modified file are indistinguishable; both fail the tag.

use thiserror::Error;

use crate::backend::PlatformError;
use crate::backend::platform::{derive_key, open, random_bytes, seal};
use crate::config::{AEAD_KDF_ITERATIONS, AEAD_MIN_CONTAINER, AEAD_NONCE_SIZE, AEAD_SALT_SIZE, AEAD_TAG_SIZE};
use crate::error::ErrorCode;
use crate::secret::Secret;

#[derive(Debug, Error)]
pub enum AeadError {
    #[error("container too short: {0} bytes")]
    TooShort(usize),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Raw AES-256-GCM containers (`.enc`). Stateless; every call draws a fresh
/// salt and nonce.
#[derive(Clone, Copy, Debug, Default)]
pub struct AeadProvider;

impl AeadProvider {
    /// Encrypts `payload` into `salt || nonce || ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// Returns [`AeadError::Platform`] if the RNG or the cipher fails.
    pub fn encrypt(self, payload: &[u8], password: &Secret) -> Result<Vec<u8>, AeadError> {
        let salt: [u8; AEAD_SALT_SIZE] = random_bytes()?;
        let nonce: [u8; AEAD_NONCE_SIZE] = random_bytes()?;
        let key = derive_key(password.expose_secret().as_bytes(), &salt, AEAD_KDF_ITERATIONS);

        let sealed = seal(&key, &nonce, payload)?;

        let mut out = Vec::with_capacity(AEAD_MIN_CONTAINER + sealed.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Splits a container at fixed offsets and opens it.
    ///
    /// # Errors
    ///
    /// - [`AeadError::TooShort`] below 28 bytes, before any key derivation
    /// - [`PlatformError::Authentication`] (wrapped) when the tag does not verify
    pub fn decrypt(self, payload: &[u8], password: &Secret) -> Result<Vec<u8>, AeadError> {
        // Checked before any key derivation.
        if payload.len() < AEAD_MIN_CONTAINER {
            return Err(AeadError::TooShort(payload.len()));
        }

        let (salt, rest) = payload.split_at(AEAD_SALT_SIZE);
        let (nonce, sealed) = rest.split_at(AEAD_NONCE_SIZE);
        let nonce: &[u8; AEAD_NONCE_SIZE] = nonce.try_into().map_err(|_| AeadError::TooShort(payload.len()))?;

        let key = derive_key(password.expose_secret().as_bytes(), salt, AEAD_KDF_ITERATIONS);
        Ok(open(&key, nonce, sealed)?)
    }

    /// Exact container size for a payload of `len` bytes.
    pub const fn container_len(len: usize) -> usize {
        AEAD_MIN_CONTAINER + len + AEAD_TAG_SIZE
    }
}

/// Tag failures read as a wrong password; the format cannot tell them apart
/// from modified data.
pub(super) fn error_code(error: &AeadError) -> ErrorCode {
    match error {
        AeadError::TooShort(_) => ErrorCode::InvalidFormat,
        AeadError::Platform(PlatformError::Authentication) => ErrorCode::WrongPassword,
        AeadError::Platform(PlatformError::Encryption | PlatformError::Rng(_)) => ErrorCode::EncryptionFailed,
        AeadError::Platform(PlatformError::KeyLength) => ErrorCode::UnknownError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_layout() {
        let password = Secret::new("pw123");
        let sealed = AeadProvider.encrypt(b"hello", &password).unwrap();
        assert_eq!(sealed.len(), 49);
        assert_eq!(sealed.len(), AeadProvider::container_len(5));
        assert_eq!(AeadProvider.decrypt(&sealed, &password).unwrap(), b"hello");
    }

    #[test]
    fn test_salt_and_nonce_are_fresh() {
        let password = Secret::new("pw");
        let a = AeadProvider.encrypt(b"same", &password).unwrap();
        let b = AeadProvider.encrypt(b"same", &password).unwrap();
        assert_ne!(a[..AEAD_MIN_CONTAINER], b[..AEAD_MIN_CONTAINER]);
    }

    #[test]
    fn test_too_short_container() {
        let password = Secret::new("pw");
        assert!(matches!(AeadProvider.decrypt(&[0u8; 27], &password), Err(AeadError::TooShort(27))));
        assert!(matches!(AeadProvider.decrypt(&[], &password), Err(AeadError::TooShort(0))));
    }

    #[test]
    fn test_minimum_container_without_tag_fails_authentication() {
        let password = Secret::new("pw");
        let result = AeadProvider.decrypt(&[0u8; AEAD_MIN_CONTAINER], &password);
        assert!(matches!(result, Err(AeadError::Platform(PlatformError::Authentication))));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(error_code(&AeadError::TooShort(3)), ErrorCode::InvalidFormat);
        assert_eq!(error_code(&AeadError::Platform(PlatformError::Authentication)), ErrorCode::WrongPassword);
        assert_eq!(error_code(&AeadError::Platform(PlatformError::Encryption)), ErrorCode::EncryptionFailed);
        assert_eq!(error_code(&AeadError::Platform(PlatformError::Rng("entropy".into()))), ErrorCode::EncryptionFailed);
        assert_eq!(error_code(&AeadError::Platform(PlatformError::KeyLength)), ErrorCode::UnknownError);
    }
}
