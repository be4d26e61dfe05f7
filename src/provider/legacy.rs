//! Legacy provider: AES Crypt v3 streams.
//!
//! The stream format carries its own KDF iteration count, so files written
//! with other iteration counts (or by other AES Crypt tools) decrypt as long
//! as the count is within the accepted bound.

use crate::backend::{AesCrypt, AesCryptError};
use crate::error::ErrorCode;
use crate::secret::Secret;

/// AES Crypt v3 (`.aes`); everything is delegated to the codec.
#[derive(Clone, Debug)]
pub struct LegacyProvider {
    codec: AesCrypt,
}

impl LegacyProvider {
    /// Wraps a codec; new streams use the codec's iteration count.
    pub fn new(codec: AesCrypt) -> Self {
        Self { codec }
    }

    /// The password bound reported by the codec, in characters.
    pub const fn max_password_len(&self) -> usize {
        self.codec.max_password_len()
    }

    /// Encrypts `payload` into a complete AES Crypt v3 stream.
    ///
    /// # Errors
    ///
    /// Returns [`AesCryptError::Rng`] if fresh IVs or the session key cannot be
    /// generated.
    pub fn encrypt(&self, payload: &[u8], password: &Secret) -> Result<Vec<u8>, AesCryptError> {
        self.codec.encrypt(payload, password.expose_secret())
    }

    /// Recovers the plaintext of an AES Crypt v3 stream.
    ///
    /// # Errors
    ///
    /// - [`AesCryptError::WrongPassword`] when the session HMAC does not verify
    /// - [`AesCryptError::Tampered`] or [`AesCryptError::Padding`] when the
    ///   payload was modified
    /// - a format error for anything that is not a well-formed v3 stream
    pub fn decrypt(&self, payload: &[u8], password: &Secret) -> Result<Vec<u8>, AesCryptError> {
        self.codec.decrypt(payload, password.expose_secret())
    }
}

/// Maps a codec failure onto the shared taxonomy.
pub(super) fn error_code(error: &AesCryptError) -> ErrorCode {
    match error {
        AesCryptError::InvalidHeader | AesCryptError::UnsupportedVersion(_) | AesCryptError::Truncated | AesCryptError::InvalidIterations(_) => ErrorCode::InvalidFormat,
        AesCryptError::WrongPassword => ErrorCode::WrongPassword,
        AesCryptError::Tampered | AesCryptError::Padding => ErrorCode::CorruptedData,
        AesCryptError::Rng => ErrorCode::EncryptionFailed,
        AesCryptError::Cipher => ErrorCode::UnknownError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(error_code(&AesCryptError::InvalidHeader), ErrorCode::InvalidFormat);
        assert_eq!(error_code(&AesCryptError::UnsupportedVersion(2)), ErrorCode::InvalidFormat);
        assert_eq!(error_code(&AesCryptError::Truncated), ErrorCode::InvalidFormat);
        assert_eq!(error_code(&AesCryptError::InvalidIterations(0)), ErrorCode::InvalidFormat);
        assert_eq!(error_code(&AesCryptError::WrongPassword), ErrorCode::WrongPassword);
        assert_eq!(error_code(&AesCryptError::Tampered), ErrorCode::CorruptedData);
        assert_eq!(error_code(&AesCryptError::Padding), ErrorCode::CorruptedData);
        assert_eq!(error_code(&AesCryptError::Rng), ErrorCode::EncryptionFailed);
        assert_eq!(error_code(&AesCryptError::Cipher), ErrorCode::UnknownError);
    }

    #[test]
    fn test_reports_codec_password_bound() {
        assert_eq!(LegacyProvider::new(AesCrypt::new(1)).max_password_len(), 1024);
    }
}
