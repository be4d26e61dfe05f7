//! Third-party provider: age passphrase files.
//!
//! Only constructed once the engine reports ready; see
//! [`Provider::new`](super::Provider::new).

use std::io::ErrorKind;

use crate::backend::{AgeEngine, AgeError};
use crate::error::{ErrorCode, classify};
use crate::secret::Secret;

/// age passphrase containers (`.age`), always written in binary form.
#[derive(Clone, Debug)]
pub struct AgeProvider {
    engine: AgeEngine,
}

impl AgeProvider {
    /// Binds the provider to a loaded engine.
    pub fn new(engine: AgeEngine) -> Self {
        Self { engine }
    }

    /// Encrypts `payload` to a binary (unarmored) age file with an scrypt
    /// recipient.
    ///
    /// # Errors
    ///
    /// Returns [`AgeError::NotReady`] if the engine lost readiness, or
    /// [`AgeError::Encrypt`] if the age writer fails.
    pub fn encrypt(&self, payload: &[u8], password: &Secret) -> Result<Vec<u8>, AgeError> {
        self.engine.encrypt_with_passphrase(password.as_secret_string(), payload, false)
    }

    /// Decrypts a binary or armored passphrase-encrypted age file.
    ///
    /// # Errors
    ///
    /// Returns [`AgeError::NotPassphrase`] for files encrypted to keys, and
    /// [`AgeError::Decrypt`] or [`AgeError::Payload`] with age's own reason
    /// otherwise.
    pub fn decrypt(&self, payload: &[u8], password: &Secret) -> Result<Vec<u8>, AgeError> {
        self.engine.decrypt_with_passphrase(password.as_secret_string(), payload)
    }
}

/// Maps an engine failure onto the shared taxonomy, keyed on age's typed
/// errors; free text is classified only for untyped I/O failures.
pub(super) fn error_code(error: &AgeError) -> ErrorCode {
    match error {
        AgeError::NotReady => ErrorCode::BackendUnavailable,
        AgeError::NotPassphrase => ErrorCode::InvalidFormat,
        AgeError::Encrypt(_) => ErrorCode::EncryptionFailed,
        AgeError::Payload(e) => match e.kind() {
            ErrorKind::InvalidData | ErrorKind::UnexpectedEof => ErrorCode::CorruptedData,
            _ => classify(&e.to_string()),
        },
        AgeError::Decrypt(e) => decrypt_error_code(e),
    }
}

fn decrypt_error_code(error: &age::DecryptError) -> ErrorCode {
    use age::DecryptError;

    match error {
        // The scrypt stanza is the only key material in a passphrase file,
        // so failing to unwrap it means the passphrase is wrong.
        DecryptError::DecryptionFailed | DecryptError::KeyDecryptionFailed | DecryptError::NoMatchingKeys => ErrorCode::WrongPassword,
        DecryptError::InvalidHeader | DecryptError::UnknownFormat => ErrorCode::InvalidFormat,
        DecryptError::InvalidMac => ErrorCode::CorruptedData,
        DecryptError::ExcessiveWork { .. } => ErrorCode::DecryptionFailed,
        DecryptError::Io(e) if matches!(e.kind(), ErrorKind::UnexpectedEof) => ErrorCode::InvalidFormat,
        other => classify(&other.to_string()),
    }
}
