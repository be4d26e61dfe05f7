//! Provider variants.
//!
//! A provider binds the uniform capability set (encrypt, decrypt, info,
//! password validation, error normalization) to exactly one container format.
//! The set of formats is closed, so [`Provider`] is an enum: adding a variant
//! forces every match below, and the normalization table with it, to be updated.

use thiserror::Error;
use tracing::debug;

mod aead;
mod age;
mod legacy;

pub use aead::{AeadError, AeadProvider};
pub use age::AgeProvider;
pub use legacy::LegacyProvider;

use crate::backend::{AesCryptError, AgeError, Backends};
use crate::config::{AEAD_EXTENSION, AGE_EXTENSION, APP_VERSION, LEGACY_EXTENSION, MAX_PASSWORD_LENGTH};
use crate::error::{ErrorCode, NormalizedError};
use crate::secret::Secret;
use crate::types::ProviderType;

/// Static description of a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub version: &'static str,
    /// `None` when the format places no bound on passwords.
    pub max_password_length: Option<usize>,
    pub file_extension: &'static str,
    pub description: &'static str,
}

/// Raw failure of a provider operation, before normalization.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("password required")]
    PasswordRequired,

    #[error("password too long: {len} characters, maximum {max}")]
    PasswordTooLong { len: usize, max: usize },

    #[error("{0} backend not ready")]
    BackendUnavailable(ProviderType),

    #[error(transparent)]
    Legacy(#[from] AesCryptError),

    #[error(transparent)]
    Aead(#[from] AeadError),

    #[error(transparent)]
    Age(#[from] AgeError),
}

#[derive(Clone, Debug)]
pub enum Provider {
    Legacy(LegacyProvider),
    Aead(AeadProvider),
    Age(AgeProvider),
}

impl Provider {
    /// Constructs the provider for `kind` from the given engines.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::BackendUnavailable`] for the age variant while
    /// its engine has not finished loading. Readiness is polled, never awaited.
    pub fn new(kind: ProviderType, backends: &Backends) -> Result<Self, ProviderError> {
        match kind {
            ProviderType::Legacy => Ok(Self::Legacy(LegacyProvider::new(backends.aescrypt))),
            ProviderType::Aead => Ok(Self::Aead(AeadProvider)),
            ProviderType::ThirdParty => {
                if !backends.age.is_ready() {
                    debug!("age engine polled before load completed");
                    return Err(ProviderError::BackendUnavailable(kind));
                }
                Ok(Self::Age(AgeProvider::new(backends.age.clone())))
            }
        }
    }

    /// The wire identifier of this variant.
    pub fn kind(&self) -> ProviderType {
        match self {
            Self::Legacy(_) => ProviderType::Legacy,
            Self::Aead(_) => ProviderType::Aead,
            Self::Age(_) => ProviderType::ThirdParty,
        }
    }

    /// Static description, including the output file extension and the
    /// password bound enforced by [`Provider::validate_password`].
    pub fn info(&self) -> ProviderInfo {
        match self {
            Self::Legacy(legacy) => ProviderInfo {
                name: "AES Crypt",
                version: APP_VERSION,
                max_password_length: Some(legacy.max_password_len()),
                file_extension: LEGACY_EXTENSION,
                description: "AES Crypt v3 stream: AES-256-CBC with HMAC-SHA256, PBKDF2-HMAC-SHA512 key derivation",
            },
            Self::Aead(_) => ProviderInfo {
                name: "AES-256-GCM",
                version: APP_VERSION,
                max_password_length: Some(MAX_PASSWORD_LENGTH),
                file_extension: AEAD_EXTENSION,
                description: "Raw AES-256-GCM container keyed by PBKDF2-HMAC-SHA256 (100,000 iterations)",
            },
            Self::Age(_) => ProviderInfo {
                name: "age",
                version: APP_VERSION,
                max_password_length: None,
                file_extension: AGE_EXTENSION,
                description: "age v1 passphrase-encrypted file (scrypt recipient), binary encoding",
            },
        }
    }

    /// Checks a password against this provider's bounds.
    ///
    /// Length is counted in characters, not bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::PasswordRequired`] for an empty password and
    /// [`ProviderError::PasswordTooLong`] above the bound, if there is one.
    pub fn validate_password(&self, password: &Secret) -> Result<(), ProviderError> {
        if password.is_empty() {
            return Err(ProviderError::PasswordRequired);
        }

        if let Some(max) = self.info().max_password_length {
            let len = password.char_count();
            if len > max {
                return Err(ProviderError::PasswordTooLong { len, max });
            }
        }

        Ok(())
    }

    /// Encrypts `payload` into this provider's container format.
    ///
    /// The password is validated before the backend is called. Empty
    /// payloads are valid and produce a container of minimal size.
    ///
    /// # Errors
    ///
    /// Returns a password error from [`Provider::validate_password`], or the
    /// backend's failure wrapped in the matching [`ProviderError`] variant.
    /// Pass it to [`Provider::normalize_error`] before showing it to a user.
    pub fn encrypt(&self, payload: &[u8], password: &Secret) -> Result<Vec<u8>, ProviderError> {
        self.validate_password(password)?;

        match self {
            Self::Legacy(legacy) => Ok(legacy.encrypt(payload, password)?),
            Self::Aead(aead) => Ok(aead.encrypt(payload, password)?),
            Self::Age(age) => Ok(age.encrypt(payload, password)?),
        }
    }

    /// Recovers the plaintext of a container produced by this provider.
    ///
    /// Never returns unauthenticated plaintext: every format verifies a MAC
    /// or tag before output is produced.
    ///
    /// # Errors
    ///
    /// Returns a password error from [`Provider::validate_password`], or the
    /// backend's failure (wrong password, malformed container, modified
    /// data) wrapped in the matching [`ProviderError`] variant.
    pub fn decrypt(&self, payload: &[u8], password: &Secret) -> Result<Vec<u8>, ProviderError> {
        self.validate_password(password)?;

        match self {
            Self::Legacy(legacy) => Ok(legacy.decrypt(payload, password)?),
            Self::Aead(aead) => Ok(aead.decrypt(payload, password)?),
            Self::Age(age) => Ok(age.decrypt(payload, password)?),
        }
    }

    /// Maps a raw failure onto the shared taxonomy.
    ///
    /// The diagnostic text survives in `message`; `user_message` is the fixed
    /// template of the code.
    pub fn normalize_error(&self, error: &ProviderError) -> NormalizedError {
        let code = match error {
            ProviderError::PasswordRequired => ErrorCode::PasswordRequired,
            ProviderError::PasswordTooLong { .. } => ErrorCode::PasswordTooLong,
            ProviderError::BackendUnavailable(_) => ErrorCode::BackendUnavailable,
            ProviderError::Legacy(e) => legacy::error_code(e),
            ProviderError::Aead(e) => aead::error_code(e),
            ProviderError::Age(e) => age::error_code(e),
        };

        NormalizedError::new(code, error.to_string(), self.info().max_password_length)
    }
}

/// Normalizes a failure that happened before any provider existed, such as a
/// failed construction during a switch.
pub fn normalize_construction_error(kind: ProviderType, error: &ProviderError) -> NormalizedError {
    let code = match error {
        ProviderError::BackendUnavailable(_) => ErrorCode::BackendUnavailable,
        _ => ErrorCode::UnknownError,
    };
    let max = match kind {
        ProviderType::ThirdParty => None,
        ProviderType::Legacy | ProviderType::Aead => Some(MAX_PASSWORD_LENGTH),
    };
    NormalizedError::new(code, error.to_string(), max)
}
