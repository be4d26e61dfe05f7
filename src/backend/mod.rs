//! Cryptographic engines the providers call into.
//!
//! - [`aescrypt`]: AES Crypt v3 codec (legacy format)
//! - [`platform`]: PBKDF2 + AES-256-GCM primitives
//! - [`age`]: age passphrase containers, loaded asynchronously

pub mod aescrypt;
pub mod age;
pub mod platform;

pub use aescrypt::{AesCrypt, AesCryptError};
pub use age::{AgeEngine, AgeError, ReadySignal};
pub use platform::PlatformError;

use crate::config::LEGACY_KDF_ITERATIONS;

/// The engines available to one dispatch context.
#[derive(Clone, Debug)]
pub struct Backends {
    pub aescrypt: AesCrypt,
    pub age: AgeEngine,
}

impl Backends {
    /// Production engines. Starts the age load in the background, so this must
    /// run inside a tokio runtime.
    pub fn load() -> Self {
        Self { aescrypt: AesCrypt::new(LEGACY_KDF_ITERATIONS), age: AgeEngine::load() }
    }

    /// Production engines without age. Nothing is started in the background.
    pub fn without_age() -> Self {
        Self { aescrypt: AesCrypt::new(LEGACY_KDF_ITERATIONS), age: AgeEngine::unavailable() }
    }

    pub fn new(aescrypt: AesCrypt, age: AgeEngine) -> Self {
        Self { aescrypt, age }
    }
}
