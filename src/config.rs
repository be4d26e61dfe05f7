//! Global Configuration Constants
//!
//! All container-format parameters used by the three providers live here,
//! together with the limits enforced on passwords and key-derivation work.
//!
//! ## Security Considerations
//!
//! - Salt and nonce sizes are fixed by the on-disk formats and must not change
//! - Iteration counts written by this crate are fixed; iteration counts read
//!   from untrusted containers are bounded to keep decryption from being used
//!   as a work amplifier

/// Application name recorded in the `CREATED_BY` extension of AES Crypt files.
pub const APP_NAME: &str = "cipherpost";

/// Crate version reported through `ProviderInfo`.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// === File extensions ===

/// Extension appended to files produced by the legacy (AES Crypt) provider.
pub const LEGACY_EXTENSION: &str = ".aes";

/// Extension appended to files produced by the AEAD provider.
pub const AEAD_EXTENSION: &str = ".enc";

/// Extension appended to files produced by the age provider.
pub const AGE_EXTENSION: &str = ".age";

// === Passwords ===

/// Upper bound on password length, in characters.
///
/// Shared by the legacy codec and the AEAD container. The age provider has no bound.
pub const MAX_PASSWORD_LENGTH: usize = 1024;

// === AEAD container parameters ===
// Layout: salt(16) || nonce(12) || ciphertext || tag(16)

/// Length of the PBKDF2 salt stored at the front of an AEAD container.
pub const AEAD_SALT_SIZE: usize = 16;

/// Length of the AES-GCM nonce that follows the salt.
pub const AEAD_NONCE_SIZE: usize = 12;

/// Length of the AES-GCM authentication tag appended to the ciphertext.
pub const AEAD_TAG_SIZE: usize = 16;

/// Length of the derived AES-256 key.
pub const AEAD_KEY_SIZE: usize = 32;

/// PBKDF2-HMAC-SHA256 iteration count used for AEAD containers.
pub const AEAD_KDF_ITERATIONS: u32 = 100_000;

/// Smallest byte length an AEAD container can have (salt + nonce).
///
/// Anything shorter is rejected before any key derivation is attempted.
pub const AEAD_MIN_CONTAINER: usize = AEAD_SALT_SIZE + AEAD_NONCE_SIZE;

// === AES Crypt v3 parameters ===

/// File magic of every AES Crypt stream.
pub const AESCRYPT_MAGIC: &[u8; 3] = b"AES";

/// The only AES Crypt stream version this codec reads and writes.
pub const AESCRYPT_VERSION: u8 = 0x03;

/// Block size of AES, also the IV size of both CBC layers.
pub const AESCRYPT_IV_SIZE: usize = 16;

/// Length of the AES-256 keys used by both CBC layers.
pub const AESCRYPT_KEY_SIZE: usize = 32;

/// Length of the encrypted session block (IV + key).
pub const AESCRYPT_SESSION_SIZE: usize = AESCRYPT_IV_SIZE + AESCRYPT_KEY_SIZE;

/// HMAC-SHA256 output length.
pub const AESCRYPT_MAC_SIZE: usize = 32;

/// Size of the zero-filled extension the reference tool reserves for later edits.
pub const AESCRYPT_RESERVED_EXTENSION: usize = 128;

/// PBKDF2-HMAC-SHA512 iterations written into new AES Crypt files.
pub const LEGACY_KDF_ITERATIONS: u32 = 300_000;

/// Largest iteration count accepted from an AES Crypt header.
pub const LEGACY_MAX_KDF_ITERATIONS: u32 = 5_000_000;
