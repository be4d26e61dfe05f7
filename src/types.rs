//! Common type definitions for cipherpost.
//!
//! - [`ProviderType`]: identifies one of the three container formats
//! - [`Action`]: the request/response action tags used on the wire

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Identifies a provider variant.
///
/// The string forms (`legacy`, `aead`, `thirdParty`) are the identifiers
/// accepted in the `providerType` field of a request envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum ProviderType {
    /// AES Crypt v3 (`.aes`).
    #[default]
    #[strum(serialize = "legacy")]
    Legacy,

    /// PBKDF2 + AES-256-GCM raw container (`.enc`).
    #[strum(serialize = "aead")]
    Aead,

    /// age passphrase container (`.age`).
    #[strum(serialize = "thirdParty")]
    ThirdParty,
}

impl ProviderType {
    /// Returns the wire identifier.
    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// The action tag of a request or success response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Select (or confirm) the active provider.
    Init,

    /// Encrypt a payload with the active provider.
    Encrypt,

    /// Decrypt a payload with the active provider.
    Decrypt,
}

impl Action {
    /// Returns the wire tag.
    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_provider_type_identifiers() {
        assert_eq!(ProviderType::from_str("legacy").unwrap(), ProviderType::Legacy);
        assert_eq!(ProviderType::from_str("aead").unwrap(), ProviderType::Aead);
        assert_eq!(ProviderType::from_str("thirdParty").unwrap(), ProviderType::ThirdParty);
        assert!(ProviderType::from_str("age").is_err());
        assert!(ProviderType::from_str("LEGACY").is_err());
    }

    #[test]
    fn test_provider_type_roundtrip_through_display() {
        for kind in ProviderType::iter() {
            assert_eq!(ProviderType::from_str(&kind.to_string()).unwrap(), kind);
        }
    }

    #[test]
    fn test_default_provider_is_legacy() {
        assert_eq!(ProviderType::default(), ProviderType::Legacy);
    }

    #[test]
    fn test_action_tags() {
        assert_eq!(Action::Init.as_str(), "INIT");
        assert_eq!(Action::Encrypt.as_str(), "ENCRYPT");
        assert_eq!(Action::from_str("DECRYPT").unwrap(), Action::Decrypt);
        assert!(Action::from_str("decrypt").is_err());
    }
}
