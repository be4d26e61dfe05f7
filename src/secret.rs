use secrecy::{ExposeSecret, SecretString};

/// A password held in zeroize-on-drop storage.
pub struct Secret {
    inner: SecretString,
}

impl Secret {
    pub fn new(password: &str) -> Self {
        Self { inner: SecretString::from(password.to_owned()) }
    }

    pub fn from_string(password: String) -> Self {
        Self { inner: SecretString::from(password) }
    }

    pub fn expose_secret(&self) -> &str {
        self.inner.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }

    /// Length in characters, the unit password bounds are expressed in.
    pub fn char_count(&self) -> usize {
        self.inner.expose_secret().chars().count()
    }

    pub fn as_secret_string(&self) -> &SecretString {
        &self.inner
    }
}

impl Clone for Secret {
    fn clone(&self) -> Self {
        Self::new(self.expose_secret())
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_prints_password() {
        let secret = Secret::new("hunter2");
        assert!(!format!("{secret:?}").contains("hunter2"));
    }

    #[test]
    fn test_char_count_counts_characters() {
        assert_eq!(Secret::new("pässwörd").char_count(), 8);
        assert!(Secret::new("").is_empty());
    }
}
