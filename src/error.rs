//! Error taxonomy shared by every provider.
//!
//! Backends report failures as typed enums; providers map those straight to an
//! [`ErrorCode`]. Opaque diagnostic text, which only some backends produce, is
//! classified by [`classify`] against a single keyword table. Whatever the path,
//! callers only ever see the fixed user message of the resulting code.

use std::fmt;

use strum::{Display, EnumIter, IntoStaticStr};

/// The fixed set of failure categories exposed to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    WrongPassword,
    PasswordRequired,
    PasswordTooLong,
    InvalidFormat,
    CorruptedData,
    EncryptionFailed,
    DecryptionFailed,
    BackendUnavailable,
    UnknownError,
}

impl ErrorCode {
    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Returns the user-facing message for this code.
    ///
    /// `max_password_len` is only interpolated into `PasswordTooLong`; providers
    /// without a bound never produce that code.
    pub fn user_message(self, max_password_len: Option<usize>) -> String {
        match self {
            Self::WrongPassword => "Incorrect password, or the file was not encrypted with this password.".to_owned(),
            Self::PasswordRequired => "A password is required.".to_owned(),
            Self::PasswordTooLong => match max_password_len {
                Some(max) => format!("Password is too long. The maximum length is {max} characters."),
                None => "Password is too long.".to_owned(),
            },
            Self::InvalidFormat => "This file is not a valid encrypted file for the selected format.".to_owned(),
            Self::CorruptedData => "The encrypted file is corrupted or has been modified.".to_owned(),
            Self::EncryptionFailed => "Encryption failed. Please try again.".to_owned(),
            Self::DecryptionFailed => "Decryption failed. The file may be damaged or unsupported.".to_owned(),
            Self::BackendUnavailable => "The encryption engine for this format is not ready yet. Please try again shortly.".to_owned(),
            Self::UnknownError => "An unexpected error occurred.".to_owned(),
        }
    }
}

/// A failure after normalization.
///
/// `message` is the diagnostic text, kept for local logging only.
/// `user_message` is the only part ever placed in a response envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedError {
    pub code: ErrorCode,
    pub message: String,
    pub user_message: String,
}

impl NormalizedError {
    pub fn new(code: ErrorCode, message: impl Into<String>, max_password_len: Option<usize>) -> Self {
        Self { code, message: message.into(), user_message: code.user_message(max_password_len) }
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for NormalizedError {}

/// Keyword table for opaque diagnostics. First match wins, so more specific
/// phrases sit above the generic ones.
const CLASSIFICATION: &[(&str, ErrorCode)] = &[
    ("not ready", ErrorCode::BackendUnavailable),
    ("not loaded", ErrorCode::BackendUnavailable),
    ("unavailable", ErrorCode::BackendUnavailable),
    ("password required", ErrorCode::PasswordRequired),
    ("passphrase required", ErrorCode::PasswordRequired),
    ("too long", ErrorCode::PasswordTooLong),
    ("incorrect password", ErrorCode::WrongPassword),
    ("wrong password", ErrorCode::WrongPassword),
    ("incorrect passphrase", ErrorCode::WrongPassword),
    ("no matching keys", ErrorCode::WrongPassword),
    ("failed to decrypt file key", ErrorCode::WrongPassword),
    ("header is invalid", ErrorCode::InvalidFormat),
    ("unknown format", ErrorCode::InvalidFormat),
    ("invalid header", ErrorCode::InvalidFormat),
    ("not an aes crypt", ErrorCode::InvalidFormat),
    ("unsupported version", ErrorCode::InvalidFormat),
    ("too short", ErrorCode::InvalidFormat),
    ("truncated", ErrorCode::InvalidFormat),
    ("header mac", ErrorCode::CorruptedData),
    ("corrupt", ErrorCode::CorruptedData),
    ("tamper", ErrorCode::CorruptedData),
    ("unexpected eof", ErrorCode::CorruptedData),
    ("decryption error", ErrorCode::CorruptedData),
    ("encrypt", ErrorCode::EncryptionFailed),
    ("decrypt", ErrorCode::DecryptionFailed),
];

/// Classifies opaque diagnostic text, case-insensitively.
///
/// Falls back to [`ErrorCode::UnknownError`] when nothing matches.
pub fn classify(diagnostic: &str) -> ErrorCode {
    let lowered = diagnostic.to_lowercase();
    CLASSIFICATION.iter().find(|(keyword, _)| lowered.contains(keyword)).map_or(ErrorCode::UnknownError, |&(_, code)| code)
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_codes_print_as_wire_identifiers() {
        assert_eq!(ErrorCode::WrongPassword.to_string(), "WRONG_PASSWORD");
        assert_eq!(ErrorCode::PasswordTooLong.as_str(), "PASSWORD_TOO_LONG");
        assert_eq!(ErrorCode::BackendUnavailable.as_str(), "BACKEND_UNAVAILABLE");
        assert_eq!(ErrorCode::UnknownError.as_str(), "UNKNOWN_ERROR");
    }

    #[test]
    fn test_every_code_has_a_message() {
        for code in ErrorCode::iter() {
            assert!(!code.user_message(Some(1024)).is_empty());
        }
    }

    #[test]
    fn test_password_too_long_interpolates_bound() {
        let message = ErrorCode::PasswordTooLong.user_message(Some(1024));
        assert!(message.contains("1024"));
    }

    #[test]
    fn test_normalized_error_keeps_diagnostic_out_of_user_message() {
        let error = NormalizedError::new(ErrorCode::UnknownError, "stack: frame 0x7ffe secret path /home/u", None);
        assert!(!error.user_message.contains("0x7ffe"));
        assert_eq!(error.user_message, ErrorCode::UnknownError.user_message(None));
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify("Incorrect Password"), ErrorCode::WrongPassword);
        assert_eq!(classify("HEADER IS INVALID"), ErrorCode::InvalidFormat);
    }

    #[test]
    fn test_classify_age_diagnostics() {
        assert_eq!(classify("Failed to decrypt file key"), ErrorCode::WrongPassword);
        assert_eq!(classify("No matching keys found"), ErrorCode::WrongPassword);
        assert_eq!(classify("Header is invalid"), ErrorCode::InvalidFormat);
        assert_eq!(classify("Unknown format"), ErrorCode::InvalidFormat);
        assert_eq!(classify("Header MAC is invalid"), ErrorCode::CorruptedData);
        assert_eq!(classify("failed to fill whole buffer: unexpected EOF"), ErrorCode::CorruptedData);
        assert_eq!(classify("decryption error"), ErrorCode::CorruptedData);
    }

    #[test]
    fn test_classify_legacy_diagnostics() {
        assert_eq!(classify("not an AES Crypt stream"), ErrorCode::InvalidFormat);
        assert_eq!(classify("unsupported version 2"), ErrorCode::InvalidFormat);
        assert_eq!(classify("stream truncated"), ErrorCode::InvalidFormat);
        assert_eq!(classify("payload tampered"), ErrorCode::CorruptedData);
    }

    #[test]
    fn test_classify_backend_readiness() {
        assert_eq!(classify("age engine not ready"), ErrorCode::BackendUnavailable);
    }

    #[test]
    fn test_classify_generic_operation_failures() {
        assert_eq!(classify("failed to encrypt buffer"), ErrorCode::EncryptionFailed);
        assert_eq!(classify("could not decrypt"), ErrorCode::DecryptionFailed);
    }

    #[test]
    fn test_classify_unknown_falls_back() {
        assert_eq!(classify("segfault in module 7"), ErrorCode::UnknownError);
        assert_eq!(classify(""), ErrorCode::UnknownError);
    }
}
