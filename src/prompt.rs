//! Interactive password entry for the file commands.

use anyhow::{Context, Result};
use inquire::{Password, PasswordDisplayMode, required};

use crate::secret::Secret;

/// Prompts for an encryption password, asking twice so typos are caught
/// before anything is sealed.
pub fn encryption_password() -> Result<Secret> {
    Password::new("Encryption password:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_validator(required!("password cannot be empty"))
        .with_custom_confirmation_message("Confirm password:")
        .with_custom_confirmation_error_message("passwords do not match")
        .prompt()
        .map(Secret::from_string)
        .context("password input failed")
}

pub fn decryption_password() -> Result<Secret> {
    Password::new("Decryption password:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_validator(required!("password cannot be empty"))
        .without_confirmation()
        .prompt()
        .map(Secret::from_string)
        .context("password input failed")
}
