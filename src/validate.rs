//! Field checks applied to every request before any provider is touched.

/// User message for a payload that is not binary data.
pub const INVALID_FILE_DATA: &str = "Invalid file data";
/// User message for a missing or empty password.
pub const INVALID_PASSWORD: &str = "Invalid password";
/// User message for a missing or unsafe file name.
pub const INVALID_FILENAME: &str = "Invalid filename";
/// User message for an unknown provider identifier.
pub const INVALID_PROVIDER: &str = "Invalid provider type";
/// User message for an envelope that is not a tagged record.
pub const INVALID_MESSAGE: &str = "Invalid message format";
/// User message for an unknown action tag.
pub const INVALID_ACTION: &str = "Invalid action type";

/// Rejects empty passwords.
pub fn password(password: &str) -> Result<(), &'static str> {
    if password.is_empty() { Err(INVALID_PASSWORD) } else { Ok(()) }
}

/// Rejects names that could escape the output directory.
pub fn file_name(name: &str) -> Result<(), &'static str> {
    if name.contains("..") || name.contains('/') || name.contains('\\') { Err(INVALID_FILENAME) } else { Ok(()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password() {
        assert_eq!(password(""), Err(INVALID_PASSWORD));
        assert!(password(" ").is_ok());
        assert!(password("pw123").is_ok());
    }

    #[test]
    fn test_file_name_traversal() {
        assert_eq!(file_name("../etc/passwd"), Err(INVALID_FILENAME));
        assert_eq!(file_name("dir/report.txt"), Err(INVALID_FILENAME));
        assert_eq!(file_name(r"dir\report.txt"), Err(INVALID_FILENAME));
        assert_eq!(file_name("report..txt"), Err(INVALID_FILENAME));
        assert_eq!(file_name(".."), Err(INVALID_FILENAME));
    }

    #[test]
    fn test_file_name_accepted() {
        assert!(file_name("report.txt").is_ok());
        assert!(file_name(".hidden").is_ok());
        assert!(file_name("noext").is_ok());
        assert!(file_name("").is_ok());
    }
}
