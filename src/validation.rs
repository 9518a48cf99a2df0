// Validation utilities module
// Custom validation functions for domain-specific rules

use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("username pattern is valid"))
}

/// Validates that a username only uses letters, digits, `_`, `.` and `-`
///
/// `@` is excluded so a login identifier can never be both a username and an email.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username_pattern().is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username_characters"))
    }
}

/// Validates every option of a question: 1 to 255 characters each
pub fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options
        .iter()
        .all(|option| (1..=255).contains(&option.chars().count()))
    {
        Ok(())
    } else {
        Err(ValidationError::new("option_length_out_of_range"))
    }
}

/// Validates that an answer value is present (JSON null counts as missing)
pub fn validate_answer_value(value: &serde_json::Value) -> Result<(), ValidationError> {
    if value.is_null() {
        Err(ValidationError::new("answer_value_required"))
    } else {
        Ok(())
    }
}
