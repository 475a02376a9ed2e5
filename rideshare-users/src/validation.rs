//! Field checks shared by registration, profile updates and emergency contacts.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::AccountError;

/// `local@domain.tld`, no whitespace and a single `@`.
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex")
});

/// `+`, a 1-3 digit country code, then a 10-digit number.
static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+[0-9]{11,13}$").expect("Invalid phone regex")
});

pub fn validate_email(email: &str) -> Result<(), AccountError> {
    if EMAIL.is_match(email) {
        Ok(())
    } else {
        Err(AccountError::Validation(format!("Invalid email address: {}", email)))
    }
}

pub fn validate_phone(phone: &str) -> Result<(), AccountError> {
    if PHONE.is_match(phone) {
        Ok(())
    } else {
        Err(AccountError::Validation(format!(
            "Invalid phone number {}: expected + followed by country code and 10 digits",
            phone
        )))
    }
}

/// Trimmed value, or a validation error naming the missing field.
pub fn required(value: Option<String>, field: &str) -> Result<String, AccountError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AccountError::Validation(format!("{} is required", field)))
}
