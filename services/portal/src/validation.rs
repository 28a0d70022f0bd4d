//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Minimum length of a user password
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").ok());

    if !regex.as_ref().is_some_and(|r| r.is_match(username)) {
        return Err(
            "Username can only contain letters, numbers, dots, dashes and underscores".to_string(),
        );
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok());

    if !regex.as_ref().is_some_and(|r| r.is_match(email)) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate a JSONP callback name such as `cb` or `app.handlers.onData`
pub fn validate_callback(callback: &str) -> Result<(), String> {
    static CALLBACK_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex =
        CALLBACK_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$.]{0,127}$").ok());

    if !regex.as_ref().is_some_and(|r| r.is_match(callback)) {
        return Err("Invalid callback name".to_string());
    }

    Ok(())
}
