use lazy_static::lazy_static;
use regex::Regex;

use super::dto::CreateUserRequest;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref PASSWORD_CHARSET_RE: Regex = Regex::new(r"^[A-Za-z\d@$!%*#?&]{8,}$").unwrap();
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// At least 8 characters from the allowed set, with a letter and a digit.
pub(crate) fn is_valid_password(password: &str) -> bool {
    PASSWORD_CHARSET_RE.is_match(password)
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Returns the first validation failure for a creation request.
pub fn validate_user_create(req: &CreateUserRequest) -> Result<(), String> {
    if blank(&req.username) {
        return Err("Username is required".into());
    }
    if blank(&req.email) {
        return Err("Email is required".into());
    }
    if req.password.as_deref().map_or(true, str::is_empty) {
        return Err("Password is required".into());
    }
    if !is_valid_email(&normalize_email(req.email.as_deref().unwrap_or_default())) {
        return Err("Invalid email format".into());
    }
    if !is_valid_password(req.password.as_deref().unwrap_or_default()) {
        return Err("Weak password".into());
    }
    Ok(())
}
