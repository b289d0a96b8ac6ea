//! Form checks run before a request leaves the client. Stricter than the
//! server, which only insists on a title.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

use super::api::{NewAccount, PollutionDraft};
use crate::pollutions::dto::observation_date;

lazy_static! {
    static ref STRICT_EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

const MIN_USERNAME_CHARS: usize = 3;
const MIN_TITLE_CHARS: usize = 3;
const MIN_DESCRIPTION_CHARS: usize = 10;
const MIN_PASSWORD_CHARS: usize = 8;

pub fn validate_pollution(draft: &PollutionDraft) -> Result<(), String> {
    if draft.titre.trim().chars().count() < MIN_TITLE_CHARS {
        return Err(format!("Title must be at least {MIN_TITLE_CHARS} characters"));
    }
    if draft.type_pollution.is_none() {
        return Err("Pollution type is required".into());
    }
    if draft.description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
        return Err(format!(
            "Description must be at least {MIN_DESCRIPTION_CHARS} characters"
        ));
    }
    if draft.date_observation.trim().is_empty() {
        return Err("Observation date is required".into());
    }
    if observation_date::parse(draft.date_observation.trim()).is_err() {
        return Err("Invalid observation date".into());
    }
    if draft.lieu.trim().is_empty() {
        return Err("Location is required".into());
    }
    if !in_range(draft.longitude, 180) {
        return Err("Longitude must be between -180 and 180".into());
    }
    if !in_range(draft.latitude, 90) {
        return Err("Latitude must be between -90 and 90".into());
    }
    Ok(())
}

fn in_range(value: Decimal, bound: i64) -> bool {
    let bound = Decimal::from(bound);
    value >= -bound && value <= bound
}

/// At least 8 characters with an uppercase letter, a lowercase letter, a
/// digit and a symbol.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_CHARS
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

/// ASCII local part and domain, with an alphabetic TLD of two or more letters.
pub fn is_strict_email(email: &str) -> bool {
    STRICT_EMAIL_RE.is_match(email)
}

pub fn validate_account(account: &NewAccount) -> Result<(), String> {
    let username = account.username.trim();
    if username.is_empty() {
        return Err("Username is required".into());
    }
    if username.chars().count() < MIN_USERNAME_CHARS {
        return Err(format!(
            "Username must be at least {MIN_USERNAME_CHARS} characters"
        ));
    }
    if !is_strict_email(account.email.trim()) {
        return Err("Invalid email format".into());
    }
    if !is_strong_password(&account.password) {
        return Err("Password must be at least 8 characters with upper and lower case letters, a digit and a symbol".into());
    }
    Ok(())
}
