//! Field rules for account and case forms.
//!
//! Every validator returns a human readable message on failure so callers
//! can collect all problems of a form at once.

use regex::Regex;
use std::sync::OnceLock;

use super::case::{CASE_ID_LEN, CASE_NAME_MAX_LEN};

pub const USERNAME_MIN_LEN: usize = 2;
pub const USERNAME_MAX_LEN: usize = 80;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 80;
const EMAIL_MAX_LEN: usize = 254;

fn email_regex() -> Option<&'static Regex> {
    static INSTANCE: OnceLock<Option<Regex>> = OnceLock::new();
    INSTANCE
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@.]+$").ok())
        .as_ref()
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("username is required".to_string());
    }

    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(format!(
            "username must be between {USERNAME_MIN_LEN} and {USERNAME_MAX_LEN} characters"
        ));
    }

    if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("username can only contain letters and numbers".to_string());
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("email is required".to_string());
    }

    let valid = email.len() <= EMAIL_MAX_LEN && email_regex().is_some_and(|re| re.is_match(email));
    if !valid {
        return Err(format!("'{email}' is not a valid email address"));
    }

    Ok(())
}

pub fn validate_password(password: &str, confirmation: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("password is required".to_string());
    }

    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(format!(
            "password must be between {PASSWORD_MIN_LEN} and {PASSWORD_MAX_LEN} characters"
        ));
    }

    if password != confirmation {
        return Err("passwords do not match".to_string());
    }

    Ok(())
}

/// Trims and upper-cases a receipt number, rejecting anything that is not
/// exactly 13 ASCII alphanumerics.
pub fn normalize_case_id(id: &str) -> Result<String, String> {
    let id = id.trim();

    if id.len() != CASE_ID_LEN || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(format!(
            "case number must be exactly {CASE_ID_LEN} letters and digits"
        ));
    }

    Ok(id.to_ascii_uppercase())
}

pub fn normalize_case_name(name: &str) -> Result<String, String> {
    let name = name.trim();

    if name.chars().count() > CASE_NAME_MAX_LEN {
        return Err(format!(
            "case name must be {CASE_NAME_MAX_LEN} characters or less"
        ));
    }

    if name.chars().any(char::is_control) {
        return Err("case name cannot contain control characters".to_string());
    }

    Ok(name.to_string())
}

/// Runs each check and keeps every failure message.
#[must_use]
pub fn collect_errors(checks: impl IntoIterator<Item = Result<(), String>>) -> Vec<String> {
    checks.into_iter().filter_map(Result::err).collect()
}
