use lazy_static::lazy_static;
use regex::Regex;

use super::IdentityError;
use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid");
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Both fields present and the email well formed. Runs before any provider
/// call.
pub fn credentials(email: &str, password: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || password.trim().is_empty() {
        return Err(AppError::validation("Please enter a valid email and password."));
    }
    email_format(email)?;
    Ok(())
}

pub fn email_format(email: &str) -> Result<(), IdentityError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(IdentityError::InvalidEmail)
    }
}

pub fn password_strength(password: &str) -> Result<(), IdentityError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(IdentityError::WeakPassword);
    }
    Ok(())
}

pub fn confirmation(value: &str, confirm: &str, what: &str) -> Result<(), AppError> {
    if value != confirm {
        return Err(AppError::validation(format!("{what} does not match confirmation.")));
    }
    Ok(())
}
