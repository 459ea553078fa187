//! Field validators for request bodies.
//!
//! Each returns the message shown to the user as an [`ApiError::BadRequest`].

use crate::ApiError;

/// Longest board name, task title or subtask title, in characters.
pub const MAX_TITLE_CHARS: usize = 50;

/// Checks a username: 5 to 15 ASCII letters and digits.
pub fn username(value: &str) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(ApiError::bad_request("Username cannot be empty."));
    }
    if len < 5 {
        return Err(ApiError::bad_request(
            "Username cannot be shorter than 5 characters.",
        ));
    }
    if len > 15 {
        return Err(ApiError::bad_request(
            "Username cannot be longer than 15 characters.",
        ));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::bad_request(
            "Username can contain only letters (a-z/A-Z) and digits (0-9).",
        ));
    }
    Ok(())
}

/// Checks a password: 8 to 64 characters with at least one letter and one
/// digit.
pub fn password(value: &str) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(ApiError::bad_request("Password cannot be empty."));
    }
    if len < 8 {
        return Err(ApiError::bad_request(
            "Password cannot be shorter than 8 characters.",
        ));
    }
    if len > 64 {
        return Err(ApiError::bad_request(
            "Password cannot be longer than 64 characters.",
        ));
    }
    if !value.chars().any(|c| c.is_alphabetic()) || !value.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request(
            "Password must contain at least one letter and one digit.",
        ));
    }
    Ok(())
}

/// Checks a title-like field. `field` names it in messages, e.g.
/// `"Task title"`.
pub fn title(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} cannot be empty.")));
    }
    if value.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::bad_request(format!(
            "{field} cannot be longer than {MAX_TITLE_CHARS} characters."
        )));
    }
    Ok(())
}
