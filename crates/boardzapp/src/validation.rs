//! Input checks shared by every write path.

use crate::error::{BoardzError, Result};
use crate::schedule::parse_reset_time;

/// Trims `value`; empty after trimming is an error naming `field`.
pub fn required_name(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BoardzError::validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

/// A foreign key that must be present and non-blank.
pub fn required_id<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(BoardzError::validation(format!("{} is required", field))),
    }
}

/// `HH:MM` in 24-hour time.
pub fn reset_time(value: Option<&str>) -> Result<()> {
    match value {
        Some(raw) if parse_reset_time(raw).is_none() => Err(BoardzError::validation(format!(
            "reset time '{}' is not HH:MM",
            raw
        ))),
        _ => Ok(()),
    }
}

/// Rejects the nested child collections older callers used to send.
pub fn no_nested<T>(field: &str, value: &Option<T>) -> Result<()> {
    if value.is_some() {
        return Err(BoardzError::validation(format!(
            "{} cannot be set here; manage them through their own operations",
            field
        )));
    }
    Ok(())
}
