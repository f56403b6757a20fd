//! Input validation shared by the HTTP layer and the CLI.

use crate::{Error, Result};

/// Maximum length of a profile location, in characters.
pub const MAX_LOCATION_CHARS: usize = 80;

/// Maximum length of a username, in characters.
pub const MAX_USERNAME_CHARS: usize = 150;

/// Check that a username is usable as a single storage path segment.
///
/// Allowed: ASCII letters, digits and `_ . @ + -`, at most
/// [`MAX_USERNAME_CHARS`] long, and not `.` or `..`.
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(Error::Validation("username is required".into()));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(Error::Validation(format!(
            "username must be at most {MAX_USERNAME_CHARS} characters"
        )));
    }
    if username == "." || username == ".." {
        return Err(Error::Validation("username is reserved".into()));
    }
    let valid = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'));
    if !valid {
        return Err(Error::Validation(
            "username may only contain letters, digits and _ . @ + -".into(),
        ));
    }
    Ok(())
}

/// Normalize an optional location: trims it, maps blank to `None`, and
/// enforces [`MAX_LOCATION_CHARS`].
pub fn normalize_location(location: Option<&str>) -> Result<Option<String>> {
    let Some(location) = location.map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(None);
    };
    if location.chars().count() > MAX_LOCATION_CHARS {
        return Err(Error::Validation(format!(
            "location must be at most {MAX_LOCATION_CHARS} characters"
        )));
    }
    Ok(Some(location.to_string()))
}
