/**
 * Routes Module
 * API route handlers
 */
pub mod admin;
pub mod auth;
pub mod blog;
pub mod booking;
pub mod chat;
pub mod forms;
pub mod health;
pub mod logs;
pub mod portfolio;
pub mod rss;

use regex::Regex;

use crate::error::ApiError;

lazy_static::lazy_static! {
    /// Valid slug pattern: lowercase letters, numbers, and hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

pub(crate) fn validate_slug(slug: &str) -> Result<(), ApiError> {
    if is_valid_slug(slug) {
        Ok(())
    } else {
        Err(ApiError::validation(
            "Invalid slug: use only lowercase letters, numbers, and hyphens",
        ))
    }
}

/// Trimmed value, or `None` when missing or blank.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Owned counterpart of [`present`] for optional form fields.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
