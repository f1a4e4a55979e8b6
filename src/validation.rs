//! Small input checks shared by the request models.

use serde::{Deserialize, Deserializer};

use crate::error::AppError;

/// Trim a required text field and enforce a length limit (in characters).
pub fn required_text(field: &str, value: &str, max_len: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::invalid(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank input becomes `None`.
pub fn optional_text(
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> Result<Option<String>, AppError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(trimmed) if trimmed.chars().count() > max_len => Err(AppError::invalid(format!(
            "{field} must be at most {max_len} characters"
        ))),
        Some(trimmed) => Ok(Some(trimmed.to_string())),
    }
}

/// Apply a PATCH value to a nullable text column.
///
/// Absent keeps the current value, a blank string clears it.
pub fn patch_text(
    field: &str,
    current: Option<String>,
    patch: Option<String>,
    max_len: usize,
) -> Result<Option<String>, AppError> {
    match patch {
        None => Ok(current),
        Some(value) => optional_text(field, Some(value), max_len),
    }
}

/// Absolute http(s) URL, used for map images.
pub fn optional_http_url(field: &str, value: Option<String>) -> Result<Option<String>, AppError> {
    let Some(raw) = optional_text(field, value, 2048)? else {
        return Ok(None);
    };

    let parsed = url::Url::parse(&raw)
        .map_err(|_| AppError::invalid(format!("{field} must be an absolute URL")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(Some(raw)),
        _ => Err(AppError::invalid(format!("{field} must use http or https"))),
    }
}

pub fn in_range<T>(field: &str, value: T, min: T, max: T) -> Result<T, AppError>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if value < min || value > max {
        return Err(AppError::invalid(format!(
            "{field} must be between {min} and {max}"
        )));
    }
    Ok(value)
}

/// PATCH field that can be cleared: absent stays `None`, `null` becomes
/// `Some(None)`. Pair with `#[serde(default)]`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
