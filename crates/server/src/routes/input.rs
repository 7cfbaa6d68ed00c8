//! Request field checks shared by the route modules. Failures are 422s.

use chrono::{DateTime, Utc};
use db::models::task::TaskPriority;
use utils::dates::parse_due_date;

use crate::error::ApiError;

/// A present, non-blank string of at most `max` characters.
pub fn required_text(field: &str, value: Option<String>, max: usize) -> Result<String, ApiError> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(v) => {
            max_len(field, &v, max)?;
            Ok(v)
        }
        None => Err(ApiError::Validation(format!("The {} field is required.", field))),
    }
}

pub fn max_len(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.chars().count() > max {
        return Err(ApiError::Validation(format!(
            "The {} field must not be greater than {} characters.",
            field, max
        )));
    }
    Ok(())
}

pub fn optional_max_len(field: &str, value: Option<&str>, max: usize) -> Result<(), ApiError> {
    match value {
        Some(v) => max_len(field, v, max),
        None => Ok(()),
    }
}

pub fn optional_date(field: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => parse_due_date(raw).map(Some).ok_or_else(|| {
            ApiError::Validation(format!("The {} field must be a valid date.", field))
        }),
        None => Ok(None),
    }
}

pub fn optional_priority(value: Option<&str>) -> Result<Option<TaskPriority>, ApiError> {
    match value {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ApiError::Validation("The selected priority is invalid.".to_string())),
        None => Ok(None),
    }
}

pub fn optional_hours(value: Option<i64>) -> Result<Option<i64>, ApiError> {
    match value {
        Some(hours) if hours < 1 => Err(ApiError::Validation(
            "The estimated_hours field must be at least 1.".to_string(),
        )),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_required_text_is_rejected() {
        assert!(required_text("title", Some("   ".to_string()), 255).is_err());
        assert!(required_text("title", None, 255).is_err());
        assert_eq!(
            required_text("title", Some("  Buy milk ".to_string()), 255).unwrap(),
            "Buy milk"
        );
    }

    #[test]
    fn length_counts_characters() {
        assert!(max_len("color", "#abcdef", 7).is_ok());
        assert!(max_len("color", "#abcdef0", 7).is_err());
        assert!(max_len("name", &"é".repeat(255), 255).is_ok());
    }

    #[test]
    fn dates_priority_and_hours() {
        assert!(optional_date("due_date", Some("2026-03-01")).unwrap().is_some());
        assert!(optional_date("due_date", Some("next week")).is_err());
        assert_eq!(optional_date("due_date", None).unwrap(), None);

        assert_eq!(optional_priority(Some("HIGH")).unwrap(), Some(TaskPriority::High));
        assert!(optional_priority(Some("urgent")).is_err());

        assert!(optional_hours(Some(0)).is_err());
        assert_eq!(optional_hours(Some(3)).unwrap(), Some(3));
    }
}
