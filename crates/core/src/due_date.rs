//! Due date expressions: `YYYY-MM-DD`, `nW` (weeks from today) or `nD` (days from today)

use chrono::{Days, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DueDateError {
    #[error("due date is empty")]
    Empty,
    #[error("invalid count in due date '{0}', expected a whole number before W or D")]
    InvalidCount(String),
    #[error("due date '{0}' is out of range")]
    OutOfRange(String),
    #[error("invalid due date '{0}', expected YYYY-MM-DD, nW or nD")]
    InvalidDate(String),
}

/// Resolve a due date expression against `today`.
///
/// A non-positive count (`0W`, `-1D`) is returned unchanged.
pub fn resolve_due_date(input: &str, today: NaiveDate) -> Result<String, DueDateError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DueDateError::Empty);
    }

    let relative = input
        .strip_suffix(['W', 'w'])
        .map(|count| (count, 7))
        .or_else(|| input.strip_suffix(['D', 'd']).map(|count| (count, 1)));

    if let Some((count, days_per_unit)) = relative {
        let count: i64 = count
            .trim()
            .parse()
            .map_err(|_| DueDateError::InvalidCount(input.to_string()))?;

        if count <= 0 {
            return Ok(input.to_string());
        }

        return (count as u64)
            .checked_mul(days_per_unit)
            .and_then(|days| today.checked_add_days(Days::new(days)))
            .map(|date| date.format(DATE_FORMAT).to_string())
            .ok_or_else(|| DueDateError::OutOfRange(input.to_string()));
    }

    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .map(|date| date.format(DATE_FORMAT).to_string())
        .map_err(|_| DueDateError::InvalidDate(input.to_string()))
}
