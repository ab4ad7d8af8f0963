//! Error types for `greenr-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("questionnaire not found: {0}")]
  QuestionnaireNotFound(Uuid),

  #[error("response not found: {0}")]
  ResponseNotFound(Uuid),

  /// A bounded text field exceeded its maximum length.
  #[error("{field} exceeds {max} characters")]
  FieldTooLong { field: &'static str, max: usize },

  #[error("{field} must not be empty")]
  FieldEmpty { field: &'static str },

  #[error("unknown questionnaire status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown commute mode: {0:?}")]
  UnknownCommuteMode(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reject values longer than `max` characters. Length is counted in Unicode
/// scalar values, matching what the schema CHECK constraints count.
pub(crate) fn check_len(
  field: &'static str,
  value: &str,
  max: usize,
) -> Result<()> {
  if value.chars().count() > max {
    return Err(Error::FieldTooLong { field, max });
  }
  Ok(())
}

pub(crate) fn check_non_empty(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::FieldEmpty { field });
  }
  Ok(())
}
