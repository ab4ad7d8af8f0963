//! Error type for `greenr-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] greenr_core::Error),

  /// A unique-key, CHECK, or foreign-key constraint rejected a statement.
  /// Kept separate from [`Error::Database`] so callers can tell a data
  /// conflict from an I/O failure.
  #[error("constraint violation: {0}")]
  Constraint(String),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("decimal parse error: {0}")]
  DecimalParse(String),

  /// A stored INTEGER does not fit the domain type, e.g. a negative count
  /// written by raw SQL.
  #[error("integer column out of range: {0}")]
  IntegerOutOfRange(String),

  #[error("user not found: {0}")]
  UserNotFound(uuid::Uuid),

  #[error("questionnaire not found: {0}")]
  QuestionnaireNotFound(uuid::Uuid),

  /// A `response_item` row where not exactly one answer column is set.
  /// Unreachable through this store; possible only via raw SQL that dodged
  /// the CHECK constraint.
  #[error("malformed answer row in response item {0}")]
  MalformedAnswer(uuid::Uuid),

  #[error("password reset token not found")]
  ResetTokenNotFound,

  #[error("password reset token expired")]
  ResetTokenExpired,

  #[error("password reset token already used")]
  ResetTokenUsed,

  #[error("refresh token not found")]
  RefreshTokenNotFound,

  #[error("refresh token already revoked")]
  RefreshTokenRevoked,
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    // Surface SQLite constraint failures as their own variant.
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
      code,
      ref message,
    )) = e
      && code.code == rusqlite::ErrorCode::ConstraintViolation
    {
      let detail = message.clone().unwrap_or_else(|| code.to_string());
      return Error::Constraint(detail);
    }
    Error::Database(e)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
