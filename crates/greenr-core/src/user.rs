//! User account types.
//!
//! A user owns houses, items, commutes and questionnaire responses. Accounts
//! are never hard-deleted; profile and password changes advance `updated_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, error};

/// Maximum length of `user_name` and `first_name`.
pub const NAME_MAX: usize = 20;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:       Uuid,
  pub email:         String,
  /// Absent only on rows created before the column existed; every write path
  /// through [`NewUser`] supplies one.
  pub user_name:     Option<String>,
  pub first_name:    Option<String>,
  /// Argon2 PHC string, e.g. `$argon2id$v=19$…` — never a plaintext password.
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`crate::store::TrackerStore::create_user`] and `upsert_user`.
/// Identifier and timestamps are always assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:         String,
  pub user_name:     String,
  pub first_name:    Option<String>,
  pub password_hash: String,
}

impl NewUser {
  pub fn new(
    email: impl Into<String>,
    user_name: impl Into<String>,
    password_hash: impl Into<String>,
  ) -> Self {
    Self {
      email:         email.into(),
      user_name:     user_name.into(),
      first_name:    None,
      password_hash: password_hash.into(),
    }
  }

  /// Field-level validation, run by stores before touching the database so
  /// callers get a precise error rather than a raw CHECK failure.
  pub fn validate(&self) -> Result<()> {
    error::check_non_empty("email", &self.email)?;
    error::check_non_empty("user_name", &self.user_name)?;
    error::check_len("user_name", &self.user_name, NAME_MAX)?;
    if let Some(first) = &self.first_name {
      error::check_len("first_name", first, NAME_MAX)?;
    }
    error::check_non_empty("password_hash", &self.password_hash)?;
    Ok(())
  }
}
