//! Auth-token records.
//!
//! Both tables hold opaque random strings keyed by value. Tokens are created,
//! checked once for validity, then marked used or revoked — never physically
//! removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single-use token for the password-reset flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetToken {
  pub token:      String,
  pub user_id:    Uuid,
  pub expires_at: DateTime<Utc>,
  pub used_at:    Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
  pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
    self.used_at.is_none() && now < self.expires_at
  }
}

/// A long-lived session token, revocable on logout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
  pub token:      String,
  pub user_id:    Uuid,
  pub expires_at: DateTime<Utc>,
  pub revoked_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}

impl RefreshToken {
  pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
    self.revoked_at.is_none() && now < self.expires_at
  }
}
