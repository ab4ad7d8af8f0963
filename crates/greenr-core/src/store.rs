//! The `TrackerStore` trait.
//!
//! Implemented by storage backends (e.g. `greenr-store-sqlite`). Higher
//! layers — the admin CLI today, an API server later — depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::Duration;
use uuid::Uuid;

use crate::{
  footprint::{Commute, House, Item, NewCommute, NewHouse, NewItem},
  questionnaire::{
    NewQuestionnaire, NewResponse, Questionnaire, Response, ResponseItem,
  },
  token::{PasswordResetToken, RefreshToken},
  user::{NewUser, User},
};

/// Abstraction over a greenr storage backend.
///
/// Writes are plain inserts except where an operation names its own
/// transaction semantics (questionnaire chaining, publish, submit, token
/// consumption). All methods return `Send` futures so the trait can be used
/// from multi-threaded async runtimes.
pub trait TrackerStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a new account. Fails on duplicate email or user name.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Insert-or-update keyed on the unique email: mutable fields are
  /// updated, `user_id` and `created_at` are preserved, `updated_at`
  /// advances. Used by seeding so re-runs are safe.
  fn upsert_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Replace a user's password hash and advance `updated_at`.
  fn update_password(
    &self,
    user_id: Uuid,
    password_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Houses / items / commutes ─────────────────────────────────────────

  fn add_house(
    &self,
    user_id: Uuid,
    input: NewHouse,
  ) -> impl Future<Output = Result<House, Self::Error>> + Send + '_;

  fn list_houses(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<House>, Self::Error>> + Send + '_;

  fn add_item(
    &self,
    user_id: Uuid,
    input: NewItem,
  ) -> impl Future<Output = Result<Item, Self::Error>> + Send + '_;

  fn list_items(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Item>, Self::Error>> + Send + '_;

  fn add_commute(
    &self,
    user_id: Uuid,
    input: NewCommute,
  ) -> impl Future<Output = Result<Commute, Self::Error>> + Send + '_;

  fn list_commutes(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Commute>, Self::Error>> + Send + '_;

  // ── Questionnaires ────────────────────────────────────────────────────

  /// Create a questionnaire version. With `supersedes_id` set this becomes
  /// the next version of that document (predecessor gets `replaced_by_id`
  /// stamped and is demoted from active to inactive); otherwise a new
  /// version is appended to the canonical group, starting at 1.
  fn create_questionnaire(
    &self,
    input: NewQuestionnaire,
  ) -> impl Future<Output = Result<Questionnaire, Self::Error>> + Send + '_;

  fn get_questionnaire(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Questionnaire>, Self::Error>> + Send + '_;

  /// All questionnaire versions, newest first.
  fn list_questionnaires(
    &self,
  ) -> impl Future<Output = Result<Vec<Questionnaire>, Self::Error>> + Send + '_;

  /// Every version in one canonical group, in version order.
  fn list_versions(
    &self,
    canonical_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Questionnaire>, Self::Error>> + Send + '_;

  /// The version currently offered for submission, if any.
  fn active_questionnaire(
    &self,
    canonical_id: Uuid,
  ) -> impl Future<Output = Result<Option<Questionnaire>, Self::Error>> + Send + '_;

  /// Activate one version and demote any other active version in the same
  /// canonical group; keeps "at most one active" true.
  fn publish_questionnaire(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Questionnaire, Self::Error>> + Send + '_;

  // ── Responses ─────────────────────────────────────────────────────────

  /// Record a submission: the response row plus one `ResponseItem` per
  /// answer, atomically. The store denormalises the questionnaire's
  /// canonical id and hashes its definition.
  fn submit_response(
    &self,
    input: NewResponse,
  ) -> impl Future<Output = Result<Response, Self::Error>> + Send + '_;

  fn get_response(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Response>, Self::Error>> + Send + '_;

  fn response_items(
    &self,
    response_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ResponseItem>, Self::Error>> + Send + '_;

  /// All responses across every version of one canonical group, newest
  /// first — reads the denormalised column, no join.
  fn list_responses(
    &self,
    canonical_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Response>, Self::Error>> + Send + '_;

  // ── Tokens ────────────────────────────────────────────────────────────

  fn create_password_reset_token(
    &self,
    user_id: Uuid,
    ttl: Duration,
  ) -> impl Future<Output = Result<PasswordResetToken, Self::Error>> + Send + '_;

  /// Validate a reset token and apply the new password hash atomically.
  /// Unknown, expired, and already-used tokens are distinct errors.
  fn consume_password_reset_token(
    &self,
    token: String,
    new_password_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn create_refresh_token(
    &self,
    user_id: Uuid,
    ttl: Duration,
  ) -> impl Future<Output = Result<RefreshToken, Self::Error>> + Send + '_;

  fn get_refresh_token<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<RefreshToken>, Self::Error>> + Send + 'a;

  /// Mark a refresh token revoked. Revoking twice is an error.
  fn revoke_refresh_token<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<RefreshToken, Self::Error>> + Send + 'a;
}
