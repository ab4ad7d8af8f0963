//! Versioned questionnaire documents and the responses submitted against
//! them.
//!
//! A questionnaire row is one immutable version. All versions of "the same"
//! survey share a `canonical_id`; `supersedes_id` / `replaced_by_id` form a
//! doubly-linked chain through the group, and `version` counts up from 1.
//! At most one version of a group is active at a time — enforced by the
//! publish operation, not by the schema.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, error};

/// Maximum length of a questionnaire title.
pub const TITLE_MAX: usize = 200;

/// Fixed scale of numeric answers; decimal(18,4). Both the normalised
/// `response_item` column and the denormalised `answers_json` blob store
/// numerics at this scale, so the two representations always agree.
pub const ANSWER_SCALE: u32 = 4;

// ─── Questionnaire ───────────────────────────────────────────────────────────

/// Lifecycle state of one questionnaire version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionnaireStatus {
  /// Being authored; not yet offered to respondents.
  #[default]
  Draft,
  /// The version currently offered for submission.
  Active,
  /// Retired, usually because a newer version replaced it.
  Inactive,
}

/// One version of a survey document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Questionnaire {
  /// Version-specific identifier.
  pub id:              Uuid,
  /// Stable identity shared by every version of this survey.
  pub canonical_id:    Uuid,
  /// Counts up from 1 within the canonical group.
  pub version:         u32,
  pub title:           String,
  /// The survey definition as raw JSON; question identifiers inside it are
  /// what `ResponseItem::question_id` refers to.
  pub definition_json: String,
  pub status:          QuestionnaireStatus,
  /// The version this one replaced, if any.
  pub supersedes_id:   Option<Uuid>,
  /// The version that replaced this one, if any.
  pub replaced_by_id:  Option<Uuid>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// Input to [`crate::store::TrackerStore::create_questionnaire`].
///
/// Set `supersedes_id` to create the next version of an existing document;
/// the store inherits the predecessor's canonical id and bumps the version.
/// Otherwise a fresh canonical group is started (or joined, when
/// `canonical_id` is given explicitly).
#[derive(Debug, Clone)]
pub struct NewQuestionnaire {
  pub title:           String,
  pub definition_json: String,
  pub status:          QuestionnaireStatus,
  pub canonical_id:    Option<Uuid>,
  pub supersedes_id:   Option<Uuid>,
}

impl NewQuestionnaire {
  pub fn new(
    title: impl Into<String>,
    definition_json: impl Into<String>,
  ) -> Self {
    Self {
      title:           title.into(),
      definition_json: definition_json.into(),
      status:          QuestionnaireStatus::default(),
      canonical_id:    None,
      supersedes_id:   None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    error::check_non_empty("title", &self.title)?;
    error::check_len("title", &self.title, TITLE_MAX)?;
    // Definitions must at least parse; their schema is the frontend's
    // business.
    serde_json::from_str::<serde_json::Value>(&self.definition_json)?;
    Ok(())
  }
}

// ─── Answers ─────────────────────────────────────────────────────────────────

/// One answer to one question. Exactly one representation per answer — this
/// is the type-level form of the "exactly one populated answer column"
/// schema constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
  Text(String),
  /// Exact decimal(18,4); never a float.
  Numeric(Decimal),
  /// Identifier of a predefined choice in the questionnaire definition.
  Choice(String),
}

impl AnswerValue {
  /// Scalar rendering for the denormalised `answers_json` blob. Numerics are
  /// rendered as decimal strings, rounded to [`ANSWER_SCALE`] so the blob
  /// matches the stored `response_item` value exactly.
  pub fn to_json_value(&self) -> serde_json::Value {
    match self {
      Self::Text(s) | Self::Choice(s) => serde_json::Value::String(s.clone()),
      Self::Numeric(d) => {
        serde_json::Value::String(d.round_dp(ANSWER_SCALE).to_string())
      }
    }
  }
}

// ─── Response ────────────────────────────────────────────────────────────────

/// One submission against one specific questionnaire version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
  pub id:               Uuid,
  pub questionnaire_id: Uuid,
  /// Copied from the questionnaire at submission time so responses can be
  /// aggregated across versions without a join.
  pub canonical_id:     Uuid,
  /// Absent for anonymous submissions.
  pub user_id:          Option<Uuid>,
  pub submitted_at:     DateTime<Utc>,
  /// SHA-256 hex of the questionnaire definition at submission time;
  /// detects definition drift when re-reading old responses.
  pub definition_hash:  String,
  /// Full question-id → answer map as JSON — redundant with the
  /// `ResponseItem` rows, kept for fast read-back.
  pub answers_json:     String,
}

/// One answered question within a response, normalised for per-question
/// analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseItem {
  pub id:          Uuid,
  pub response_id: Uuid,
  /// Matches the question identifier inside `definition_json`; deliberately
  /// not a foreign key — questions live in the JSON document.
  pub question_id: String,
  pub answer:      AnswerValue,
}

/// Input to [`crate::store::TrackerStore::submit_response`].
#[derive(Debug, Clone)]
pub struct NewResponse {
  pub questionnaire_id: Uuid,
  pub user_id:          Option<Uuid>,
  /// Ordered map so `answers_json` serialises deterministically.
  pub answers:          BTreeMap<String, AnswerValue>,
}

impl NewResponse {
  pub fn new(questionnaire_id: Uuid) -> Self {
    Self {
      questionnaire_id,
      user_id: None,
      answers: BTreeMap::new(),
    }
  }

  pub fn answer(
    mut self,
    question_id: impl Into<String>,
    value: AnswerValue,
  ) -> Self {
    self.answers.insert(question_id.into(), value);
    self
  }
}
