//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings and dates as `YYYY-MM-DD`.
//! UUIDs are stored as hyphenated lowercase strings. Decimal columns hold
//! canonical decimal strings rounded to the column's fixed scale.

use chrono::{DateTime, NaiveDate, Utc};
use greenr_core::{
  footprint::{Commute, CommuteMode, House, Item},
  questionnaire::{
    ANSWER_SCALE, AnswerValue, Questionnaire, QuestionnaireStatus, Response,
    ResponseItem,
  },
  token::{PasswordResetToken, RefreshToken},
  user::User,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Error, Result};

/// Fixed decimal scale per column family. Numeric answers use
/// [`ANSWER_SCALE`] from the core crate.
pub const PRICE_SCALE: u32 = 2;
pub const KG_SCALE: u32 = 3;

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_uuid_opt(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── DateTime<Utc> / NaiveDate ───────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_dt_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

pub fn encode_date(d: NaiveDate) -> String { d.to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  s.parse().map_err(|e: chrono::ParseError| Error::DateParse(e.to_string()))
}

// ─── Decimal ─────────────────────────────────────────────────────────────────

pub fn encode_decimal(d: Decimal, scale: u32) -> String {
  d.round_dp(scale).to_string()
}

pub fn decode_decimal(s: &str) -> Result<Decimal> {
  s.parse().map_err(|e: rust_decimal::Error| Error::DecimalParse(e.to_string()))
}

// ─── Integers ────────────────────────────────────────────────────────────────

/// SQLite INTEGER columns come back as `i64`; the domain types use `u32`.
/// A raw write outside the typed API can store a negative or oversized
/// value, so the narrowing is checked, never a silent cast.
pub fn decode_u32(field: &'static str, value: i64) -> Result<u32> {
  u32::try_from(value)
    .map_err(|_| Error::IntegerOutOfRange(format!("{field}: {value}")))
}

// ─── QuestionnaireStatus ─────────────────────────────────────────────────────

pub fn encode_status(s: QuestionnaireStatus) -> &'static str {
  match s {
    QuestionnaireStatus::Draft => "draft",
    QuestionnaireStatus::Active => "active",
    QuestionnaireStatus::Inactive => "inactive",
  }
}

pub fn decode_status(s: &str) -> Result<QuestionnaireStatus> {
  match s {
    "draft" => Ok(QuestionnaireStatus::Draft),
    "active" => Ok(QuestionnaireStatus::Active),
    "inactive" => Ok(QuestionnaireStatus::Inactive),
    other => {
      Err(greenr_core::Error::UnknownStatus(other.to_string()).into())
    }
  }
}

// ─── CommuteMode ─────────────────────────────────────────────────────────────

pub fn encode_commute_mode(m: CommuteMode) -> &'static str {
  match m {
    CommuteMode::Car => "car",
    CommuteMode::PublicTransport => "public_transport",
    CommuteMode::Bike => "bike",
    CommuteMode::Walk => "walk",
  }
}

pub fn decode_commute_mode(s: &str) -> Result<CommuteMode> {
  match s {
    "car" => Ok(CommuteMode::Car),
    "public_transport" => Ok(CommuteMode::PublicTransport),
    "bike" => Ok(CommuteMode::Bike),
    "walk" => Ok(CommuteMode::Walk),
    other => {
      Err(greenr_core::Error::UnknownCommuteMode(other.to_string()).into())
    }
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub email:         String,
  pub user_name:     Option<String>,
  pub first_name:    Option<String>,
  pub password_hash: String,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       decode_uuid(&self.user_id)?,
      email:         self.email,
      user_name:     self.user_name,
      first_name:    self.first_name,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawHouse {
  pub house_id:     String,
  pub user_id:      String,
  pub energy_label: Option<String>,
  pub size_m2:      Option<i64>,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawHouse {
  pub fn into_house(self) -> Result<House> {
    Ok(House {
      house_id:     decode_uuid(&self.house_id)?,
      user_id:      decode_uuid(&self.user_id)?,
      energy_label: self.energy_label,
      size_m2:      self
        .size_m2
        .map(|v| decode_u32("size_m2", v))
        .transpose()?,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawItem {
  pub item_id:          String,
  pub user_id:          String,
  pub item_name:        String,
  pub date_of_purchase: Option<String>,
  pub use_case:         Option<String>,
  pub price:            Option<String>,
  pub footprint_kg:     Option<String>,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawItem {
  pub fn into_item(self) -> Result<Item> {
    Ok(Item {
      item_id:          decode_uuid(&self.item_id)?,
      user_id:          decode_uuid(&self.user_id)?,
      item_name:        self.item_name,
      date_of_purchase: self
        .date_of_purchase
        .as_deref()
        .map(decode_date)
        .transpose()?,
      use_case:         self.use_case,
      price:            self.price.as_deref().map(decode_decimal).transpose()?,
      footprint_kg:     self
        .footprint_kg
        .as_deref()
        .map(decode_decimal)
        .transpose()?,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawCommute {
  pub commute_id:                   String,
  pub user_id:                      String,
  pub mode:                         String,
  pub distance_km_per_trip:         String,
  pub times_per_week:               i64,
  pub work_from_home_days_per_week: i64,
  pub created_at:                   String,
  pub updated_at:                   String,
}

impl RawCommute {
  pub fn into_commute(self) -> Result<Commute> {
    Ok(Commute {
      commute_id:                   decode_uuid(&self.commute_id)?,
      user_id:                      decode_uuid(&self.user_id)?,
      mode:                         decode_commute_mode(&self.mode)?,
      distance_km_per_trip:         decode_decimal(
        &self.distance_km_per_trip,
      )?,
      times_per_week:               decode_u32(
        "times_per_week",
        self.times_per_week,
      )?,
      work_from_home_days_per_week: decode_u32(
        "work_from_home_days_per_week",
        self.work_from_home_days_per_week,
      )?,
      created_at:                   decode_dt(&self.created_at)?,
      updated_at:                   decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawQuestionnaire {
  pub id:              String,
  pub canonical_id:    String,
  pub version:         i64,
  pub title:           String,
  pub definition_json: String,
  pub status:          String,
  pub supersedes_id:   Option<String>,
  pub replaced_by_id:  Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawQuestionnaire {
  pub fn into_questionnaire(self) -> Result<Questionnaire> {
    Ok(Questionnaire {
      id:              decode_uuid(&self.id)?,
      canonical_id:    decode_uuid(&self.canonical_id)?,
      version:         decode_u32("version", self.version)?,
      title:           self.title,
      definition_json: self.definition_json,
      status:          decode_status(&self.status)?,
      supersedes_id:   decode_uuid_opt(self.supersedes_id.as_deref())?,
      replaced_by_id:  decode_uuid_opt(self.replaced_by_id.as_deref())?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawResponse {
  pub id:               String,
  pub questionnaire_id: String,
  pub canonical_id:     String,
  pub user_id:          Option<String>,
  pub submitted_at:     String,
  pub definition_hash:  String,
  pub answers_json:     String,
}

impl RawResponse {
  pub fn into_response(self) -> Result<Response> {
    Ok(Response {
      id:               decode_uuid(&self.id)?,
      questionnaire_id: decode_uuid(&self.questionnaire_id)?,
      canonical_id:     decode_uuid(&self.canonical_id)?,
      user_id:          decode_uuid_opt(self.user_id.as_deref())?,
      submitted_at:     decode_dt(&self.submitted_at)?,
      definition_hash:  self.definition_hash,
      answers_json:     self.answers_json,
    })
  }
}

pub struct RawResponseItem {
  pub id:               String,
  pub response_id:      String,
  pub question_id:      String,
  pub answer_text:      Option<String>,
  pub answer_numeric:   Option<String>,
  pub answer_choice_id: Option<String>,
}

impl RawResponseItem {
  pub fn into_response_item(self) -> Result<ResponseItem> {
    let id = decode_uuid(&self.id)?;
    let answer = match (
      self.answer_text,
      self.answer_numeric,
      self.answer_choice_id,
    ) {
      (Some(text), None, None) => AnswerValue::Text(text),
      (None, Some(num), None) => AnswerValue::Numeric(decode_decimal(&num)?),
      (None, None, Some(choice)) => AnswerValue::Choice(choice),
      _ => return Err(Error::MalformedAnswer(id)),
    };
    Ok(ResponseItem {
      id,
      response_id: decode_uuid(&self.response_id)?,
      question_id: self.question_id,
      answer,
    })
  }
}

/// The three nullable answer columns for one [`AnswerValue`].
pub fn answer_columns(
  answer: &AnswerValue,
) -> (Option<String>, Option<String>, Option<String>) {
  match answer {
    AnswerValue::Text(s) => (Some(s.clone()), None, None),
    AnswerValue::Numeric(d) => {
      (None, Some(encode_decimal(*d, ANSWER_SCALE)), None)
    }
    AnswerValue::Choice(s) => (None, None, Some(s.clone())),
  }
}

pub struct RawPasswordResetToken {
  pub token:      String,
  pub user_id:    String,
  pub expires_at: String,
  pub used_at:    Option<String>,
  pub created_at: String,
}

impl RawPasswordResetToken {
  pub fn into_token(self) -> Result<PasswordResetToken> {
    Ok(PasswordResetToken {
      token:      self.token,
      user_id:    decode_uuid(&self.user_id)?,
      expires_at: decode_dt(&self.expires_at)?,
      used_at:    decode_dt_opt(self.used_at.as_deref())?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawRefreshToken {
  pub token:      String,
  pub user_id:    String,
  pub expires_at: String,
  pub revoked_at: Option<String>,
  pub created_at: String,
}

impl RawRefreshToken {
  pub fn into_token(self) -> Result<RefreshToken> {
    Ok(RefreshToken {
      token:      self.token,
      user_id:    decode_uuid(&self.user_id)?,
      expires_at: decode_dt(&self.expires_at)?,
      revoked_at: decode_dt_opt(self.revoked_at.as_deref())?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
