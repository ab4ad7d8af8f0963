//! [`SqliteStore`] — the SQLite implementation of [`TrackerStore`].

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use rusqlite::OptionalExtension as _;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use greenr_core::{
  footprint::{Commute, House, Item, NewCommute, NewHouse, NewItem},
  questionnaire::{
    NewQuestionnaire, NewResponse, Questionnaire, Response, ResponseItem,
  },
  store::TrackerStore,
  token::{PasswordResetToken, RefreshToken},
  user::{NewUser, User},
};

use crate::{
  Error, Result,
  encode::{
    RawCommute, RawHouse, RawItem, RawPasswordResetToken, RawQuestionnaire,
    RawRefreshToken, RawResponse, RawResponseItem, RawUser, answer_columns,
    encode_commute_mode, encode_date, encode_decimal, encode_dt,
    encode_status, encode_uuid, KG_SCALE, PRICE_SCALE,
  },
  migrations,
};

// ─── Row mappers ─────────────────────────────────────────────────────────────

const USER_COLUMNS: &str =
  "user_id, email, user_name, first_name, password_hash, created_at, \
   updated_at";

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    user_id:       row.get(0)?,
    email:         row.get(1)?,
    user_name:     row.get(2)?,
    first_name:    row.get(3)?,
    password_hash: row.get(4)?,
    created_at:    row.get(5)?,
    updated_at:    row.get(6)?,
  })
}

const QUESTIONNAIRE_COLUMNS: &str =
  "id, canonical_id, version, title, definition_json, status, \
   supersedes_id, replaced_by_id, created_at, updated_at";

fn questionnaire_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawQuestionnaire> {
  Ok(RawQuestionnaire {
    id:              row.get(0)?,
    canonical_id:    row.get(1)?,
    version:         row.get(2)?,
    title:           row.get(3)?,
    definition_json: row.get(4)?,
    status:          row.get(5)?,
    supersedes_id:   row.get(6)?,
    replaced_by_id:  row.get(7)?,
    created_at:      row.get(8)?,
    updated_at:      row.get(9)?,
  })
}

const RESPONSE_COLUMNS: &str =
  "id, questionnaire_id, canonical_id, user_id, submitted_at, \
   definition_hash, answers_json";

fn response_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawResponse> {
  Ok(RawResponse {
    id:               row.get(0)?,
    questionnaire_id: row.get(1)?,
    canonical_id:     row.get(2)?,
    user_id:          row.get(3)?,
    submitted_at:     row.get(4)?,
    definition_hash:  row.get(5)?,
    answers_json:     row.get(6)?,
  })
}

/// Opaque random token value: 32 bytes from the OS RNG, URL-safe base64.
fn generate_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  B64.encode(bytes)
}

/// Lowercase hex SHA-256 of a questionnaire definition.
fn definition_hash(definition_json: &str) -> String {
  hex::encode(Sha256::digest(definition_json.as_bytes()))
}

/// Result of the password-reset transaction, computed inside the closure so
/// the whole check-and-apply stays atomic.
enum ResetOutcome {
  Applied,
  NotFound,
  Expired,
  Used,
  BadTimestamp(String),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A greenr tracker store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and apply pending migrations.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(migrations::PRAGMAS)?;
        migrations::apply(conn)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The schema revision of the underlying file (`PRAGMA user_version`).
  pub async fn schema_version(&self) -> Result<u32> {
    let version = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
      })
      .await?;
    Ok(version)
  }

  async fn questionnaire_by_id(
    &self,
    id: Uuid,
  ) -> Result<Option<Questionnaire>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawQuestionnaire> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {QUESTIONNAIRE_COLUMNS} FROM questionnaire WHERE id \
                 = ?1"
              ),
              rusqlite::params![id_str],
              questionnaire_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawQuestionnaire::into_questionnaire).transpose()
  }
}

// Raw SQL access for tests that must bypass the typed API (e.g. to probe
// constraints the API makes unreachable).
#[cfg(test)]
impl SqliteStore {
  pub(crate) async fn raw_execute(&self, sql: String) -> Result<usize> {
    let rows = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, [])?))
      .await?;
    Ok(rows)
  }

  pub(crate) async fn raw_query_i64(&self, sql: String) -> Result<i64> {
    let value = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |row| row.get(0))?))
      .await?;
    Ok(value)
  }
}

// ─── TrackerStore impl ───────────────────────────────────────────────────────

impl TrackerStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    input.validate()?;
    let now = Utc::now();
    let user = User {
      user_id:       Uuid::new_v4(),
      email:         input.email,
      user_name:     Some(input.user_name),
      first_name:    input.first_name,
      password_hash: input.password_hash,
      created_at:    now,
      updated_at:    now,
    };

    let id_str     = encode_uuid(user.user_id);
    let email      = user.email.clone();
    let user_name  = user.user_name.clone();
    let first_name = user.first_name.clone();
    let hash       = user.password_hash.clone();
    let at_str     = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             user_id, email, user_name, first_name, password_hash,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![id_str, email, user_name, first_name, hash, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn upsert_user(&self, input: NewUser) -> Result<User> {
    input.validate()?;
    let now = Utc::now();

    let id_str     = encode_uuid(Uuid::new_v4());
    let email      = input.email;
    let user_name  = input.user_name;
    let first_name = input.first_name;
    let hash       = input.password_hash;
    let at_str     = encode_dt(now);

    let raw: RawUser = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             user_id, email, user_name, first_name, password_hash,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
           ON CONFLICT (email) DO UPDATE SET
             user_name     = excluded.user_name,
             first_name    = excluded.first_name,
             password_hash = excluded.password_hash,
             updated_at    = excluded.updated_at",
          rusqlite::params![id_str, email, user_name, first_name, hash, at_str],
        )?;
        // Read back through the unique key: on conflict the existing
        // user_id and created_at survive.
        Ok(conn.query_row(
          &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
          rusqlite::params![email],
          user_from_row,
        )?)
      })
      .await?;

    raw.into_user()
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
              rusqlite::params![id_str],
              user_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
    let email = email.to_owned();
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
              rusqlite::params![email],
              user_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn update_password(
    &self,
    user_id: Uuid,
    password_hash: String,
  ) -> Result<()> {
    let id_str = encode_uuid(user_id);
    let at_str = encode_dt(Utc::now());

    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET password_hash = ?1, updated_at = ?2
           WHERE user_id = ?3",
          rusqlite::params![password_hash, at_str, id_str],
        )?)
      })
      .await?;

    if rows == 0 {
      return Err(Error::UserNotFound(user_id));
    }
    Ok(())
  }

  // ── Houses / items / commutes ─────────────────────────────────────────────

  async fn add_house(&self, user_id: Uuid, input: NewHouse) -> Result<House> {
    let now = Utc::now();
    let house = House {
      house_id: Uuid::new_v4(),
      user_id,
      energy_label: input.energy_label,
      size_m2: input.size_m2,
      created_at: now,
      updated_at: now,
    };

    let id_str   = encode_uuid(house.house_id);
    let user_str = encode_uuid(user_id);
    let label    = house.energy_label.clone();
    let size     = house.size_m2.map(i64::from);
    let at_str   = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO houses (
             house_id, user_id, energy_label, size_m2, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, user_str, label, size, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(house)
  }

  async fn list_houses(&self, user_id: Uuid) -> Result<Vec<House>> {
    let user_str = encode_uuid(user_id);
    let raws: Vec<RawHouse> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT house_id, user_id, energy_label, size_m2, created_at,
                  updated_at
           FROM houses WHERE user_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |row| {
            Ok(RawHouse {
              house_id:     row.get(0)?,
              user_id:      row.get(1)?,
              energy_label: row.get(2)?,
              size_m2:      row.get(3)?,
              created_at:   row.get(4)?,
              updated_at:   row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawHouse::into_house).collect()
  }

  async fn add_item(&self, user_id: Uuid, input: NewItem) -> Result<Item> {
    input.validate()?;
    let now = Utc::now();
    let item = Item {
      item_id: Uuid::new_v4(),
      user_id,
      item_name: input.item_name,
      date_of_purchase: input.date_of_purchase,
      use_case: input.use_case,
      price: input.price,
      footprint_kg: input.footprint_kg,
      created_at: now,
      updated_at: now,
    };

    let id_str    = encode_uuid(item.item_id);
    let user_str  = encode_uuid(user_id);
    let name      = item.item_name.clone();
    let date_str  = item.date_of_purchase.map(encode_date);
    let use_case  = item.use_case.clone();
    let price     = item.price.map(|d| encode_decimal(d, PRICE_SCALE));
    let footprint = item.footprint_kg.map(|d| encode_decimal(d, KG_SCALE));
    let at_str    = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO items (
             item_id, user_id, item_name, date_of_purchase, use_case,
             price, footprint_kg, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          rusqlite::params![
            id_str, user_str, name, date_str, use_case, price, footprint,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(item)
  }

  async fn list_items(&self, user_id: Uuid) -> Result<Vec<Item>> {
    let user_str = encode_uuid(user_id);
    let raws: Vec<RawItem> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT item_id, user_id, item_name, date_of_purchase, use_case,
                  price, footprint_kg, created_at, updated_at
           FROM items WHERE user_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |row| {
            Ok(RawItem {
              item_id:          row.get(0)?,
              user_id:          row.get(1)?,
              item_name:        row.get(2)?,
              date_of_purchase: row.get(3)?,
              use_case:         row.get(4)?,
              price:            row.get(5)?,
              footprint_kg:     row.get(6)?,
              created_at:       row.get(7)?,
              updated_at:       row.get(8)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawItem::into_item).collect()
  }

  async fn add_commute(
    &self,
    user_id: Uuid,
    input: NewCommute,
  ) -> Result<Commute> {
    let now = Utc::now();
    let commute = Commute {
      commute_id: Uuid::new_v4(),
      user_id,
      mode: input.mode,
      distance_km_per_trip: input.distance_km_per_trip,
      times_per_week: input.times_per_week,
      work_from_home_days_per_week: input.work_from_home_days_per_week,
      created_at: now,
      updated_at: now,
    };

    let id_str   = encode_uuid(commute.commute_id);
    let user_str = encode_uuid(user_id);
    let mode     = encode_commute_mode(commute.mode).to_owned();
    let distance = encode_decimal(commute.distance_km_per_trip, KG_SCALE);
    let times    = i64::from(commute.times_per_week);
    let wfh      = i64::from(commute.work_from_home_days_per_week);
    let at_str   = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO commutes (
             commute_id, user_id, mode, distance_km_per_trip,
             times_per_week, work_from_home_days_per_week,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![id_str, user_str, mode, distance, times, wfh, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(commute)
  }

  async fn list_commutes(&self, user_id: Uuid) -> Result<Vec<Commute>> {
    let user_str = encode_uuid(user_id);
    let raws: Vec<RawCommute> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT commute_id, user_id, mode, distance_km_per_trip,
                  times_per_week, work_from_home_days_per_week,
                  created_at, updated_at
           FROM commutes WHERE user_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |row| {
            Ok(RawCommute {
              commute_id:                   row.get(0)?,
              user_id:                      row.get(1)?,
              mode:                         row.get(2)?,
              distance_km_per_trip:         row.get(3)?,
              times_per_week:               row.get(4)?,
              work_from_home_days_per_week: row.get(5)?,
              created_at:                   row.get(6)?,
              updated_at:                   row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawCommute::into_commute).collect()
  }

  // ── Questionnaires ────────────────────────────────────────────────────────

  async fn create_questionnaire(
    &self,
    input: NewQuestionnaire,
  ) -> Result<Questionnaire> {
    input.validate()?;
    let id = Uuid::new_v4();
    let now = Utc::now();
    // Used only when starting a canonical group from scratch.
    let fresh_canonical = input.canonical_id.unwrap_or_else(Uuid::new_v4);

    let id_str         = encode_uuid(id);
    let canonical_str  = encode_uuid(fresh_canonical);
    let title          = input.title.clone();
    let definition     = input.definition_json.clone();
    let status_str     = encode_status(input.status).to_owned();
    let supersedes_str = input.supersedes_id.map(encode_uuid);
    let at_str         = encode_dt(now);

    // None means the supersedes target does not exist; the transaction is
    // rolled back by drop in that case.
    let chained: Option<(String, i64)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let (canonical, version): (String, i64) = match &supersedes_str {
          Some(prev_id) => {
            let prev: Option<(String, i64)> = tx
              .query_row(
                "SELECT canonical_id, version FROM questionnaire
                 WHERE id = ?1",
                rusqlite::params![prev_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
              )
              .optional()?;
            let Some((canonical, prev_version)) = prev else {
              return Ok(None);
            };
            (canonical, prev_version + 1)
          }
          None => {
            let max_version: i64 = tx.query_row(
              "SELECT COALESCE(MAX(version), 0) FROM questionnaire
               WHERE canonical_id = ?1",
              rusqlite::params![canonical_str],
              |row| row.get(0),
            )?;
            (canonical_str.clone(), max_version + 1)
          }
        };

        tx.execute(
          "INSERT INTO questionnaire (
             id, canonical_id, version, title, definition_json, status,
             supersedes_id, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          rusqlite::params![
            id_str, canonical, version, title, definition, status_str,
            supersedes_str, at_str,
          ],
        )?;

        if let Some(prev_id) = &supersedes_str {
          // The predecessor is demoted only if it was the active version.
          tx.execute(
            "UPDATE questionnaire
             SET replaced_by_id = ?1,
                 status = CASE WHEN status = 'active' THEN 'inactive'
                               ELSE status END,
                 updated_at = ?2
             WHERE id = ?3",
            rusqlite::params![id_str, at_str, prev_id],
          )?;
        }

        tx.commit()?;
        Ok(Some((canonical, version)))
      })
      .await?;

    let Some((canonical, version)) = chained else {
      // Only the supersedes path can come back empty.
      let missing = input.supersedes_id.unwrap_or(id);
      return Err(Error::QuestionnaireNotFound(missing));
    };

    Ok(Questionnaire {
      id,
      canonical_id: crate::encode::decode_uuid(&canonical)?,
      version: crate::encode::decode_u32("version", version)?,
      title: input.title,
      definition_json: input.definition_json,
      status: input.status,
      supersedes_id: input.supersedes_id,
      replaced_by_id: None,
      created_at: now,
      updated_at: now,
    })
  }

  async fn get_questionnaire(&self, id: Uuid) -> Result<Option<Questionnaire>> {
    self.questionnaire_by_id(id).await
  }

  async fn list_questionnaires(&self) -> Result<Vec<Questionnaire>> {
    let raws: Vec<RawQuestionnaire> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {QUESTIONNAIRE_COLUMNS} FROM questionnaire
           ORDER BY created_at DESC, version DESC"
        ))?;
        let rows = stmt
          .query_map([], questionnaire_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws
      .into_iter()
      .map(RawQuestionnaire::into_questionnaire)
      .collect()
  }

  async fn list_versions(
    &self,
    canonical_id: Uuid,
  ) -> Result<Vec<Questionnaire>> {
    let canonical_str = encode_uuid(canonical_id);
    let raws: Vec<RawQuestionnaire> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {QUESTIONNAIRE_COLUMNS} FROM questionnaire
           WHERE canonical_id = ?1 ORDER BY version"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![canonical_str], questionnaire_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws
      .into_iter()
      .map(RawQuestionnaire::into_questionnaire)
      .collect()
  }

  async fn active_questionnaire(
    &self,
    canonical_id: Uuid,
  ) -> Result<Option<Questionnaire>> {
    let canonical_str = encode_uuid(canonical_id);
    let raw: Option<RawQuestionnaire> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {QUESTIONNAIRE_COLUMNS} FROM questionnaire
                 WHERE canonical_id = ?1 AND status = 'active'
                 ORDER BY version DESC LIMIT 1"
              ),
              rusqlite::params![canonical_str],
              questionnaire_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawQuestionnaire::into_questionnaire).transpose()
  }

  async fn publish_questionnaire(&self, id: Uuid) -> Result<Questionnaire> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let found: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let canonical: Option<String> = tx
          .query_row(
            "SELECT canonical_id FROM questionnaire WHERE id = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(canonical) = canonical else {
          return Ok(false);
        };

        // Demote whichever version is currently active in this family.
        tx.execute(
          "UPDATE questionnaire
           SET status = 'inactive', replaced_by_id = ?1, updated_at = ?2
           WHERE canonical_id = ?3 AND status = 'active' AND id <> ?1",
          rusqlite::params![id_str, at_str, canonical],
        )?;

        tx.execute(
          "UPDATE questionnaire SET status = 'active', updated_at = ?2
           WHERE id = ?1",
          rusqlite::params![id_str, at_str],
        )?;

        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !found {
      return Err(Error::QuestionnaireNotFound(id));
    }
    self
      .questionnaire_by_id(id)
      .await?
      .ok_or(Error::QuestionnaireNotFound(id))
  }

  // ── Responses ─────────────────────────────────────────────────────────────

  async fn submit_response(&self, input: NewResponse) -> Result<Response> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    // Denormalised read-back blob: question id → scalar answer.
    let blob: serde_json::Map<String, serde_json::Value> = input
      .answers
      .iter()
      .map(|(question_id, answer)| {
        (question_id.clone(), answer.to_json_value())
      })
      .collect();
    let answers_json = serde_json::to_string(&blob)?;

    let item_rows: Vec<_> = input
      .answers
      .iter()
      .map(|(question_id, answer)| {
        let (text, numeric, choice) = answer_columns(answer);
        (
          encode_uuid(Uuid::new_v4()),
          question_id.clone(),
          text,
          numeric,
          choice,
        )
      })
      .collect();

    let id_str        = encode_uuid(id);
    let q_id_str      = encode_uuid(input.questionnaire_id);
    let user_str      = input.user_id.map(encode_uuid);
    let at_str        = encode_dt(now);
    let answers_clone = answers_json.clone();

    // None means the questionnaire does not exist.
    let parts: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let target: Option<(String, String)> = tx
          .query_row(
            "SELECT canonical_id, definition_json FROM questionnaire
             WHERE id = ?1",
            rusqlite::params![q_id_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;
        let Some((canonical, definition)) = target else {
          return Ok(None);
        };
        let hash = definition_hash(&definition);

        tx.execute(
          "INSERT INTO response (
             id, questionnaire_id, canonical_id, user_id, submitted_at,
             definition_hash, answers_json
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str, q_id_str, canonical, user_str, at_str, hash,
            answers_clone,
          ],
        )?;

        for (item_id, question_id, text, numeric, choice) in &item_rows {
          tx.execute(
            "INSERT INTO response_item (
               id, response_id, question_id, answer_text, answer_numeric,
               answer_choice_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![item_id, id_str, question_id, text, numeric, choice],
          )?;
        }

        tx.commit()?;
        Ok(Some((canonical, hash)))
      })
      .await?;

    let Some((canonical, hash)) = parts else {
      return Err(Error::QuestionnaireNotFound(input.questionnaire_id));
    };

    Ok(Response {
      id,
      questionnaire_id: input.questionnaire_id,
      canonical_id: crate::encode::decode_uuid(&canonical)?,
      user_id: input.user_id,
      submitted_at: now,
      definition_hash: hash,
      answers_json,
    })
  }

  async fn get_response(&self, id: Uuid) -> Result<Option<Response>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawResponse> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RESPONSE_COLUMNS} FROM response WHERE id = ?1"),
              rusqlite::params![id_str],
              response_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawResponse::into_response).transpose()
  }

  async fn response_items(
    &self,
    response_id: Uuid,
  ) -> Result<Vec<ResponseItem>> {
    let id_str = encode_uuid(response_id);
    let raws: Vec<RawResponseItem> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, response_id, question_id, answer_text, answer_numeric,
                  answer_choice_id
           FROM response_item WHERE response_id = ?1 ORDER BY question_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawResponseItem {
              id:               row.get(0)?,
              response_id:      row.get(1)?,
              question_id:      row.get(2)?,
              answer_text:      row.get(3)?,
              answer_numeric:   row.get(4)?,
              answer_choice_id: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws
      .into_iter()
      .map(RawResponseItem::into_response_item)
      .collect()
  }

  async fn list_responses(&self, canonical_id: Uuid) -> Result<Vec<Response>> {
    let canonical_str = encode_uuid(canonical_id);
    let raws: Vec<RawResponse> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RESPONSE_COLUMNS} FROM response
           WHERE canonical_id = ?1 ORDER BY submitted_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![canonical_str], response_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawResponse::into_response).collect()
  }

  // ── Tokens ────────────────────────────────────────────────────────────────

  async fn create_password_reset_token(
    &self,
    user_id: Uuid,
    ttl: Duration,
  ) -> Result<PasswordResetToken> {
    if self.get_user(user_id).await?.is_none() {
      return Err(Error::UserNotFound(user_id));
    }

    let now = Utc::now();
    let token = PasswordResetToken {
      token: generate_token(),
      user_id,
      expires_at: now + ttl,
      used_at: None,
      created_at: now,
    };

    let token_str   = token.token.clone();
    let user_str    = encode_uuid(user_id);
    let expires_str = encode_dt(token.expires_at);
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO password_reset_tokens (
             token, user_id, expires_at, created_at
           ) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![token_str, user_str, expires_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(token)
  }

  async fn consume_password_reset_token(
    &self,
    token: String,
    new_password_hash: String,
  ) -> Result<()> {
    let now = Utc::now();
    let at_str = encode_dt(now);

    let outcome: ResetOutcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let row: Option<(String, String, Option<String>)> = tx
          .query_row(
            "SELECT user_id, expires_at, used_at
             FROM password_reset_tokens WHERE token = ?1",
            rusqlite::params![token],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
          )
          .optional()?;
        let Some((user_id, expires_str, used_at)) = row else {
          return Ok(ResetOutcome::NotFound);
        };
        if used_at.is_some() {
          return Ok(ResetOutcome::Used);
        }
        let expires_at = match DateTime::parse_from_rfc3339(&expires_str) {
          Ok(dt) => dt.with_timezone(&Utc),
          Err(e) => return Ok(ResetOutcome::BadTimestamp(e.to_string())),
        };
        if expires_at <= now {
          return Ok(ResetOutcome::Expired);
        }

        tx.execute(
          "UPDATE users SET password_hash = ?1, updated_at = ?2
           WHERE user_id = ?3",
          rusqlite::params![new_password_hash, at_str, user_id],
        )?;
        tx.execute(
          "UPDATE password_reset_tokens SET used_at = ?1 WHERE token = ?2",
          rusqlite::params![at_str, token],
        )?;

        tx.commit()?;
        Ok(ResetOutcome::Applied)
      })
      .await?;

    match outcome {
      ResetOutcome::Applied => Ok(()),
      ResetOutcome::NotFound => Err(Error::ResetTokenNotFound),
      ResetOutcome::Expired => Err(Error::ResetTokenExpired),
      ResetOutcome::Used => Err(Error::ResetTokenUsed),
      ResetOutcome::BadTimestamp(detail) => Err(Error::DateParse(detail)),
    }
  }

  async fn create_refresh_token(
    &self,
    user_id: Uuid,
    ttl: Duration,
  ) -> Result<RefreshToken> {
    if self.get_user(user_id).await?.is_none() {
      return Err(Error::UserNotFound(user_id));
    }

    let now = Utc::now();
    let token = RefreshToken {
      token: generate_token(),
      user_id,
      expires_at: now + ttl,
      revoked_at: None,
      created_at: now,
    };

    let token_str   = token.token.clone();
    let user_str    = encode_uuid(user_id);
    let expires_str = encode_dt(token.expires_at);
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO refresh_tokens (
             token, user_id, expires_at, created_at
           ) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![token_str, user_str, expires_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(token)
  }

  async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>> {
    let token = token.to_owned();
    let raw: Option<RawRefreshToken> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT token, user_id, expires_at, revoked_at, created_at
               FROM refresh_tokens WHERE token = ?1",
              rusqlite::params![token],
              |row| {
                Ok(RawRefreshToken {
                  token:      row.get(0)?,
                  user_id:    row.get(1)?,
                  expires_at: row.get(2)?,
                  revoked_at: row.get(3)?,
                  created_at: row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawRefreshToken::into_token).transpose()
  }

  async fn revoke_refresh_token(&self, token: &str) -> Result<RefreshToken> {
    let existing = self
      .get_refresh_token(token)
      .await?
      .ok_or(Error::RefreshTokenNotFound)?;
    if existing.revoked_at.is_some() {
      return Err(Error::RefreshTokenRevoked);
    }

    let now = Utc::now();
    let at_str = encode_dt(now);
    let token_str = token.to_owned();

    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE refresh_tokens SET revoked_at = ?1
           WHERE token = ?2 AND revoked_at IS NULL",
          rusqlite::params![at_str, token_str],
        )?)
      })
      .await?;
    if rows == 0 {
      return Err(Error::RefreshTokenRevoked);
    }

    Ok(RefreshToken {
      revoked_at: Some(now),
      ..existing
    })
  }
}

/// Look up a password-reset token row — exposed on the store (not the trait)
/// for diagnostics and tests; the auth flow goes through
/// [`TrackerStore::consume_password_reset_token`].
impl SqliteStore {
  pub async fn get_password_reset_token(
    &self,
    token: &str,
  ) -> Result<Option<PasswordResetToken>> {
    let token = token.to_owned();
    let raw: Option<RawPasswordResetToken> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT token, user_id, expires_at, used_at, created_at
               FROM password_reset_tokens WHERE token = ?1",
              rusqlite::params![token],
              |row| {
                Ok(RawPasswordResetToken {
                  token:      row.get(0)?,
                  user_id:    row.get(1)?,
                  expires_at: row.get(2)?,
                  used_at:    row.get(3)?,
                  created_at: row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawPasswordResetToken::into_token).transpose()
  }
}
