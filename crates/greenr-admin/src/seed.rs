//! Development fixtures: one known account, a few footprint records, and a
//! published intake questionnaire.
//!
//! Safe to re-run — the account is upserted on its email, and the other
//! records are only inserted when the account owns none yet.

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use chrono::NaiveDate;
use greenr_core::{
  footprint::{CommuteMode, NewCommute, NewHouse, NewItem},
  questionnaire::NewQuestionnaire,
  store::TrackerStore,
  user::NewUser,
};
use greenr_store_sqlite::SqliteStore;
use rand_core::OsRng;
use rust_decimal::Decimal;
use serde::Deserialize;

const INTAKE_DEFINITION: &str = r#"{
  "questions": [
    { "id": "heating", "type": "choice",
      "choices": ["gas", "electric", "district", "heat_pump"] },
    { "id": "household_size", "type": "numeric" },
    { "id": "diet", "type": "text" }
  ]
}"#;

/// The seed account, configurable under `[seed]` in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
  #[serde(default = "default_email")]
  pub email:      String,
  #[serde(default = "default_user_name")]
  pub user_name:  String,
  #[serde(default = "default_first_name")]
  pub first_name: String,
  #[serde(default = "default_password")]
  pub password:   String,
}

fn default_email() -> String { "ferdivdkamp@gmail.com".to_string() }
fn default_user_name() -> String { "ferdi".to_string() }
fn default_first_name() -> String { "ferdi".to_string() }
fn default_password() -> String { "1234!".to_string() }

impl Default for SeedConfig {
  fn default() -> Self {
    Self {
      email:      default_email(),
      user_name:  default_user_name(),
      first_name: default_first_name(),
      password:   default_password(),
    }
  }
}

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
  Ok(hash.to_string())
}

pub async fn run(store: &SqliteStore, cfg: &SeedConfig) -> anyhow::Result<()> {
  let mut input = NewUser::new(
    cfg.email.clone(),
    cfg.user_name.clone(),
    hash_password(&cfg.password)?,
  );
  input.first_name = Some(cfg.first_name.clone());
  let user = store
    .upsert_user(input)
    .await
    .context("failed to seed user")?;
  tracing::info!(user_id = %user.user_id, email = %cfg.email, "seed user ready");

  if store.list_items(user.user_id).await?.is_empty() {
    for item in sample_items()? {
      store.add_item(user.user_id, item).await?;
    }
    tracing::info!("seeded sample items");
  }

  if store.list_houses(user.user_id).await?.is_empty() {
    store
      .add_house(user.user_id, NewHouse {
        energy_label: Some("B".to_string()),
        size_m2:      Some(74),
      })
      .await?;
    tracing::info!("seeded sample house");
  }

  if store.list_commutes(user.user_id).await?.is_empty() {
    store
      .add_commute(user.user_id, NewCommute {
        mode:                         CommuteMode::Bike,
        distance_km_per_trip:         Decimal::new(8500, 3),
        times_per_week:               4,
        work_from_home_days_per_week: 1,
      })
      .await?;
    tracing::info!("seeded sample commute");
  }

  if store.list_questionnaires().await?.is_empty() {
    let questionnaire = store
      .create_questionnaire(NewQuestionnaire::new(
        "Carbon footprint intake",
        INTAKE_DEFINITION,
      ))
      .await?;
    store.publish_questionnaire(questionnaire.id).await?;
    tracing::info!(
      questionnaire_id = %questionnaire.id,
      "seeded intake questionnaire"
    );
  }

  Ok(())
}

fn sample_items() -> anyhow::Result<Vec<NewItem>> {
  Ok(vec![
    NewItem {
      item_name:        "laptop".to_string(),
      date_of_purchase: seed_date(2023, 11, 2)?,
      use_case:         Some("work".to_string()),
      price:            Some(Decimal::new(129900, 2)),
      footprint_kg:     Some(Decimal::new(184_200, 3)),
    },
    NewItem {
      item_name:        "winter coat".to_string(),
      date_of_purchase: seed_date(2024, 1, 14)?,
      use_case:         Some("clothing".to_string()),
      price:            Some(Decimal::new(18950, 2)),
      footprint_kg:     Some(Decimal::new(22_400, 3)),
    },
    NewItem {
      item_name:        "espresso machine".to_string(),
      date_of_purchase: None,
      use_case:         Some("kitchen".to_string()),
      price:            Some(Decimal::new(34900, 2)),
      footprint_kg:     None,
    },
  ])
}

fn seed_date(y: i32, m: u32, d: u32) -> anyhow::Result<Option<NaiveDate>> {
  Ok(Some(
    NaiveDate::from_ymd_opt(y, m, d).context("invalid seed date")?,
  ))
}
