//! Footprint-bearing records owned by a user: houses, purchased items, and
//! commute habits.
//!
//! Money and footprint values are exact decimals, never floats. Scale is
//! fixed per column: price 2 dp, footprint and distances 3 dp.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, error};

/// Maximum length of `item_name`.
pub const ITEM_NAME_MAX: usize = 50;
/// Maximum length of `use_case`.
pub const USE_CASE_MAX: usize = 20;

// ─── Houses ──────────────────────────────────────────────────────────────────

/// A dwelling, tracked for its energy profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct House {
  pub house_id:     Uuid,
  pub user_id:      Uuid,
  /// EU energy label, e.g. "A++" or "C".
  pub energy_label: Option<String>,
  pub size_m2:      Option<u32>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewHouse {
  pub energy_label: Option<String>,
  pub size_m2:      Option<u32>,
}

// ─── Items ───────────────────────────────────────────────────────────────────

/// One purchased good, tracked for cost and footprint over time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
  pub item_id:          Uuid,
  pub user_id:          Uuid,
  pub item_name:        String,
  pub date_of_purchase: Option<NaiveDate>,
  pub use_case:         Option<String>,
  /// Purchase price; decimal(10,2).
  pub price:            Option<Decimal>,
  /// Embodied carbon in kilograms CO2e; decimal(10,3).
  pub footprint_kg:     Option<Decimal>,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
  pub item_name:        String,
  pub date_of_purchase: Option<NaiveDate>,
  pub use_case:         Option<String>,
  pub price:            Option<Decimal>,
  pub footprint_kg:     Option<Decimal>,
}

impl NewItem {
  pub fn new(item_name: impl Into<String>) -> Self {
    Self {
      item_name:        item_name.into(),
      date_of_purchase: None,
      use_case:         None,
      price:            None,
      footprint_kg:     None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    error::check_non_empty("item_name", &self.item_name)?;
    error::check_len("item_name", &self.item_name, ITEM_NAME_MAX)?;
    if let Some(use_case) = &self.use_case {
      error::check_len("use_case", use_case, USE_CASE_MAX)?;
    }
    Ok(())
  }
}

// ─── Commutes ────────────────────────────────────────────────────────────────

/// How a regular trip is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommuteMode {
  Car,
  PublicTransport,
  Bike,
  Walk,
}

/// A recurring trip pattern, e.g. the commute to work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commute {
  pub commute_id:                   Uuid,
  pub user_id:                      Uuid,
  pub mode:                         CommuteMode,
  /// One-way distance; decimal(10,3) kilometres.
  pub distance_km_per_trip:         Decimal,
  pub times_per_week:               u32,
  pub work_from_home_days_per_week: u32,
  pub created_at:                   DateTime<Utc>,
  pub updated_at:                   DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCommute {
  pub mode:                         CommuteMode,
  pub distance_km_per_trip:         Decimal,
  pub times_per_week:               u32,
  pub work_from_home_days_per_week: u32,
}
