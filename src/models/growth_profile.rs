use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Broiler lines with published feed tables. `Other` is the catch-all used
/// for generic curves that apply to any breed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum Breed {
    #[serde(rename = "cobb500")]
    #[strum(serialize = "cobb500")]
    Cobb500,
    #[serde(rename = "ross308")]
    #[strum(serialize = "ross308")]
    Ross308,
    #[serde(rename = "hubbard")]
    #[strum(serialize = "hubbard")]
    Hubbard,
    #[serde(rename = "other")]
    #[strum(serialize = "other")]
    Other,
}

/// Flock sex; `Mixed` curves apply to both sexes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BirdSex {
    Male,
    Female,
    Mixed,
}

/// One day of a feed/growth curve. Amounts are per bird: feed and expected
/// weight in grams, water in millilitres.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyConsumption {
    pub day: u32,
    pub amount_per_bird: Decimal,
    pub water_per_bird: Decimal,
    pub expected_weight: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthProfile {
    pub id: Uuid,
    pub name: String,
    pub breed: Breed,
    pub sex: BirdSex,
    pub active: bool,
    pub is_default: bool,
    /// Sorted by `day`, days unique.
    pub daily_consumption: Vec<DailyConsumption>,
}

impl GrowthProfile {
    pub fn from_input(id: Uuid, input: GrowthProfileInput) -> Self {
        let mut daily_consumption = input.daily_consumption;
        daily_consumption.sort_by_key(|entry| entry.day);

        Self {
            id,
            name: input.name.trim().to_string(),
            breed: input.breed,
            sex: input.sex,
            active: input.active,
            is_default: input.is_default,
            daily_consumption,
        }
    }

    /// A generic breed or sex on the profile widens what it applies to.
    pub fn applies_to(&self, breed: Breed, sex: BirdSex) -> bool {
        (self.breed == breed || self.breed == Breed::Other)
            && (self.sex == sex || self.sex == BirdSex::Mixed)
    }

    /// Entry for `day`, or the closest earlier day when the curve has gaps.
    /// `None` before the first recorded day.
    pub fn entry_for_day(&self, day: u32) -> Option<&DailyConsumption> {
        let idx = self
            .daily_consumption
            .partition_point(|entry| entry.day <= day);
        idx.checked_sub(1).map(|i| &self.daily_consumption[i])
    }

    pub fn last_day(&self) -> Option<u32> {
        self.daily_consumption.last().map(|entry| entry.day)
    }
}

/// Management form payload for creating or editing a profile.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GrowthProfileInput {
    #[validate(custom = "validate_profile_name")]
    pub name: String,
    pub breed: Breed,
    pub sex: BirdSex,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub is_default: bool,
    #[validate(custom = "validate_daily_consumption")]
    pub daily_consumption: Vec<DailyConsumption>,
}

/// Upper bound for any per-bird figure (grams or millilitres).
pub const MAX_PER_BIRD: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

fn default_true() -> bool {
    true
}

fn validate_profile_name(name: &str) -> Result<(), ValidationError> {
    let len = name.trim().chars().count();
    if len == 0 || len > 120 {
        let mut err = ValidationError::new("name");
        err.message = Some("Profile name is required (at most 120 characters)".into());
        return Err(err);
    }
    Ok(())
}

fn validate_daily_consumption(entries: &[DailyConsumption]) -> Result<(), ValidationError> {
    if entries.is_empty() {
        let mut err = ValidationError::new("daily_consumption_empty");
        err.message = Some("At least one day of consumption is required".into());
        return Err(err);
    }

    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if entry.day == 0 {
            let mut err = ValidationError::new("daily_consumption_day");
            err.message = Some("Days start at 1".into());
            return Err(err);
        }
        if !seen.insert(entry.day) {
            let mut err = ValidationError::new("daily_consumption_duplicate_day");
            err.message = Some(format!("Day {} appears more than once", entry.day).into());
            return Err(err);
        }
        let negative = [
            entry.amount_per_bird,
            entry.water_per_bird,
            entry.expected_weight,
        ]
        .iter()
        .any(|amount| amount.is_sign_negative() && !amount.is_zero());
        if negative {
            let mut err = ValidationError::new("daily_consumption_negative");
            err.message = Some(format!("Day {} has a negative amount", entry.day).into());
            return Err(err);
        }
        let oversized = [
            entry.amount_per_bird,
            entry.water_per_bird,
            entry.expected_weight,
        ]
        .iter()
        .any(|amount| *amount > MAX_PER_BIRD);
        if oversized {
            let mut err = ValidationError::new("daily_consumption_too_large");
            err.message = Some(
                format!("Day {} exceeds {} per bird", entry.day, MAX_PER_BIRD).into(),
            );
            return Err(err);
        }
    }
    Ok(())
}
