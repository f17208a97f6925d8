use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    models::{BirdSex, Breed, GrowthProfile, GrowthProfileInput},
};

const GRAMS_PER_KILO: Decimal = Decimal::ONE_THOUSAND;

/// Profiles applicable to `breed` and `sex`, in catalog order.
pub fn filter_profiles(catalog: &[GrowthProfile], breed: Breed, sex: BirdSex) -> Vec<&GrowthProfile> {
    catalog
        .iter()
        .filter(|profile| profile.applies_to(breed, sex))
        .collect()
}

/// Age in days counting the placement day as day 1. `None` before placement.
pub fn bird_age_days(placement: NaiveDate, on: NaiveDate) -> Option<u32> {
    let elapsed = on.signed_duration_since(placement).num_days();
    u32::try_from(elapsed).ok().map(|days| days + 1)
}

/// Flock-level consumption for one day of a curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedRequirement {
    pub profile_id: Uuid,
    pub age_days: u32,
    /// Curve day the figures were read from; earlier than `age_days` when the
    /// curve has gaps or ends before that age.
    pub curve_day: u32,
    pub birds: u32,
    pub feed_per_bird_grams: Decimal,
    pub water_per_bird_ml: Decimal,
    pub expected_weight_grams: Decimal,
    pub total_feed_kg: Decimal,
    pub total_water_liters: Decimal,
}

/// Figures for a flock of `birds` at `age_days`.
///
/// `NotFound` when the curve has no day at or before `age_days`;
/// `InvalidInput` when the flock totals do not fit in a `Decimal`.
pub fn feed_requirement(
    profile: &GrowthProfile,
    age_days: u32,
    birds: u32,
) -> Result<FeedRequirement, ServiceError> {
    let entry = profile.entry_for_day(age_days).ok_or_else(|| {
        ServiceError::NotFound(format!(
            "Profile {} has no data for day {}",
            profile.id, age_days
        ))
    })?;
    let flock = Decimal::from(birds);
    let total = |per_bird: Decimal| {
        per_bird
            .checked_mul(flock)
            .and_then(|grams| grams.checked_div(GRAMS_PER_KILO))
            .map(|value| value.normalize())
            .ok_or_else(|| {
                ServiceError::InvalidInput(format!("Flock of {} birds is too large", birds))
            })
    };

    Ok(FeedRequirement {
        profile_id: profile.id,
        age_days,
        curve_day: entry.day,
        birds,
        feed_per_bird_grams: entry.amount_per_bird,
        water_per_bird_ml: entry.water_per_bird,
        expected_weight_grams: entry.expected_weight,
        total_feed_kg: total(entry.amount_per_bird)?,
        total_water_liters: total(entry.water_per_bird)?,
    })
}

/// Breed/sex inputs and the profile chosen under them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileSelection {
    pub breed: Option<Breed>,
    pub sex: Option<BirdSex>,
    pub profile_id: Option<Uuid>,
}

impl ProfileSelection {
    /// Profiles currently offered; empty until both breed and sex are set.
    pub fn options<'a>(&self, catalog: &'a [GrowthProfile]) -> Vec<&'a GrowthProfile> {
        match (self.breed, self.sex) {
            (Some(breed), Some(sex)) => filter_profiles(catalog, breed, sex),
            _ => Vec::new(),
        }
    }

    pub fn set_breed(&mut self, breed: Option<Breed>, catalog: &[GrowthProfile]) {
        self.breed = breed;
        self.reconcile(catalog);
    }

    pub fn set_sex(&mut self, sex: Option<BirdSex>, catalog: &[GrowthProfile]) {
        self.sex = sex;
        self.reconcile(catalog);
    }

    /// Chooses a profile from the current options.
    pub fn select(&mut self, id: Uuid, catalog: &[GrowthProfile]) -> Result<(), ServiceError> {
        if !self.options(catalog).iter().any(|profile| profile.id == id) {
            return Err(ServiceError::InvalidInput(format!(
                "Profile {} does not apply to the chosen breed and sex",
                id
            )));
        }
        self.profile_id = Some(id);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.profile_id = None;
    }

    /// Drops the selection when it is no longer among the options.
    pub fn reconcile(&mut self, catalog: &[GrowthProfile]) {
        if let Some(id) = self.profile_id {
            if !self.options(catalog).iter().any(|profile| profile.id == id) {
                debug!(profile_id = %id, "selection no longer applies, clearing");
                self.profile_id = None;
            }
        }
    }
}

/// In-memory catalog of growth profiles.
#[derive(Debug, Clone, Default)]
pub struct GrowthProfileCatalog {
    profiles: Vec<GrowthProfile>,
}

impl GrowthProfileCatalog {
    pub fn new(profiles: Vec<GrowthProfile>) -> Self {
        Self { profiles }
    }

    pub fn profiles(&self) -> &[GrowthProfile] {
        &self.profiles
    }

    pub fn get(&self, id: Uuid) -> Option<&GrowthProfile> {
        self.profiles.iter().find(|profile| profile.id == id)
    }

    pub fn create(&mut self, input: GrowthProfileInput) -> Result<GrowthProfile, ServiceError> {
        input.validate()?;
        let profile = GrowthProfile::from_input(Uuid::new_v4(), input);
        self.profiles.push(profile.clone());
        Ok(profile)
    }

    pub fn update(
        &mut self,
        id: Uuid,
        input: GrowthProfileInput,
    ) -> Result<GrowthProfile, ServiceError> {
        input.validate()?;
        let slot = self
            .profiles
            .iter_mut()
            .find(|profile| profile.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("Growth profile {} not found", id)))?;
        *slot = GrowthProfile::from_input(id, input);
        Ok(slot.clone())
    }

    pub fn delete(&mut self, id: Uuid) -> Result<GrowthProfile, ServiceError> {
        let idx = self
            .profiles
            .iter()
            .position(|profile| profile.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("Growth profile {} not found", id)))?;
        Ok(self.profiles.remove(idx))
    }

    /// First active default among the profiles applicable to `breed` and `sex`.
    pub fn default_for(&self, breed: Breed, sex: BirdSex) -> Option<&GrowthProfile> {
        filter_profiles(&self.profiles, breed, sex)
            .into_iter()
            .find(|profile| profile.active && profile.is_default)
    }
}

/// Partial update of the selector. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionUpdate {
    pub breed: Option<Breed>,
    pub sex: Option<BirdSex>,
    pub profile_id: Option<Uuid>,
    /// Unsets the chosen profile before anything else is applied.
    #[serde(default)]
    pub clear_profile: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionView {
    #[serde(flatten)]
    pub selection: ProfileSelection,
    pub options: Vec<GrowthProfile>,
    pub default_profile_id: Option<Uuid>,
}

#[derive(Debug, Default)]
struct SelectorState {
    catalog: GrowthProfileCatalog,
    selection: ProfileSelection,
}

impl SelectorState {
    fn view(&self) -> SelectionView {
        let profiles = self.catalog.profiles();
        let default_profile_id = match (self.selection.breed, self.selection.sex) {
            (Some(breed), Some(sex)) => self.catalog.default_for(breed, sex).map(|p| p.id),
            _ => None,
        };
        SelectionView {
            selection: self.selection.clone(),
            options: self
                .selection
                .options(profiles)
                .into_iter()
                .cloned()
                .collect(),
            default_profile_id,
        }
    }
}

/// Growth profile catalog plus the selector bound to it.
#[derive(Clone, Default)]
pub struct GrowthProfileService {
    state: Arc<RwLock<SelectorState>>,
}

impl GrowthProfileService {
    pub fn new(profiles: Vec<GrowthProfile>) -> Self {
        Self {
            state: Arc::new(RwLock::new(SelectorState {
                catalog: GrowthProfileCatalog::new(profiles),
                selection: ProfileSelection::default(),
            })),
        }
    }

    pub async fn list(&self) -> Vec<GrowthProfile> {
        self.state.read().await.catalog.profiles().to_vec()
    }

    pub async fn get(&self, id: Uuid) -> Result<GrowthProfile, ServiceError> {
        self.state
            .read()
            .await
            .catalog
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("Growth profile {} not found", id)))
    }

    pub async fn filter(&self, breed: Breed, sex: BirdSex) -> Vec<GrowthProfile> {
        let state = self.state.read().await;
        filter_profiles(state.catalog.profiles(), breed, sex)
            .into_iter()
            .cloned()
            .collect()
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: GrowthProfileInput) -> Result<GrowthProfile, ServiceError> {
        let mut state = self.state.write().await;
        let profile = state.catalog.create(input)?;
        info!(profile_id = %profile.id, "growth profile created");
        Ok(profile)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: GrowthProfileInput,
    ) -> Result<GrowthProfile, ServiceError> {
        let mut state = self.state.write().await;
        let profile = state.catalog.update(id, input)?;
        let SelectorState { catalog, selection } = &mut *state;
        selection.reconcile(catalog.profiles());
        Ok(profile)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        state.catalog.delete(id)?;
        let SelectorState { catalog, selection } = &mut *state;
        selection.reconcile(catalog.profiles());
        info!(profile_id = %id, "growth profile deleted");
        Ok(())
    }

    pub async fn selection(&self) -> SelectionView {
        self.state.read().await.view()
    }

    #[instrument(skip(self))]
    pub async fn update_selection(
        &self,
        update: SelectionUpdate,
    ) -> Result<SelectionView, ServiceError> {
        let mut state = self.state.write().await;
        let SelectorState { catalog, selection } = &mut *state;
        let profiles = catalog.profiles();

        let mut next = selection.clone();
        if update.clear_profile {
            next.clear();
        }
        if let Some(breed) = update.breed {
            next.set_breed(Some(breed), profiles);
        }
        if let Some(sex) = update.sex {
            next.set_sex(Some(sex), profiles);
        }
        if let Some(id) = update.profile_id {
            next.select(id, profiles)?;
        }

        *selection = next;
        Ok(state.view())
    }

    /// Curve figures for a flock placed on `placement` as of `on`.
    pub async fn consumption(
        &self,
        id: Uuid,
        placement: NaiveDate,
        on: NaiveDate,
        birds: u32,
    ) -> Result<FeedRequirement, ServiceError> {
        let profile = self.get(id).await?;
        let age = bird_age_days(placement, on).ok_or_else(|| {
            ServiceError::InvalidInput("Date is before the placement date".into())
        })?;
        feed_requirement(&profile, age, birds)
    }
}
