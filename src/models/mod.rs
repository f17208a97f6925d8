pub mod dispatch;
pub mod growth_profile;

pub use dispatch::{DispatchRecord, DispatchSource, NewDispatch, StatusBadge, StatusCategory};
pub use growth_profile::{BirdSex, Breed, DailyConsumption, GrowthProfile, GrowthProfileInput};
