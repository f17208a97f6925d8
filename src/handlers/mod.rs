pub mod dispatches;
pub mod growth_profiles;
pub mod health;

use std::sync::Arc;

use crate::{
    repositories::DispatchStore,
    services::{
        dispatch_reconciliation::DispatchReconciliationService,
        growth_profiles::GrowthProfileService, spreadsheet_import::SpreadsheetImporter,
    },
};

pub use crate::AppState;

/// Services layer shared by the HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub dispatches: DispatchReconciliationService,
    pub growth_profiles: GrowthProfileService,
}

impl AppServices {
    pub fn new(store: Arc<dyn DispatchStore>, spreadsheet_id_prefix: &str) -> Self {
        Self {
            dispatches: DispatchReconciliationService::new(
                store,
                SpreadsheetImporter::new(spreadsheet_id_prefix),
            ),
            growth_profiles: GrowthProfileService::default(),
        }
    }
}
