pub mod dispatch_reconciliation;
pub mod growth_profiles;
pub mod reports;
pub mod spreadsheet_import;
