use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    models::{DispatchRecord, DispatchSource, NewDispatch},
    repositories::DispatchStore,
    services::spreadsheet_import::{SpreadsheetImporter, SpreadsheetRow},
};

/// Merges database and spreadsheet records into one list with at most one
/// record per `order_id`.
///
/// Records are folded in order (database first): a key is inserted when
/// absent and overwritten whenever the incoming record comes from the
/// database. Output keeps the position where each key was first seen.
pub fn merge_dispatches(
    database: &[DispatchRecord],
    spreadsheet: &[DispatchRecord],
) -> Vec<DispatchRecord> {
    let mut merged: Vec<DispatchRecord> = Vec::with_capacity(database.len() + spreadsheet.len());
    let mut slots: HashMap<&str, usize> = HashMap::with_capacity(merged.capacity());

    for record in database.iter().chain(spreadsheet) {
        match slots.get(record.order_id.as_str()) {
            Some(&slot) if record.source == DispatchSource::Database => {
                merged[slot] = record.clone();
            }
            Some(_) => {}
            None => {
                slots.insert(record.order_id.as_str(), merged.len());
                merged.push(record.clone());
            }
        }
    }

    merged
}

/// Case-insensitive substring filter. A blank term keeps everything.
pub fn search_dispatches<'a>(
    records: &'a [DispatchRecord],
    term: &str,
) -> Vec<&'a DispatchRecord> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|record| record.matches_lowercase(&needle))
        .collect()
}

/// Both reconciliation inputs plus the merged output derived from them.
#[derive(Debug, Default, Clone)]
pub struct DispatchBoard {
    database: Vec<DispatchRecord>,
    spreadsheet: Vec<DispatchRecord>,
    fetch_error: Option<String>,
    merged: Vec<DispatchRecord>,
}

impl DispatchBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the outcome of a store fetch. A failure drops the database
    /// side and keeps the spreadsheet side.
    pub fn apply_fetch(&mut self, outcome: Result<Vec<DispatchRecord>, String>) {
        match outcome {
            Ok(records) => {
                self.database = records;
                self.fetch_error = None;
            }
            Err(message) => {
                self.database.clear();
                self.fetch_error = Some(message);
            }
        }
        self.recompute();
    }

    pub fn set_spreadsheet(&mut self, records: Vec<DispatchRecord>) {
        self.spreadsheet = records;
        self.recompute();
    }

    pub fn clear_spreadsheet(&mut self) {
        self.spreadsheet.clear();
        self.recompute();
    }

    pub fn merged(&self) -> &[DispatchRecord] {
        &self.merged
    }

    pub fn search(&self, term: &str) -> Vec<&DispatchRecord> {
        search_dispatches(&self.merged, term)
    }

    pub fn fetch_error(&self) -> Option<&str> {
        self.fetch_error.as_deref()
    }

    pub fn spreadsheet_len(&self) -> usize {
        self.spreadsheet.len()
    }

    fn recompute(&mut self) {
        self.merged = merge_dispatches(&self.database, &self.spreadsheet);
    }
}

/// Filtered snapshot handed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchView {
    pub records: Vec<DispatchRecord>,
    /// Size of the merged set before filtering.
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
}

/// Session-scoped reconciliation of stored and imported dispatches.
#[derive(Clone)]
pub struct DispatchReconciliationService {
    store: Arc<dyn DispatchStore>,
    importer: SpreadsheetImporter,
    board: Arc<RwLock<DispatchBoard>>,
}

impl DispatchReconciliationService {
    pub fn new(store: Arc<dyn DispatchStore>, importer: SpreadsheetImporter) -> Self {
        Self {
            store,
            importer,
            board: Arc::new(RwLock::new(DispatchBoard::new())),
        }
    }

    /// Re-reads the store. Errors are recorded on the board, not returned.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> DispatchView {
        let outcome = self
            .store
            .list_recent()
            .await
            .map(|rows| rows.into_iter().map(DispatchRecord::from).collect::<Vec<_>>())
            .map_err(|e| {
                warn!(error = %e, "dispatch fetch failed, keeping spreadsheet rows");
                e.response_message()
            });

        let mut board = self.board.write().await;
        board.apply_fetch(outcome);
        info!(merged = board.merged().len(), "dispatches reconciled");
        view_of(&board, "")
    }

    /// Replaces the imported spreadsheet rows.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn import_spreadsheet(&self, rows: &[SpreadsheetRow]) -> DispatchView {
        let records = self.importer.map_rows(rows, Utc::now());
        let mut board = self.board.write().await;
        board.set_spreadsheet(records);
        view_of(&board, "")
    }

    #[instrument(skip(self))]
    pub async fn clear_spreadsheet(&self) -> DispatchView {
        let mut board = self.board.write().await;
        board.clear_spreadsheet();
        view_of(&board, "")
    }

    pub async fn view(&self, search: Option<&str>) -> DispatchView {
        let board = self.board.read().await;
        view_of(&board, search.unwrap_or_default())
    }

    pub async fn fetch_error(&self) -> Option<String> {
        self.board.read().await.fetch_error().map(str::to_string)
    }

    /// Persists a new dispatch and refreshes the merged view.
    #[instrument(skip(self, payload), fields(order_id = %payload.order_id))]
    pub async fn create_dispatch(
        &self,
        payload: NewDispatch,
    ) -> Result<DispatchRecord, ServiceError> {
        payload.validate()?;
        let created = self.store.insert(payload, Utc::now()).await?;
        info!(dispatch_id = %created.id, "dispatch created");
        self.refresh().await;
        Ok(DispatchRecord::from(created))
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        status: String,
    ) -> Result<DispatchRecord, ServiceError> {
        if status.trim().is_empty() {
            return Err(ServiceError::InvalidInput("Status cannot be empty".into()));
        }
        let updated = self.store.update_status(id, status, Utc::now()).await?;
        self.refresh().await;
        Ok(DispatchRecord::from(updated))
    }
}

fn view_of(board: &DispatchBoard, search: &str) -> DispatchView {
    DispatchView {
        records: board.search(search).into_iter().cloned().collect(),
        total: board.merged().len(),
        fetch_error: board.fetch_error().map(str::to_string),
    }
}
