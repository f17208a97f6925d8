use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::entities::dispatch;

/// Status written for spreadsheet rows that carry none.
pub const DEFAULT_SPREADSHEET_STATUS: &str = "pendiente";

/// Where a dispatch record came from. Recomputed on every load, never stored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DispatchSource {
    Database,
    Spreadsheet,
}

/// One shipment of birds or concentrate from a farm to a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub id: String,
    pub order_id: String,
    pub source: DispatchSource,
    pub destination: String,
    pub farm: String,
    pub vehicle_plate: String,
    pub driver_name: String,
    pub driver_id: Option<String>,
    pub packages: u32,
    pub concentrate_amount: Option<Decimal>,
    pub loading_company: String,
    pub zone: Option<String>,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub eta: Option<DateTime<Utc>>,
}

impl DispatchRecord {
    /// Fields covered by free-text search, in display order.
    pub fn searchable_fields(&self) -> [&str; 6] {
        [
            self.order_id.as_str(),
            self.destination.as_str(),
            self.farm.as_str(),
            self.vehicle_plate.as_str(),
            self.driver_name.as_str(),
            self.loading_company.as_str(),
        ]
    }

    /// Case-insensitive substring match; `needle` must already be lowercase.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.searchable_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }

    pub fn status_category(&self) -> StatusCategory {
        StatusCategory::from_status(&self.status)
    }
}

impl From<dispatch::Model> for DispatchRecord {
    fn from(model: dispatch::Model) -> Self {
        Self {
            id: model.id.to_string(),
            order_id: model.order_id,
            source: DispatchSource::Database,
            destination: model.destination,
            farm: model.farm,
            vehicle_plate: model.vehicle_plate,
            driver_name: model.driver_name,
            driver_id: model.driver_id,
            packages: u32::try_from(model.packages).unwrap_or(0),
            concentrate_amount: model.concentrate_amount,
            loading_company: model.loading_company,
            zone: model.zone,
            status: model.status,
            created_at: Some(model.created_at),
            accepted_at: model.accepted_at,
            completed_at: model.completed_at,
            eta: model.eta,
        }
    }
}

/// Canonical display categories for the status synonyms used by dispatchers
/// (English values from the app, Spanish values from the spreadsheets).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Pending,
    Accepted,
    InProgress,
    Delayed,
    Completed,
    Cancelled,
    Unrecognized,
}

impl StatusCategory {
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "pending" | "pendiente" => Self::Pending,
            "accepted" | "aceptado" => Self::Accepted,
            "in_progress" | "en_ruta" | "en ruta" => Self::InProgress,
            "delayed" | "demorado" => Self::Delayed,
            "completed" | "completado" => Self::Completed,
            "cancelled" | "cancelado" => Self::Cancelled,
            _ => Self::Unrecognized,
        }
    }

    /// Label shown on status badges.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pendiente",
            Self::Accepted => "Aceptado",
            Self::InProgress => "En ruta",
            Self::Delayed => "Demorado",
            Self::Completed => "Completado",
            Self::Cancelled => "Cancelado",
            Self::Unrecognized => "Sin estado",
        }
    }

    /// Stable key used in summaries and CSV exports.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::Delayed => "delayed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Status label as presented next to a record: the raw value is kept, the
/// category decides the badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub category: StatusCategory,
    pub label: String,
}

impl StatusBadge {
    pub fn for_status(status: &str) -> Self {
        let category = StatusCategory::from_status(status);
        let label = match category {
            StatusCategory::Unrecognized if !status.trim().is_empty() => status.trim().to_string(),
            _ => category.label().to_string(),
        };
        Self { category, label }
    }
}

/// Payload for creating a dispatch in the persistence store.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewDispatch {
    #[validate(
        length(max = 64, message = "Order id must be at most 64 characters"),
        custom = "validate_not_blank"
    )]
    pub order_id: String,
    #[validate(length(max = 255), custom = "validate_not_blank")]
    pub destination: String,
    #[validate(length(max = 255), custom = "validate_not_blank")]
    pub farm: String,
    #[validate(length(max = 16), custom = "validate_not_blank")]
    pub vehicle_plate: String,
    #[validate(length(max = 255), custom = "validate_not_blank")]
    pub driver_name: String,
    pub driver_id: Option<String>,
    #[validate(range(max = 1000000))]
    #[serde(default)]
    pub packages: u32,
    #[validate(custom = "validate_non_negative")]
    pub concentrate_amount: Option<Decimal>,
    #[serde(default)]
    pub loading_company: String,
    pub zone: Option<String>,
    pub status: Option<String>,
    pub eta: Option<DateTime<Utc>>,
}

impl NewDispatch {
    /// Builds the row to insert; new dispatches start as `pending` unless told otherwise.
    pub fn into_model(self, id: Uuid, now: DateTime<Utc>) -> dispatch::Model {
        let status = self
            .status
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "pending".to_string());
        let category = StatusCategory::from_status(&status);

        dispatch::Model {
            id,
            order_id: self.order_id.trim().to_string(),
            destination: self.destination.trim().to_string(),
            farm: self.farm.trim().to_string(),
            vehicle_plate: self.vehicle_plate.trim().to_uppercase(),
            driver_name: self.driver_name.trim().to_string(),
            driver_id: self.driver_id,
            packages: i32::try_from(self.packages).unwrap_or(i32::MAX),
            concentrate_amount: self.concentrate_amount,
            loading_company: self.loading_company,
            zone: self.zone,
            status,
            created_at: now,
            accepted_at: matches!(category, StatusCategory::Accepted).then_some(now),
            completed_at: matches!(category, StatusCategory::Completed).then_some(now),
            eta: self.eta,
        }
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value is required".into());
        return Err(err);
    }
    Ok(())
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Amount cannot be negative".into());
        return Err(err);
    }
    Ok(())
}
