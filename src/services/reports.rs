use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

use crate::models::{DispatchRecord, StatusBadge, StatusCategory};

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

const CSV_DELIMITER: char = ',';

const CSV_HEADERS: [&str; 17] = [
    "id",
    "order_id",
    "source",
    "status",
    "status_label",
    "destination",
    "farm",
    "vehicle_plate",
    "driver_name",
    "driver_id",
    "packages",
    "concentrate_amount",
    "loading_company",
    "zone",
    "created_at",
    "completed_at",
    "eta",
];

/// Renders dispatches as CSV, header first, one line per record.
pub fn export_csv<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a DispatchRecord>,
{
    let mut lines = vec![CSV_HEADERS.join(&CSV_DELIMITER.to_string())];

    for record in records {
        let badge = StatusBadge::for_status(&record.status);
        let row = [
            record.id.clone(),
            record.order_id.clone(),
            record.source.to_string(),
            record.status.clone(),
            badge.label,
            record.destination.clone(),
            record.farm.clone(),
            record.vehicle_plate.clone(),
            record.driver_name.clone(),
            record.driver_id.clone().unwrap_or_default(),
            record.packages.to_string(),
            record
                .concentrate_amount
                .map(|amount| amount.to_string())
                .unwrap_or_default(),
            record.loading_company.clone(),
            record.zone.clone().unwrap_or_default(),
            format_timestamp(record.created_at),
            format_timestamp(record.completed_at),
            format_timestamp(record.eta),
        ];

        let escaped: Vec<String> = row
            .iter()
            .map(|field| escape_field(field, CSV_DELIMITER))
            .collect();
        lines.push(escaped.join(&CSV_DELIMITER.to_string()));
    }

    let mut body = lines.join("\n");
    body.push('\n');
    body
}

fn format_timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map(|ts| ts.to_rfc3339()).unwrap_or_default()
}

fn escape_field(value: &str, delimiter: char) -> String {
    if value.contains(delimiter) || value.contains('"') || value.contains('\n') || value.contains('\r') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub category: StatusCategory,
    pub label: &'static str,
    pub count: usize,
}

/// Counts per status category over a set of dispatches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub total: usize,
    /// Every category, in badge order, including empty ones.
    pub by_status: Vec<StatusCount>,
    pub total_packages: u64,
    pub total_concentrate: Decimal,
}

pub fn summarize_by_status<'a, I>(records: I) -> DispatchSummary
where
    I: IntoIterator<Item = &'a DispatchRecord>,
{
    let mut counts: BTreeMap<StatusCategory, usize> = BTreeMap::new();
    let mut total = 0;
    let mut total_packages = 0u64;
    let mut total_concentrate = Decimal::ZERO;

    for record in records {
        total += 1;
        total_packages += u64::from(record.packages);
        total_concentrate =
            total_concentrate.saturating_add(record.concentrate_amount.unwrap_or(Decimal::ZERO));
        *counts.entry(record.status_category()).or_default() += 1;
    }

    let by_status = StatusCategory::iter()
        .map(|category| StatusCount {
            category,
            label: category.label(),
            count: counts.get(&category).copied().unwrap_or(0),
        })
        .collect();

    DispatchSummary {
        total,
        by_status,
        total_packages,
        total_concentrate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DispatchSource;
    use rust_decimal_macros::dec;

    fn record(order_id: &str, status: &str) -> DispatchRecord {
        DispatchRecord {
            id: format!("excel-{order_id}"),
            order_id: order_id.into(),
            source: DispatchSource::Spreadsheet,
            destination: "Planta Bucaramanga".into(),
            farm: "La Esperanza".into(),
            vehicle_plate: "TKR512".into(),
            driver_name: "Carlos Rincon".into(),
            driver_id: None,
            packages: 10,
            concentrate_amount: Some(dec!(2.5)),
            loading_company: "Cargas del Oriente".into(),
            zone: None,
            status: status.into(),
            created_at: None,
            accepted_at: None,
            completed_at: None,
            eta: None,
        }
    }

    #[test]
    fn csv_has_fixed_header_and_normalized_label() {
        let csv = export_csv(&[record("B2", "en ruta")]);
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADERS.join(","));
        let row = lines.next().unwrap();
        assert!(row.starts_with("excel-B2,B2,spreadsheet,en ruta,En ruta,"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn csv_quotes_delimiters_quotes_and_newlines() {
        assert_eq!(escape_field("plain", ','), "plain");
        assert_eq!(escape_field("Granja, lote 3", ','), "\"Granja, lote 3\"");
        assert_eq!(escape_field("el \"Mono\"", ','), "\"el \"\"Mono\"\"\"");
        assert_eq!(escape_field("dos\nlineas", ','), "\"dos\nlineas\"");

        let mut tricky = record("C3", "pendiente");
        tricky.destination = "Girón, Santander".into();
        let csv = export_csv(&[tricky]);
        assert!(csv.contains("\"Girón, Santander\""));
    }

    #[test]
    fn empty_export_is_header_only() {
        let csv = export_csv(std::iter::empty());
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn summary_total_saturates_instead_of_overflowing() {
        let mut first = record("G1", "pendiente");
        first.concentrate_amount = Some(Decimal::MAX);
        let mut second = record("G2", "pendiente");
        second.concentrate_amount = Some(Decimal::MAX);

        let summary = summarize_by_status(&[first, second]);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.total_concentrate, Decimal::MAX);
    }

    #[test]
    fn summary_counts_synonyms_together() {
        let records = vec![
            record("A1", "pending"),
            record("A2", "Pendiente"),
            record("A3", "completado"),
            record("A4", "en bascula"),
        ];
        let summary = summarize_by_status(&records);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.total_packages, 40);
        assert_eq!(summary.total_concentrate, dec!(10.0));
        assert_eq!(summary.by_status.len(), 7);
        let count = |category| {
            summary
                .by_status
                .iter()
                .find(|c| c.category == category)
                .unwrap()
                .count
        };
        assert_eq!(count(StatusCategory::Pending), 2);
        assert_eq!(count(StatusCategory::Completed), 1);
        assert_eq!(count(StatusCategory::Unrecognized), 1);
        assert_eq!(count(StatusCategory::Cancelled), 0);
    }
}
