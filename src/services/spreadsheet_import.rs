//! Mapping of loosely typed spreadsheet rows into dispatch records.
//!
//! Column names differ between the sheets dispatchers use, so every field is
//! looked up through a list of aliases after normalising the header (lower
//! case, spaces and underscores removed). Bad cells degrade to defaults; a
//! row never fails to map.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::models::dispatch::{DispatchRecord, DispatchSource, DEFAULT_SPREADSHEET_STATUS};

/// One imported row, as posted by the front end.
pub type SpreadsheetRow = Map<String, Value>;

const ID_KEYS: &[&str] = &["id"];
const ORDER_KEYS: &[&str] = &["orderid", "orden", "ordenid", "numeroorden", "pedido"];
const DESTINATION_KEYS: &[&str] = &["destination", "destino"];
const FARM_KEYS: &[&str] = &["farm", "granja"];
const PLATE_KEYS: &[&str] = &["vehicleplate", "placa", "placavehiculo"];
const DRIVER_NAME_KEYS: &[&str] = &["drivername", "conductor", "nombreconductor"];
const DRIVER_ID_KEYS: &[&str] = &["driverid", "cedulaconductor", "idconductor"];
const PACKAGES_KEYS: &[&str] = &["packages", "paquetes", "bultos"];
const CONCENTRATE_KEYS: &[&str] = &["concentrateamount", "concentrado"];
const LOADING_COMPANY_KEYS: &[&str] = &["loadingcompany", "empresacargue", "empresa"];
const ZONE_KEYS: &[&str] = &["zone", "zona"];
const STATUS_KEYS: &[&str] = &["status", "estado"];
const ETA_KEYS: &[&str] = &["eta", "horaestimada"];

const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Largest concentrate amount a cell may carry; anything above maps to 0.
pub const MAX_CONCENTRATE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

#[derive(Debug, Clone)]
pub struct SpreadsheetImporter {
    id_prefix: String,
}

impl Default for SpreadsheetImporter {
    fn default() -> Self {
        Self::new("excel-")
    }
}

impl SpreadsheetImporter {
    pub fn new(id_prefix: impl Into<String>) -> Self {
        Self {
            id_prefix: id_prefix.into(),
        }
    }

    pub fn map_rows(&self, rows: &[SpreadsheetRow], now: DateTime<Utc>) -> Vec<DispatchRecord> {
        rows.iter().map(|row| self.map_row(row, now)).collect()
    }

    /// `now` becomes the record's `created_at`.
    pub fn map_row(&self, row: &SpreadsheetRow, now: DateTime<Utc>) -> DispatchRecord {
        let cells = NormalizedRow::new(row);

        let order_id = cells.text(ORDER_KEYS).unwrap_or_default();
        let id = cells
            .text(ID_KEYS)
            .unwrap_or_else(|| format!("{}{}", self.id_prefix, order_id));

        DispatchRecord {
            id,
            order_id,
            source: DispatchSource::Spreadsheet,
            destination: cells.text(DESTINATION_KEYS).unwrap_or_default(),
            farm: cells.text(FARM_KEYS).unwrap_or_default(),
            vehicle_plate: cells.text(PLATE_KEYS).unwrap_or_default(),
            driver_name: cells.text(DRIVER_NAME_KEYS).unwrap_or_default(),
            driver_id: cells.text(DRIVER_ID_KEYS),
            packages: cells.first(PACKAGES_KEYS).map(parse_packages).unwrap_or(0),
            concentrate_amount: Some(
                cells
                    .first_non_empty(CONCENTRATE_KEYS)
                    .map(parse_decimal)
                    .unwrap_or(Decimal::ZERO),
            ),
            loading_company: cells.text(LOADING_COMPANY_KEYS).unwrap_or_default(),
            zone: cells.text(ZONE_KEYS),
            status: cells
                .text(STATUS_KEYS)
                .unwrap_or_else(|| DEFAULT_SPREADSHEET_STATUS.to_string()),
            created_at: Some(now),
            accepted_at: None,
            completed_at: None,
            eta: cells.text(ETA_KEYS).as_deref().and_then(parse_timestamp),
        }
    }
}

struct NormalizedRow<'a> {
    cells: Vec<(String, &'a Value)>,
}

impl<'a> NormalizedRow<'a> {
    fn new(row: &'a SpreadsheetRow) -> Self {
        let cells = row
            .iter()
            .map(|(key, value)| (normalize_key(key), value))
            .collect();
        Self { cells }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.cells
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| *value)
    }

    /// First alias present in the row, even when its cell is blank.
    fn first(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter().find_map(|key| self.get(key))
    }

    fn first_non_empty(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter()
            .filter_map(|key| self.get(key))
            .find(|value| !is_blank(value))
    }

    fn text(&self, keys: &[&str]) -> Option<String> {
        self.first_non_empty(keys).and_then(cell_text)
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Integer from a numeric-looking cell: leading digits of text, truncated
/// floats. Anything else, including negatives, is 0.
fn parse_packages(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64))
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .trim_start_matches('+')
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            digits.parse().unwrap_or(0)
        }
        _ => 0,
    }
}

fn parse_decimal(value: &Value) -> Decimal {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().replace(',', "."),
        _ => return Decimal::ZERO,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
        .filter(|amount| *amount >= Decimal::ZERO && *amount <= MAX_CONCENTRATE)
        .unwrap_or(Decimal::ZERO)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, LOCAL_DATETIME_FORMAT)
                .ok()
                .map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn row(value: Value) -> SpreadsheetRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("row fixtures must be objects"),
        }
    }

    #[test]
    fn maps_spanish_headers() {
        let now = Utc::now();
        let record = SpreadsheetImporter::default().map_row(
            &row(json!({
                "Orden": "B2",
                "Destino": "Planta Girón",
                "Granja": "El Porvenir",
                "Placa": "SXT 204",
                "Conductor": "Luis Pabón",
                "Paquetes": "85",
                "Concentrado": "12,5",
                "Empresa Cargue": "Transportes Andinos",
                "Estado": "completado"
            })),
            now,
        );

        assert_eq!(record.id, "excel-B2");
        assert_eq!(record.order_id, "B2");
        assert_eq!(record.source, DispatchSource::Spreadsheet);
        assert_eq!(record.destination, "Planta Girón");
        assert_eq!(record.vehicle_plate, "SXT 204");
        assert_eq!(record.packages, 85);
        assert_eq!(record.concentrate_amount, Some(dec!(12.5)));
        assert_eq!(record.loading_company, "Transportes Andinos");
        assert_eq!(record.status, "completado");
        assert_eq!(record.created_at, Some(now));
    }

    #[test]
    fn row_id_wins_over_synthesized_id() {
        let importer = SpreadsheetImporter::new("sheet:");
        let with_id = importer.map_row(&row(json!({"id": 17, "orderId": "C3"})), Utc::now());
        assert_eq!(with_id.id, "17");

        let without = importer.map_row(&row(json!({"order_id": "C3"})), Utc::now());
        assert_eq!(without.id, "sheet:C3");
    }

    #[test]
    fn malformed_cells_degrade_to_defaults() {
        let record = SpreadsheetImporter::default().map_row(
            &row(json!({
                "orden": "D4",
                "paquetes": "muchos",
                "concentrado": "n/a",
                "estado": "   "
            })),
            Utc::now(),
        );

        assert_eq!(record.packages, 0);
        assert_eq!(record.concentrate_amount, Some(Decimal::ZERO));
        assert_eq!(record.status, DEFAULT_SPREADSHEET_STATUS);
        assert_eq!(record.destination, "");
        assert_eq!(record.eta, None);
    }

    #[test]
    fn empty_row_still_maps() {
        let record = SpreadsheetImporter::default().map_row(&SpreadsheetRow::new(), Utc::now());
        assert_eq!(record.order_id, "");
        assert_eq!(record.id, "excel-");
        assert_eq!(record.packages, 0);
    }

    #[test]
    fn packages_accept_numbers_and_leading_digits() {
        assert_eq!(parse_packages(&json!(42)), 42);
        assert_eq!(parse_packages(&json!(42.9)), 42);
        assert_eq!(parse_packages(&json!("120 cajas")), 120);
        assert_eq!(parse_packages(&json!(-3)), 0);
        assert_eq!(parse_packages(&json!("-3")), 0);
        assert_eq!(parse_packages(&json!(true)), 0);
    }

    #[test]
    fn concentrate_uses_first_non_empty_alias() {
        let record = SpreadsheetImporter::default().map_row(
            &row(json!({"orden": "E5", "concentrate_amount": "", "concentrado": 7.25})),
            Utc::now(),
        );
        assert_eq!(record.concentrate_amount, Some(dec!(7.25)));
    }

    #[test]
    fn out_of_range_concentrate_falls_back_to_zero() {
        let importer = SpreadsheetImporter::default();
        let huge = importer.map_row(
            &row(json!({"orden": "F6", "concentrado": "79228162514264337593543950335"})),
            Utc::now(),
        );
        assert_eq!(huge.concentrate_amount, Some(Decimal::ZERO));

        assert_eq!(parse_decimal(&json!("-4,5")), Decimal::ZERO);
        assert_eq!(parse_decimal(&json!(1e30)), Decimal::ZERO);
        assert_eq!(parse_decimal(&json!("1000000000")), MAX_CONCENTRATE);
    }

    #[test]
    fn eta_accepts_rfc3339_and_local_format() {
        assert!(parse_timestamp("2026-03-02T14:30:00-05:00").is_some());
        let local = parse_timestamp("2026-03-02 14:30").unwrap();
        assert_eq!(local.to_rfc3339(), "2026-03-02T14:30:00+00:00");
        assert_eq!(parse_timestamp("mañana"), None);
    }
}
