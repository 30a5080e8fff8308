//! CSV and JSON rendering of a resource's filtered records.

use serde::{Deserialize, Serialize};

use super::Resource;
use crate::errors::AppError;

/// Export file format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

/// Query parameter selecting the export format.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

/// Exported file contents.
#[derive(Debug, Clone)]
pub struct Export {
    pub content_type: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub fn export_file_name<R: Resource>(format: ExportFormat) -> String {
    format!("{}.{}", R::NAME, format.as_str())
}

/// Serialize `records` with the resource's fixed column order.
pub fn render<R: Resource>(records: &[R], format: ExportFormat) -> Result<Export, AppError> {
    let bytes = match format {
        ExportFormat::Csv => render_csv(records)?,
        ExportFormat::Json => serde_json::to_vec_pretty(records)?,
    };

    Ok(Export {
        content_type: format.content_type().to_string(),
        file_name: export_file_name::<R>(format),
        bytes,
    })
}

fn render_csv<R: Resource>(records: &[R]) -> Result<Vec<u8>, AppError> {
    let csv_error = |e: csv::Error| AppError::Internal(format!("CSV error: {}", e));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(R::CSV_COLUMNS).map_err(csv_error)?;
    for record in records {
        writer.write_record(record.csv_row()).map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::store::Seeded;

    #[test]
    fn test_csv_has_header_and_one_row_per_record() {
        let roles = Role::seed();
        let export = render(&roles, ExportFormat::Csv).unwrap();
        let text = String::from_utf8(export.bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], Role::CSV_COLUMNS.join(","));
        assert_eq!(lines.len(), roles.len() + 1);
        assert_eq!(export.file_name, "roles.csv");
        assert!(export.content_type.starts_with("text/csv"));
    }

    #[test]
    fn test_csv_quotes_fields_with_commas() {
        let mut roles = Role::seed();
        roles.truncate(1);
        roles[0].description = "Front desk, bookings".into();

        let export = render(&roles, ExportFormat::Csv).unwrap();
        let text = String::from_utf8(export.bytes).unwrap();
        assert!(text.contains("\"Front desk, bookings\""));
    }

    #[test]
    fn test_json_export_round_trips_records() {
        let roles = Role::seed();
        let export = render(&roles, ExportFormat::Json).unwrap();
        let parsed: Vec<Role> = serde_json::from_slice(&export.bytes).unwrap();
        assert_eq!(parsed, roles);
    }
}
