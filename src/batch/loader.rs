//! Batch CSV loading and the blank template

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use super::BatchError;
use crate::config::SenderSettings;
use crate::domain::shipment::SHIPMENT_CSV_COLUMNS;
use crate::domain::{validate_shipment, ShipmentRecord};

/// Validation problems shown in full; the rest are only counted
pub const MAX_DISPLAYED_ERRORS: usize = 10;

/// A row that failed validation. `row` is the file line (header is line 1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

/// A validated shipment and the file line it was read from
#[derive(Debug, Clone)]
pub struct BatchRow {
    pub row: usize,
    pub record: ShipmentRecord,
}

/// Valid rows ready to ship plus the rows that were skipped
#[derive(Debug, Default)]
pub struct LoadedBatch {
    pub shipments: Vec<BatchRow>,
    pub errors: Vec<RowError>,
}

impl LoadedBatch {
    /// First ten errors, one per line, then a count of the rest
    pub fn error_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        let mut lines: Vec<String> = self
            .errors
            .iter()
            .take(MAX_DISPLAYED_ERRORS)
            .map(ToString::to_string)
            .collect();
        if self.errors.len() > MAX_DISPLAYED_ERRORS {
            lines.push(format!("... and {} more errors", self.errors.len() - MAX_DISPLAYED_ERRORS));
        }
        Some(lines.join("\n"))
    }
}

/// Parse shipment rows, filling defaults and validating each row on its
/// own. Invalid rows are collected, not fatal.
pub fn parse_shipments(data: &[u8], sender: &SenderSettings) -> Result<LoadedBatch, BatchError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(data);
    let mut batch = LoadedBatch::default();

    for (index, row) in reader.deserialize::<ShipmentRecord>().enumerate() {
        let row_number = index + 2;
        let record = match row {
            Ok(record) => record.with_defaults(sender),
            Err(e) => {
                batch.errors.push(RowError {
                    row: row_number,
                    message: format!("Unreadable row: {}", e),
                });
                continue;
            }
        };
        match validate_shipment(&record) {
            Ok(()) => batch.shipments.push(BatchRow {
                row: row_number,
                record,
            }),
            Err(e) => batch.errors.push(RowError {
                row: row_number,
                message: e.to_string(),
            }),
        }
    }

    Ok(batch)
}

/// Load a batch CSV from disk
pub async fn load_shipments(path: &Path, sender: &SenderSettings) -> Result<LoadedBatch, BatchError> {
    let data = tokio::fs::read(path).await?;
    let batch = parse_shipments(&data, sender)?;

    info!(
        path = %path.display(),
        valid = batch.shipments.len(),
        invalid = batch.errors.len(),
        "Batch file loaded"
    );
    if let Some(summary) = batch.error_summary() {
        warn!(count = batch.errors.len(), "These rows will be skipped:\n{}", summary);
    }
    Ok(batch)
}

fn template_row() -> ShipmentRecord {
    ShipmentRecord {
        sender_name: "John Doe".to_string(),
        sender_street: "123 Main St".to_string(),
        sender_city: "Toronto".to_string(),
        sender_province: "ON".to_string(),
        sender_postal: "L5N3B5".to_string(),
        sender_phone: "416-123-4567".to_string(),
        receiver_name: "Jane Smith".to_string(),
        receiver_street: "456 Elm St".to_string(),
        receiver_city: "Montreal".to_string(),
        receiver_province: "QC".to_string(),
        receiver_postal: "K7M6G2".to_string(),
        receiver_country: "CA".to_string(),
        receiver_phone: "613-987-6543".to_string(),
        service_id: "PurolatorExpress".to_string(),
        weight: "2.5".to_string(),
        length: "30".to_string(),
        width: "20".to_string(),
        height: "10".to_string(),
        payment_type: "Sender".to_string(),
        reference: "ORDER-001".to_string(),
    }
}

/// Write a template with every column and one sample row
pub async fn write_template(path: &Path) -> Result<(), BatchError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(SHIPMENT_CSV_COLUMNS)?;
    writer.serialize(template_row())?;
    let bytes = writer.into_inner().map_err(|e| BatchError::Io(e.into_error()))?;
    tokio::fs::write(path, bytes).await?;

    info!(path = %path.display(), "Batch template written");
    Ok(())
}
