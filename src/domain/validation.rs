//! Shipment validation
//!
//! Checks run before any carrier call. A failure is a typed error whose
//! `Display` is the message shown to operators and written to result rows.

use thiserror::Error;

use super::address::is_valid_postal_code;
use super::shipment::ShipmentRecord;

/// Heaviest package the carrier accepts on these services
pub const MAX_WEIGHT_KG: f64 = 75.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid postal code for {country}: {postal}")]
    InvalidPostalCode { postal: String, country: String },

    #[error("Weight must be greater than 0")]
    WeightNotPositive,

    #[error("Weight exceeds maximum ({} kg)", MAX_WEIGHT_KG)]
    WeightTooHeavy,

    #[error("Invalid weight value: {0}")]
    InvalidWeight(String),

    #[error("{0} must be greater than 0")]
    DimensionNotPositive(&'static str),

    #[error("Invalid {} value: {value}", .dimension.to_lowercase())]
    InvalidDimension { dimension: &'static str, value: String },
}

/// Validate a shipment record. Returns the first problem found.
pub fn validate_shipment(record: &ShipmentRecord) -> Result<(), ValidationError> {
    let required = [
        ("receiver_name", &record.receiver_name),
        ("receiver_street", &record.receiver_street),
        ("receiver_city", &record.receiver_city),
        ("receiver_province", &record.receiver_province),
        ("receiver_postal", &record.receiver_postal),
        ("receiver_country", &record.receiver_country),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField(field));
        }
    }

    if !is_valid_postal_code(&record.receiver_postal, &record.receiver_country) {
        return Err(ValidationError::InvalidPostalCode {
            postal: record.receiver_postal.clone(),
            country: record.receiver_country.clone(),
        });
    }

    validate_weight(&record.weight)?;

    for (dimension, value) in [
        ("Length", &record.length),
        ("Width", &record.width),
        ("Height", &record.height),
    ] {
        validate_dimension(dimension, value)?;
    }

    Ok(())
}

fn validate_weight(raw: &str) -> Result<(), ValidationError> {
    let weight = parse_number(raw).ok_or_else(|| ValidationError::InvalidWeight(raw.to_string()))?;
    if weight <= 0.0 {
        return Err(ValidationError::WeightNotPositive);
    }
    if weight > MAX_WEIGHT_KG {
        return Err(ValidationError::WeightTooHeavy);
    }
    Ok(())
}

fn validate_dimension(dimension: &'static str, raw: &str) -> Result<(), ValidationError> {
    let value = parse_number(raw).ok_or_else(|| ValidationError::InvalidDimension {
        dimension,
        value: raw.to_string(),
    })?;
    if value <= 0.0 {
        return Err(ValidationError::DimensionNotPositive(dimension));
    }
    Ok(())
}

/// Finite decimal number, surrounding whitespace ignored
fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
