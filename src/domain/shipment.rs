//! Shipment records and results
//!
//! A `ShipmentRecord` is the flat sender/receiver/package row that feeds the
//! carrier request builder. It is what a batch CSV row deserializes into and
//! what the shipping integration assembles from an address book location.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::config::SenderSettings;

pub const DEFAULT_SERVICE_ID: &str = "PurolatorExpress";
pub const DEFAULT_WEIGHT_KG: &str = "2.5";
pub const DEFAULT_LENGTH_CM: &str = "30";
pub const DEFAULT_WIDTH_CM: &str = "20";
pub const DEFAULT_HEIGHT_CM: &str = "10";
pub const DEFAULT_PAYMENT_TYPE: &str = "Sender";
/// Reference used for direct/batch rows that carry none
pub const DEFAULT_BATCH_REFERENCE: &str = "BatchShipment";

/// Column order of batch shipment CSV files
pub const SHIPMENT_CSV_COLUMNS: [&str; 20] = [
    "sender_name",
    "sender_street",
    "sender_city",
    "sender_province",
    "sender_postal",
    "sender_phone",
    "receiver_name",
    "receiver_street",
    "receiver_city",
    "receiver_province",
    "receiver_postal",
    "receiver_country",
    "receiver_phone",
    "service_id",
    "weight",
    "length",
    "width",
    "height",
    "payment_type",
    "reference",
];

/// Flat shipment input: sender, receiver and package fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ShipmentRecord {
    pub sender_name: String,
    pub sender_street: String,
    pub sender_city: String,
    pub sender_province: String,
    pub sender_postal: String,
    pub sender_phone: String,

    pub receiver_name: String,
    pub receiver_street: String,
    pub receiver_city: String,
    pub receiver_province: String,
    pub receiver_postal: String,
    pub receiver_country: String,
    pub receiver_phone: String,

    pub service_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub weight: String,
    #[serde(deserialize_with = "string_or_number")]
    pub length: String,
    #[serde(deserialize_with = "string_or_number")]
    pub width: String,
    #[serde(deserialize_with = "string_or_number")]
    pub height: String,
    pub payment_type: String,
    pub reference: String,
}

impl ShipmentRecord {
    /// Fill empty sender fields from the configured warehouse address and
    /// empty package fields from the package defaults.
    pub fn with_defaults(mut self, sender: &SenderSettings) -> Self {
        fill(&mut self.sender_name, &sender.name);
        fill(&mut self.sender_street, &sender.street);
        fill(&mut self.sender_city, &sender.city);
        fill(&mut self.sender_province, &sender.province);
        fill(&mut self.sender_postal, &sender.postal);
        fill(&mut self.sender_phone, &sender.phone);
        fill(&mut self.receiver_country, "CA");
        fill(&mut self.service_id, DEFAULT_SERVICE_ID);
        fill(&mut self.weight, DEFAULT_WEIGHT_KG);
        fill(&mut self.length, DEFAULT_LENGTH_CM);
        fill(&mut self.width, DEFAULT_WIDTH_CM);
        fill(&mut self.height, DEFAULT_HEIGHT_CM);
        fill(&mut self.payment_type, DEFAULT_PAYMENT_TYPE);
        self
    }

    /// Reference to print on the label and to name files after
    pub fn effective_reference(&self) -> &str {
        let reference = self.reference.trim();
        if reference.is_empty() {
            DEFAULT_BATCH_REFERENCE
        } else {
            reference
        }
    }

    /// Apply package fields, keeping any field the package leaves unset
    pub fn apply_package(&mut self, package: &PackageDetails) {
        let fields = [
            (&mut self.service_id, &package.service_id),
            (&mut self.weight, &package.weight),
            (&mut self.length, &package.length),
            (&mut self.width, &package.width),
            (&mut self.height, &package.height),
            (&mut self.payment_type, &package.payment_type),
            (&mut self.reference, &package.reference),
        ];
        for (target, value) in fields {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                *target = value.trim().to_string();
            }
        }
    }
}

fn fill(field: &mut String, default: &str) {
    if field.trim().is_empty() {
        *field = default.to_string();
    }
}

/// Package details supplied by a caller. Unset fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PackageDetails {
    pub service_id: Option<String>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub weight: Option<String>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub length: Option<String>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub width: Option<String>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub height: Option<String>,
    pub payment_type: Option<String>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub reference: Option<String>,
}

/// Outcome of a single shipment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ResultStatus {
    Success,
    Error,
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultStatus::Success => write!(f, "Success"),
            ResultStatus::Error => write!(f, "Error"),
        }
    }
}

/// Result of one shipment, as reported to callers and written to results CSVs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShipmentResult {
    pub reference: String,
    pub status: ResultStatus,
    pub http_status: Option<u16>,
    pub shipment_pin: Option<String>,
    pub message: String,
    /// Placeholder substitutions made while building the request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_path: Option<String>,
}

impl ShipmentResult {
    /// Build a failed result that never reached (or never left) the carrier
    pub fn failed(reference: &str, message: impl Into<String>) -> Self {
        ShipmentResult {
            reference: reference.to_string(),
            status: ResultStatus::Error,
            http_status: None,
            shipment_pin: None,
            message: message.into(),
            warnings: Vec::new(),
            label_path: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Int(i64),
    Float(f64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::Str(s) => s,
            StringOrNumber::Int(i) => i.to_string(),
            StringOrNumber::Float(f) => f.to_string(),
        }
    }
}

/// JSON callers send weights and dimensions as numbers, CSV rows as text.
/// References stay plain strings so leading zeros survive.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?
        .map(StringOrNumber::into_string)
        .unwrap_or_default())
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(StringOrNumber::into_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_defaults_fills_only_empty_fields() {
        let record = ShipmentRecord {
            sender_name: "Dock 4".to_string(),
            weight: "7".to_string(),
            ..Default::default()
        }
        .with_defaults(&SenderSettings::default());

        assert_eq!(record.sender_name, "Dock 4");
        assert_eq!(record.sender_city, "Toronto");
        assert_eq!(record.weight, "7");
        assert_eq!(record.length, "30");
        assert_eq!(record.service_id, "PurolatorExpress");
        assert_eq!(record.receiver_country, "CA");
        assert_eq!(record.effective_reference(), "BatchShipment");
    }

    #[test]
    fn test_apply_package_keeps_unset_fields() {
        let mut record = ShipmentRecord::default().with_defaults(&SenderSettings::default());
        record.apply_package(&PackageDetails {
            weight: Some("4.2".to_string()),
            reference: Some("PO-881".to_string()),
            ..Default::default()
        });

        assert_eq!(record.weight, "4.2");
        assert_eq!(record.height, "10");
        assert_eq!(record.effective_reference(), "PO-881");
    }

    #[test]
    fn test_package_accepts_numbers() {
        let package: PackageDetails =
            serde_json::from_str(r#"{"weight": 3.5, "length": 40, "reference": "A-1"}"#).unwrap();
        assert_eq!(package.weight.as_deref(), Some("3.5"));
        assert_eq!(package.length.as_deref(), Some("40"));
        assert_eq!(package.width, None);
        assert_eq!(package.reference.as_deref(), Some("A-1"));
    }

    #[test]
    fn test_result_status_serializes_capitalized() {
        let result = ShipmentResult::failed("R1", "boom");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "Error");
        assert!(json.get("warnings").is_none());
    }
}
