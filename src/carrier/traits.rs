//! Carrier trait definitions
//!
//! A carrier turns a shipment record into a tracking PIN and can hand back
//! the printable label for a PIN. Shipping integration and the batch runner
//! only see this trait.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::config::CarrierSettings;
use crate::domain::{ShipmentRecord, ShipmentResult};

// ============================================================================
// Error Types
// ============================================================================

/// Carrier error types
#[derive(Debug, Error)]
pub enum CarrierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Error parsing response: {0}")]
    ParseError(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Carrier not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid document data: {0}")]
    InvalidDocument(String),
}

/// Result type for carrier operations
pub type CarrierResult<T> = Result<T, CarrierError>;

// ============================================================================
// Credentials
// ============================================================================

/// Web service credentials plus the account shipments are billed to
#[derive(Debug, Clone)]
pub struct CarrierCredentials {
    pub username: String,
    pub password: String,
    pub account_number: String,
}

impl CarrierCredentials {
    /// Take credentials from settings, failing when any are missing
    pub fn from_settings(settings: &CarrierSettings) -> CarrierResult<Self> {
        let missing = settings.missing_credentials();
        if !missing.is_empty() {
            return Err(CarrierError::NotConfigured(format!(
                "Missing API credentials: {}",
                missing.join(", ")
            )));
        }
        Ok(CarrierCredentials {
            username: settings.api_username.clone(),
            password: settings.api_password.clone(),
            account_number: settings.account_number.clone(),
        })
    }
}

// ============================================================================
// Carrier Trait
// ============================================================================

/// Parcel carrier integration
#[async_trait]
pub trait Carrier: Send + Sync {
    /// Carrier code (e.g. "purolator")
    fn code(&self) -> &'static str;

    /// Display name
    fn name(&self) -> &'static str;

    /// Create one shipment.
    ///
    /// Rejections by the carrier (non-200, no PIN) come back as an `Error`
    /// result carrying the carrier's message. `Err` is reserved for transport
    /// failures and payloads that could not be built.
    async fn create_shipment(&self, shipment: &ShipmentRecord) -> CarrierResult<ShipmentResult>;

    /// Fetch the printable label (PDF bytes) for a shipment PIN
    async fn fetch_label(&self, shipment_pin: &str) -> CarrierResult<Bytes>;
}

/// Stand-in used when credentials are missing, so read-only surfaces keep
/// working and shipment calls fail with the configuration problem.
#[derive(Debug, Clone)]
pub struct UnavailableCarrier {
    reason: String,
}

impl UnavailableCarrier {
    pub fn new(reason: impl Into<String>) -> Self {
        UnavailableCarrier { reason: reason.into() }
    }
}

#[async_trait]
impl Carrier for UnavailableCarrier {
    fn code(&self) -> &'static str {
        "unavailable"
    }

    fn name(&self) -> &'static str {
        "Unavailable"
    }

    async fn create_shipment(&self, _shipment: &ShipmentRecord) -> CarrierResult<ShipmentResult> {
        Err(CarrierError::NotConfigured(self.reason.clone()))
    }

    async fn fetch_label(&self, _shipment_pin: &str) -> CarrierResult<Bytes> {
        Err(CarrierError::NotConfigured(self.reason.clone()))
    }
}
