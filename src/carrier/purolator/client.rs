//! Purolator carrier client

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::request::{
    build_create_shipment, build_get_documents, CREATE_SHIPMENT_ACTION, GET_DOCUMENTS_ACTION,
};
use super::response::{
    error_message_from_body, extract_error_message, extract_shipment_pin, parse_documents,
    LabelDocument,
};
use crate::carrier::http_client::SoapClient;
use crate::carrier::traits::{Carrier, CarrierCredentials, CarrierError, CarrierResult};
use crate::carrier::xml::XmlElement;
use crate::config::CarrierSettings;
use crate::domain::{ResultStatus, ShipmentRecord, ShipmentResult};

pub const SHIPMENT_CREATED: &str = "Shipment created successfully";

/// Purolator E-Ship web services client
pub struct PurolatorCarrier {
    http: SoapClient,
    account_number: String,
    shipment_url: String,
    documents_url: String,
}

impl PurolatorCarrier {
    /// Create a client from settings; fails when credentials are missing
    pub fn new(settings: &CarrierSettings) -> CarrierResult<Self> {
        let credentials = CarrierCredentials::from_settings(settings)?;
        let http = SoapClient::new(&credentials, Duration::from_secs(settings.timeout_secs.max(1)))?;

        Ok(PurolatorCarrier {
            http,
            account_number: credentials.account_number,
            shipment_url: settings.shipment_url.clone(),
            documents_url: settings.documents_url.clone(),
        })
    }
}

#[async_trait]
impl Carrier for PurolatorCarrier {
    fn code(&self) -> &'static str {
        "purolator"
    }

    fn name(&self) -> &'static str {
        "Purolator"
    }

    #[instrument(skip(self, shipment), fields(reference = %shipment.effective_reference()))]
    async fn create_shipment(&self, shipment: &ShipmentRecord) -> CarrierResult<ShipmentResult> {
        let reference = shipment.effective_reference().to_string();
        let built = build_create_shipment(shipment, &self.account_number)?;
        for warning in &built.warnings {
            warn!(reference = %reference, "{}", warning);
        }

        let response = self
            .http
            .call(&self.shipment_url, CREATE_SHIPMENT_ACTION, built.envelope)
            .await?;

        let parsed = XmlElement::parse(&response.body);
        let pin = parsed.as_ref().ok().and_then(extract_shipment_pin);

        let mut result = ShipmentResult::failed(&reference, "");
        result.http_status = Some(response.status);
        result.warnings = built.warnings;

        match (response.status, pin) {
            (200, Some(pin)) => {
                info!(reference = %reference, shipment_pin = %pin, "Shipment created");
                result.status = ResultStatus::Success;
                result.shipment_pin = Some(pin);
                result.message = SHIPMENT_CREATED.to_string();
            }
            (status, _) => {
                result.message = match &parsed {
                    Ok(root) => extract_error_message(root),
                    Err(_) => error_message_from_body(&response.body),
                };
                warn!(reference = %reference, status, message = %result.message, "Shipment rejected");
            }
        }

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn fetch_label(&self, shipment_pin: &str) -> CarrierResult<Bytes> {
        let envelope = build_get_documents(shipment_pin)?;
        let response = self
            .http
            .call(&self.documents_url, GET_DOCUMENTS_ACTION, envelope)
            .await?;

        if response.status != 200 {
            return Err(CarrierError::ApiError {
                status: response.status,
                message: error_message_from_body(&response.body),
            });
        }

        let root = XmlElement::parse(&response.body)?;
        match parse_documents(&root)? {
            LabelDocument::Inline(bytes) => {
                debug!(bytes = bytes.len(), "Label returned inline");
                Ok(Bytes::from(bytes))
            }
            LabelDocument::Url(url) => {
                debug!(url = %url, "Downloading label");
                self.http.get_bytes(&url).await
            }
        }
    }
}
