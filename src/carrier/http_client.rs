//! HTTP client for SOAP web services
//!
//! Wraps a `reqwest::Client` with the carrier's basic-auth credentials and
//! the headers every SOAP call needs.

use bytes::Bytes;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::traits::{CarrierCredentials, CarrierError, CarrierResult};

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Raw SOAP response; non-2xx statuses are returned, not raised,
/// because faults carry their message in the body
#[derive(Debug, Clone)]
pub struct SoapResponse {
    pub status: u16,
    pub body: String,
}

/// Authenticated SOAP client
pub struct SoapClient {
    client: Client,
    username: String,
    password: String,
}

impl SoapClient {
    /// Create a client with the given request timeout
    pub fn new(credentials: &CarrierCredentials, timeout: Duration) -> CarrierResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("rf-ship/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(SoapClient {
            client,
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        })
    }

    /// POST an envelope with the given SOAPAction
    pub async fn call(&self, url: &str, soap_action: &str, envelope: String) -> CarrierResult<SoapResponse> {
        let action = HeaderValue::from_str(soap_action)
            .map_err(|e| CarrierError::Xml(format!("invalid SOAPAction: {}", e)))?;

        debug!(url, soap_action, bytes = envelope.len(), "Sending SOAP request");

        let response = self
            .client
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header("SOAPAction", action)
            .body(envelope)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(status, bytes = body.len(), "SOAP response received");

        Ok(SoapResponse { status, body })
    }

    /// Download a document linked from a response
    pub async fn get_bytes(&self, url: &str) -> CarrierResult<Bytes> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CarrierError::ApiError {
                status: status.as_u16(),
                message: format!("document download failed: {}", url),
            });
        }

        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_from_credentials() {
        let credentials = CarrierCredentials {
            username: "key".to_string(),
            password: "secret".to_string(),
            account_number: "9999999999".to_string(),
        };
        let client = SoapClient::new(&credentials, Duration::from_secs(5)).unwrap();
        assert_eq!(client.username, "key");
    }
}
