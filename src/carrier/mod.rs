//! Parcel Carrier Integration Module
//!
//! Everything that talks to the carrier's SOAP web services: envelope
//! building, response parsing and label retrieval.
//!
//! # Architecture
//!
//! ```text
//!   ShipmentRecord ──► Carrier trait ──► PurolatorCarrier
//!                                          │
//!                          request.rs ─────┤ (SoapWriter, escaped)
//!                          SoapClient ─────┤ (basic auth, 30s timeout)
//!                          response.rs ◄───┘ (PIN / error / documents)
//! ```

pub mod traits;
pub mod http_client;
pub mod xml;
pub mod purolator;
#[cfg(test)]
pub mod fake;

// Re-export commonly used types
pub use traits::{Carrier, CarrierCredentials, CarrierError, CarrierResult, UnavailableCarrier};
pub use http_client::SoapClient;
pub use purolator::PurolatorCarrier;
