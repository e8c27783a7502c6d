//! Purolator E-Ship integration
//!
//! CreateShipment (v2) issues the tracking PIN; GetDocuments (v1) returns
//! the printable label for it.

mod client;
pub mod request;
pub mod response;

pub use client::{PurolatorCarrier, SHIPMENT_CREATED};
