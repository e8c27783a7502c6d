//! Domain types for shipment building
//!
//! Address parsing, the flat shipment record shared by every entry point,
//! and the validation rules applied before a carrier call.

pub mod address;
pub mod shipment;
pub mod validation;

pub use shipment::{PackageDetails, ResultStatus, ShipmentRecord, ShipmentResult};
pub use validation::{validate_shipment, ValidationError};
