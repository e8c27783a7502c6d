//! Shipping integration
//!
//! Connects the address book with the carrier: resolves an order or location
//! into a shipment record, validates it, calls the carrier and records the
//! outcome on the order.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::carrier::{Carrier, CarrierError};
use crate::config::SenderSettings;
use crate::db::models::{NewOrder, OrderDetails, OrderStatus, ShippingLocation};
use crate::db::{AddressStore, DbError};
use crate::domain::shipment::SHIPMENT_CSV_COLUMNS;
use crate::domain::{validate_shipment, PackageDetails, ShipmentRecord, ShipmentResult, ValidationError};

/// Errors raised before or around a carrier call
#[derive(Debug, Error)]
pub enum ShippingError {
    #[error("Location {0} not found")]
    LocationNotFound(i64),

    #[error("Order {0} not found")]
    OrderNotFound(String),

    #[error("Order {order_id} already shipped (PIN: {shipment_pin})")]
    AlreadyShipped { order_id: String, shipment_pin: String },

    #[error("Order {0} is cancelled")]
    OrderCancelled(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Store(#[from] DbError),

    #[error("Carrier error: {0}")]
    Carrier(#[from] CarrierError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-order entry of a batch ship
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderShipmentResult {
    pub order_id: String,
    #[serde(flatten)]
    pub result: ShipmentResult,
}

/// Address book to carrier bridge
#[derive(Clone)]
pub struct ShippingIntegration {
    store: Arc<dyn AddressStore>,
    carrier: Arc<dyn Carrier>,
    sender: SenderSettings,
}

impl ShippingIntegration {
    pub fn new(store: Arc<dyn AddressStore>, carrier: Arc<dyn Carrier>, sender: SenderSettings) -> Self {
        ShippingIntegration { store, carrier, sender }
    }

    pub fn store(&self) -> &Arc<dyn AddressStore> {
        &self.store
    }

    pub fn carrier(&self) -> &Arc<dyn Carrier> {
        &self.carrier
    }

    /// Receiver fields from a location, with the owning customer's name
    fn record_for_location(&self, location: &ShippingLocation, customer_name: Option<&str>) -> ShipmentRecord {
        ShipmentRecord {
            receiver_name: customer_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(location.location_name.as_str())
                .to_string(),
            receiver_street: location.address_street.clone(),
            receiver_city: location.address_city.clone(),
            receiver_province: location.address_province.clone(),
            receiver_postal: location.address_postal.clone(),
            receiver_country: location.address_country.clone(),
            receiver_phone: location.phone_number.clone().unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Shipment record for a pending order with its stored package fields
    fn record_for_order(&self, details: &OrderDetails, package: Option<&PackageDetails>) -> ShipmentRecord {
        let mut record = ShipmentRecord {
            receiver_name: details.customer_name.clone(),
            receiver_street: details.address_street.clone(),
            receiver_city: details.address_city.clone(),
            receiver_province: details.address_province.clone(),
            receiver_postal: details.address_postal.clone(),
            receiver_country: details.address_country.clone(),
            receiver_phone: details.phone_number.clone().unwrap_or_default(),
            ..Default::default()
        };
        record.apply_package(&order_package(details));
        if let Some(package) = package {
            record.apply_package(package);
        }
        record.with_defaults(&self.sender)
    }

    /// Ship to a stored location. The order table is not touched.
    #[instrument(skip(self, package))]
    pub async fn ship_to_location(
        &self,
        location_id: i64,
        package: Option<&PackageDetails>,
    ) -> Result<ShipmentResult, ShippingError> {
        let location = self
            .store
            .get_location(location_id)
            .await?
            .ok_or(ShippingError::LocationNotFound(location_id))?;
        let customer = self.store.get_customer(location.customer_id).await?;

        let mut record = self.record_for_location(&location, customer.as_ref().map(|c| c.customer_name.as_str()));
        if let Some(package) = package {
            record.apply_package(package);
        }
        let record = record.with_defaults(&self.sender);

        self.submit(&record).await
    }

    /// Ship a pending sales order to its location and mark it shipped.
    ///
    /// Package fields not supplied by the caller come from the order, then
    /// from the package defaults; the reference falls back to the order id.
    #[instrument(skip(self, package))]
    pub async fn ship_sales_order(
        &self,
        order_id: &str,
        package: Option<&PackageDetails>,
    ) -> Result<ShipmentResult, ShippingError> {
        let details = self
            .store
            .order_with_details(order_id)
            .await?
            .ok_or_else(|| ShippingError::OrderNotFound(order_id.to_string()))?;

        match details.order.status {
            OrderStatus::Shipped => {
                return Err(ShippingError::AlreadyShipped {
                    order_id: order_id.to_string(),
                    shipment_pin: details.order.shipment_pin.clone().unwrap_or_default(),
                })
            }
            OrderStatus::Cancelled => return Err(ShippingError::OrderCancelled(order_id.to_string())),
            OrderStatus::Pending => {}
        }

        let record = self.record_for_order(&details, package);
        let result = self.submit(&record).await?;

        if let (true, Some(pin)) = (result.is_success(), result.shipment_pin.as_deref()) {
            self.store
                .update_order_status(order_id, OrderStatus::Shipped, Some(pin))
                .await?;
            info!(order_id, shipment_pin = %pin, "Order marked shipped");
        }

        Ok(result)
    }

    /// Ship several orders one after another. Each order stands alone: a
    /// failure becomes that order's error entry and the loop continues.
    #[instrument(skip(self, order_ids), fields(count = order_ids.len()))]
    pub async fn batch_ship_orders(&self, order_ids: &[String]) -> Vec<OrderShipmentResult> {
        let mut results = Vec::with_capacity(order_ids.len());

        for order_id in order_ids {
            let result = match self.ship_sales_order(order_id, None).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(order_id = %order_id, error = %e, "Order not shipped");
                    ShipmentResult::failed(order_id, e.to_string())
                }
            };
            results.push(OrderShipmentResult {
                order_id: order_id.clone(),
                result,
            });
        }

        let shipped = results.iter().filter(|r| r.result.is_success()).count();
        info!(shipped, failed = results.len() - shipped, "Batch ship finished");
        results
    }

    /// Ship a fully specified record: defaults, then validation, then carrier
    #[instrument(skip(self, record), fields(reference = %record.effective_reference()))]
    pub async fn create_shipment_direct(&self, record: ShipmentRecord) -> Result<ShipmentResult, ShippingError> {
        let record = record.with_defaults(&self.sender);
        self.submit(&record).await
    }

    async fn submit(&self, record: &ShipmentRecord) -> Result<ShipmentResult, ShippingError> {
        validate_shipment(record)?;
        Ok(self.carrier.create_shipment(record).await?)
    }

    pub async fn create_order(&self, order: &NewOrder) -> Result<(), ShippingError> {
        if self.store.get_location(order.location_id).await?.is_none() {
            return Err(ShippingError::LocationNotFound(order.location_id));
        }
        self.store.add_order(order).await?;
        info!(order_id = %order.order_id, "Order created");
        Ok(())
    }

    pub async fn pending_shipments(&self) -> Result<Vec<OrderDetails>, ShippingError> {
        Ok(self.store.pending_orders().await?)
    }

    /// Write pending orders as a batch shipment CSV, ready for `batch run`.
    /// Returns the number of rows; nothing is written when there are none.
    pub async fn export_pending_to_csv(&self, path: &Path) -> Result<usize, ShippingError> {
        let pending = self.store.pending_orders().await?;
        if pending.is_empty() {
            info!("No pending orders to export");
            return Ok(0);
        }

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        writer.write_record(SHIPMENT_CSV_COLUMNS)?;
        for details in &pending {
            writer.serialize(self.record_for_order(details, None))?;
        }
        let bytes = writer.into_inner().map_err(|e| ShippingError::Io(e.into_error()))?;
        tokio::fs::write(path, bytes).await?;

        info!(path = %path.display(), count = pending.len(), "Pending orders exported");
        Ok(pending.len())
    }
}

/// Package fields stored on the order; the order id stands in for a
/// missing reference
fn order_package(details: &OrderDetails) -> PackageDetails {
    let order = &details.order;
    PackageDetails {
        weight: order.weight.map(|w| w.to_string()),
        service_id: order.service_id.clone(),
        reference: Some(
            order
                .reference
                .clone()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| order.order_id.clone()),
        ),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::fake::FakeCarrier;
    use crate::db::memory::MemoryStore;
    use crate::db::models::NewLocation;

    struct Fixture {
        shipping: ShippingIntegration,
        store: Arc<MemoryStore>,
        carrier: Arc<FakeCarrier>,
        location_id: i64,
        customer_id: i64,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let carrier = Arc::new(FakeCarrier::new());
        let customer_id = store.add_customer("Northwind Traders", Some("1234567")).await.unwrap();
        let location_id = store
            .add_location(&NewLocation {
                customer_id,
                location_name: "Main Dock".to_string(),
                address_street: "456 Elm St".to_string(),
                address_city: "Montreal".to_string(),
                address_province: "QC".to_string(),
                address_postal: "h3b1a1".to_string(),
                address_country: "CA".to_string(),
                phone_number: Some("5145555678".to_string()),
                is_default: true,
            })
            .await
            .unwrap();

        let shipping = ShippingIntegration::new(store.clone(), carrier.clone(), SenderSettings::default());
        Fixture {
            shipping,
            store,
            carrier,
            location_id,
            customer_id,
        }
    }

    fn new_order(f: &Fixture, order_id: &str, weight: Option<f64>) -> NewOrder {
        NewOrder {
            order_id: order_id.to_string(),
            customer_id: f.customer_id,
            location_id: f.location_id,
            weight,
            service_id: None,
            reference: None,
        }
    }

    #[tokio::test]
    async fn test_ship_to_location_merges_sender_location_and_package() {
        let f = fixture().await;
        let package = PackageDetails {
            weight: Some("4".to_string()),
            ..Default::default()
        };
        let result = f.shipping.ship_to_location(f.location_id, Some(&package)).await.unwrap();
        assert!(result.is_success());

        let shipped = f.carrier.shipped.lock().unwrap();
        let record = &shipped[0];
        assert_eq!(record.receiver_name, "Northwind Traders");
        assert_eq!(record.receiver_postal, "H3B 1A1");
        assert_eq!(record.sender_name, "Your Warehouse");
        assert_eq!(record.weight, "4");
        assert_eq!(record.length, "30");
        assert_eq!(record.reference, "");
    }

    #[tokio::test]
    async fn test_ship_to_missing_location() {
        let f = fixture().await;
        let err = f.shipping.ship_to_location(999, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Location 999 not found");
        assert_eq!(f.carrier.calls(), 0);
    }

    #[tokio::test]
    async fn test_ship_sales_order_marks_shipped_once() {
        let f = fixture().await;
        f.shipping.create_order(&new_order(&f, "SO-1", Some(3.5))).await.unwrap();

        let result = f.shipping.ship_sales_order("SO-1", None).await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.reference, "SO-1");

        let order = f.store.get_order("SO-1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.shipment_pin, result.shipment_pin);
        assert!(order.shipped_at.is_some());
        assert_eq!(f.carrier.shipped.lock().unwrap()[0].weight, "3.5");

        let err = f.shipping.ship_sales_order("SO-1", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Order SO-1 already shipped (PIN: PIN0001)");
        assert_eq!(f.carrier.calls(), 1);
    }

    #[tokio::test]
    async fn test_rejected_order_stays_pending() {
        let f = fixture().await;
        f.shipping.create_order(&new_order(&f, "SO-2", None)).await.unwrap();
        f.carrier.reject_next("Postal code invalid");

        let result = f.shipping.ship_sales_order("SO-2", None).await.unwrap();
        assert!(!result.is_success());
        assert_eq!(result.message, "Postal code invalid");

        let order = f.store.get_order("SO-2").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.shipment_pin, None);
    }

    #[tokio::test]
    async fn test_validation_failure_skips_carrier() {
        let f = fixture().await;
        f.shipping.create_order(&new_order(&f, "SO-3", Some(80.0))).await.unwrap();

        let err = f.shipping.ship_sales_order("SO-3", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: Weight exceeds maximum (75 kg)");
        assert_eq!(f.carrier.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_order_is_rejected() {
        let f = fixture().await;
        f.shipping.create_order(&new_order(&f, "SO-4", None)).await.unwrap();
        f.store.update_order_status("SO-4", OrderStatus::Cancelled, None).await.unwrap();

        assert!(matches!(
            f.shipping.ship_sales_order("SO-4", None).await,
            Err(ShippingError::OrderCancelled(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let f = fixture().await;
        f.shipping.create_order(&new_order(&f, "SO-5", None)).await.unwrap();
        f.shipping.create_order(&new_order(&f, "SO-6", None)).await.unwrap();

        let ids = vec!["SO-5".to_string(), "missing".to_string(), "SO-6".to_string()];
        let results = f.shipping.batch_ship_orders(&ids).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].result.is_success());
        assert_eq!(results[1].result.message, "Order missing not found");
        assert!(results[2].result.is_success());

        let json = serde_json::to_value(&results[1]).unwrap();
        assert_eq!(json["order_id"], "missing");
        assert_eq!(json["status"], "Error");
    }

    #[tokio::test]
    async fn test_create_shipment_direct_validates() {
        let f = fixture().await;
        let record = ShipmentRecord {
            receiver_name: "Acme".to_string(),
            receiver_street: "1 Main St".to_string(),
            receiver_city: "Buffalo".to_string(),
            receiver_province: "NY".to_string(),
            receiver_postal: "ABC".to_string(),
            receiver_country: "US".to_string(),
            ..Default::default()
        };
        let err = f.shipping.create_shipment_direct(record).await.unwrap_err();
        assert!(matches!(err, ShippingError::Validation(ValidationError::InvalidPostalCode { .. })));
    }

    #[tokio::test]
    async fn test_export_pending_writes_batch_rows() {
        let f = fixture().await;
        f.shipping.create_order(&new_order(&f, "SO-7", Some(1.5))).await.unwrap();
        let path = std::env::temp_dir().join(format!("rf-ship-pending-{}.csv", uuid::Uuid::new_v4()));

        assert_eq!(f.shipping.export_pending_to_csv(&path).await.unwrap(), 1);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<ShipmentRecord> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows[0].reference, "SO-7");
        assert_eq!(rows[0].weight, "1.5");
        assert_eq!(rows[0].receiver_city, "Montreal");
        assert_eq!(rows[0].sender_city, "Toronto");

        let _ = std::fs::remove_file(&path);
    }
}
