//! Address book API for RF scanners and the web front-end
//!
//! A thin facade over the address store and shipping integration with a few
//! composite lookups. Every outer surface (JSON commands, HTTP routes, CLI)
//! goes through here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::db::models::{
    Customer, CustomerUpdate, LocationListing, LocationUpdate, NewLocation, NewOrder, OrderDetails,
    OrderStatus, SalesOrder, ShippingLocation,
};
use crate::db::{AddressStore, DbError};
use crate::domain::{PackageDetails, ShipmentRecord, ShipmentResult};
use crate::shipping::{OrderShipmentResult, ShippingError, ShippingIntegration};

#[derive(Debug, Error)]
pub enum AddressBookError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Shipping(#[from] ShippingError),

    #[error("Database error: {0}")]
    Store(#[from] DbError),
}

impl AddressBookError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AddressBookError::NotFound(_)
                | AddressBookError::Shipping(ShippingError::LocationNotFound(_))
                | AddressBookError::Shipping(ShippingError::OrderNotFound(_))
        )
    }
}

/// Result of a quick lookup: the matched customer with their locations
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuickLookup {
    pub customer: Option<Customer>,
    pub locations: Vec<ShippingLocation>,
    pub default_location: Option<ShippingLocation>,
}

/// Receiver block ready to drop into a shipment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddress {
    pub receiver_name: String,
    pub receiver_street: String,
    pub receiver_city: String,
    pub receiver_province: String,
    pub receiver_postal: String,
    pub receiver_country: String,
    pub receiver_phone: Option<String>,
    pub carrier_account: Option<String>,
}

#[derive(Clone)]
pub struct AddressBook {
    store: Arc<dyn AddressStore>,
    shipping: ShippingIntegration,
}

impl AddressBook {
    pub fn new(shipping: ShippingIntegration) -> Self {
        AddressBook {
            store: shipping.store().clone(),
            shipping,
        }
    }

    pub fn shipping(&self) -> &ShippingIntegration {
        &self.shipping
    }

    // ========== LOOKUPS ==========

    pub async fn get_customer(&self, customer_id: i64) -> Result<Option<Customer>, AddressBookError> {
        Ok(self.store.get_customer(customer_id).await?)
    }

    /// First customer whose name contains `name`
    pub async fn get_customer_by_name(&self, name: &str) -> Result<Option<Customer>, AddressBookError> {
        Ok(self.store.search_customers(name).await?.into_iter().next())
    }

    pub async fn get_location(&self, location_id: i64) -> Result<Option<ShippingLocation>, AddressBookError> {
        Ok(self.store.get_location(location_id).await?)
    }

    pub async fn customer_locations(&self, customer_id: i64) -> Result<Vec<ShippingLocation>, AddressBookError> {
        Ok(self.store.customer_locations(customer_id).await?)
    }

    pub async fn default_location(&self, customer_id: i64) -> Result<Option<ShippingLocation>, AddressBookError> {
        Ok(self.store.default_location(customer_id).await?)
    }

    pub async fn search_customers(&self, term: &str) -> Result<Vec<Customer>, AddressBookError> {
        Ok(self.store.search_customers(term).await?)
    }

    pub async fn search_locations(&self, term: &str) -> Result<Vec<LocationListing>, AddressBookError> {
        Ok(self.store.search_locations(term).await?)
    }

    /// Customer-name search first, then location search. Either way the
    /// matched customer comes back with all of their locations.
    pub async fn quick_lookup(&self, term: &str) -> Result<QuickLookup, AddressBookError> {
        if let Some(customer) = self.store.search_customers(term).await?.into_iter().next() {
            debug!(term, customer_id = customer.customer_id, "Quick lookup matched a customer");
            return self.lookup_for_customer(Some(customer), None).await;
        }

        if let Some(listing) = self.store.search_locations(term).await?.into_iter().next() {
            debug!(term, location_id = listing.location.location_id, "Quick lookup matched a location");
            let customer = self.store.get_customer(listing.location.customer_id).await?;
            return self.lookup_for_customer(customer, Some(listing.location)).await;
        }

        Err(AddressBookError::NotFound(format!("No results found for \"{}\"", term)))
    }

    async fn lookup_for_customer(
        &self,
        customer: Option<Customer>,
        matched: Option<ShippingLocation>,
    ) -> Result<QuickLookup, AddressBookError> {
        let Some(customer) = customer else {
            let default_location = matched.clone().filter(|l| l.is_default);
            return Ok(QuickLookup {
                customer: None,
                locations: matched.into_iter().collect(),
                default_location,
            });
        };

        let locations = self.store.customer_locations(customer.customer_id).await?;
        let default_location = locations.iter().find(|l| l.is_default).cloned();
        Ok(QuickLookup {
            customer: Some(customer),
            locations,
            default_location,
        })
    }

    /// Receiver address by explicit location, else the customer's default
    pub async fn get_shipping_address(
        &self,
        customer_id: Option<i64>,
        location_id: Option<i64>,
    ) -> Result<ShippingAddress, AddressBookError> {
        let location = match (location_id, customer_id) {
            (Some(location_id), _) => self.store.get_location(location_id).await?,
            (None, Some(customer_id)) => self.store.default_location(customer_id).await?,
            (None, None) => None,
        };
        let location = location.ok_or_else(|| AddressBookError::NotFound("Address not found".to_string()))?;
        let customer = self.store.get_customer(location.customer_id).await?;

        Ok(ShippingAddress {
            receiver_name: customer
                .as_ref()
                .map(|c| c.customer_name.clone())
                .unwrap_or_else(|| location.location_name.clone()),
            receiver_street: location.address_street,
            receiver_city: location.address_city,
            receiver_province: location.address_province,
            receiver_postal: location.address_postal,
            receiver_country: location.address_country,
            receiver_phone: location.phone_number,
            carrier_account: customer.and_then(|c| c.carrier_account),
        })
    }

    // ========== MAINTENANCE ==========

    pub async fn add_customer(&self, name: &str, carrier_account: Option<&str>) -> Result<Customer, AddressBookError> {
        let customer_id = self.store.add_customer(name, carrier_account).await?;
        self.require_customer(customer_id).await
    }

    /// Applies the given fields and returns the customer as stored
    pub async fn update_customer(
        &self,
        customer_id: i64,
        update: &CustomerUpdate,
    ) -> Result<Customer, AddressBookError> {
        if !self.store.update_customer(customer_id, update).await? {
            return Err(customer_not_found(customer_id));
        }
        self.require_customer(customer_id).await
    }

    /// Removes the customer along with their locations and orders
    pub async fn delete_customer(&self, customer_id: i64) -> Result<(), AddressBookError> {
        if !self.store.delete_customer(customer_id).await? {
            return Err(customer_not_found(customer_id));
        }
        info!(customer_id, "Customer removed from address book");
        Ok(())
    }

    pub async fn add_location(&self, location: &NewLocation) -> Result<ShippingLocation, AddressBookError> {
        if self.store.get_customer(location.customer_id).await?.is_none() {
            return Err(customer_not_found(location.customer_id));
        }
        let location_id = self.store.add_location(location).await?;
        self.require_location(location_id).await
    }

    /// Setting `is_default` clears the flag on the customer's other locations
    pub async fn update_location(
        &self,
        location_id: i64,
        update: &LocationUpdate,
    ) -> Result<ShippingLocation, AddressBookError> {
        if !self.store.update_location(location_id, update).await? {
            return Err(location_not_found(location_id));
        }
        self.require_location(location_id).await
    }

    pub async fn delete_location(&self, location_id: i64) -> Result<(), AddressBookError> {
        if !self.store.delete_location(location_id).await? {
            return Err(location_not_found(location_id));
        }
        info!(location_id, "Shipping location removed from address book");
        Ok(())
    }

    async fn require_customer(&self, customer_id: i64) -> Result<Customer, AddressBookError> {
        self.store
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| customer_not_found(customer_id))
    }

    async fn require_location(&self, location_id: i64) -> Result<ShippingLocation, AddressBookError> {
        self.store
            .get_location(location_id)
            .await?
            .ok_or_else(|| location_not_found(location_id))
    }

    // ========== ORDERS ==========

    pub async fn get_order(&self, order_id: &str) -> Result<Option<SalesOrder>, AddressBookError> {
        Ok(self.store.get_order(order_id).await?)
    }

    pub async fn get_order_with_details(&self, order_id: &str) -> Result<Option<OrderDetails>, AddressBookError> {
        Ok(self.store.order_with_details(order_id).await?)
    }

    /// A customer's orders, newest first, optionally narrowed to one status
    pub async fn customer_orders(
        &self,
        customer_id: i64,
        status: Option<OrderStatus>,
    ) -> Result<Vec<SalesOrder>, AddressBookError> {
        Ok(self.store.customer_orders(customer_id, status).await?)
    }

    pub async fn pending_orders(&self) -> Result<Vec<OrderDetails>, AddressBookError> {
        Ok(self.shipping.pending_shipments().await?)
    }

    pub async fn create_order(&self, order: &NewOrder) -> Result<(), AddressBookError> {
        Ok(self.shipping.create_order(order).await?)
    }

    // ========== SHIPPING ==========

    pub async fn ship_order(
        &self,
        order_id: &str,
        package: Option<&PackageDetails>,
    ) -> Result<ShipmentResult, AddressBookError> {
        Ok(self.shipping.ship_sales_order(order_id, package).await?)
    }

    pub async fn ship_to_location(
        &self,
        location_id: i64,
        package: Option<&PackageDetails>,
    ) -> Result<ShipmentResult, AddressBookError> {
        Ok(self.shipping.ship_to_location(location_id, package).await?)
    }

    /// Ship to a customer's given location, or their default one
    pub async fn ship_to_customer(
        &self,
        customer_id: i64,
        location_id: Option<i64>,
        package: Option<&PackageDetails>,
    ) -> Result<ShipmentResult, AddressBookError> {
        let location = match location_id {
            Some(location_id) => self.store.get_location(location_id).await?,
            None => self.store.default_location(customer_id).await?,
        };
        let location = location.ok_or_else(|| {
            AddressBookError::NotFound(format!("No location found for customer {}", customer_id))
        })?;

        self.ship_to_location(location.location_id, package).await
    }

    pub async fn batch_ship_orders(&self, order_ids: &[String]) -> Vec<OrderShipmentResult> {
        self.shipping.batch_ship_orders(order_ids).await
    }

    pub async fn create_shipment_direct(&self, record: ShipmentRecord) -> Result<ShipmentResult, AddressBookError> {
        Ok(self.shipping.create_shipment_direct(record).await?)
    }
}

fn customer_not_found(customer_id: i64) -> AddressBookError {
    AddressBookError::NotFound(format!("Customer {} not found", customer_id))
}

fn location_not_found(location_id: i64) -> AddressBookError {
    AddressBookError::NotFound(format!("Location {} not found", location_id))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::carrier::fake::FakeCarrier;
    use crate::config::SenderSettings;
    use crate::db::memory::MemoryStore;
    use crate::db::models::NewLocation;

    pub(crate) fn location(customer_id: i64, name: &str, city: &str, is_default: bool) -> NewLocation {
        NewLocation {
            customer_id,
            location_name: name.to_string(),
            address_street: "456 Elm St".to_string(),
            address_city: city.to_string(),
            address_province: "QC".to_string(),
            address_postal: "H3B1A1".to_string(),
            address_country: "CA".to_string(),
            phone_number: Some("5145555678".to_string()),
            is_default,
        }
    }

    /// Address book over an in-memory store with one customer and two locations
    pub(crate) async fn seeded_book() -> (AddressBook, Arc<MemoryStore>, Arc<FakeCarrier>) {
        let store = Arc::new(MemoryStore::new());
        let carrier = Arc::new(FakeCarrier::new());
        let acme = store.add_customer("Acme Freight", Some("1234567890")).await.unwrap();
        store.add_location(&location(acme, "Head Office", "Montreal", true)).await.unwrap();
        store.add_location(&location(acme, "Warehouse", "Laval", false)).await.unwrap();

        let shipping = ShippingIntegration::new(store.clone(), carrier.clone(), SenderSettings::default());
        (AddressBook::new(shipping), store, carrier)
    }

    #[tokio::test]
    async fn test_quick_lookup_prefers_customer_match() {
        let (book, _, _) = seeded_book().await;
        let found = book.quick_lookup("acme").await.unwrap();

        assert_eq!(found.customer.unwrap().customer_name, "Acme Freight");
        assert_eq!(found.locations.len(), 2);
        assert_eq!(found.default_location.unwrap().location_name, "Head Office");
    }

    #[tokio::test]
    async fn test_quick_lookup_falls_back_to_locations() {
        let (book, _, _) = seeded_book().await;
        let found = book.quick_lookup("laval").await.unwrap();

        assert_eq!(found.customer.unwrap().customer_name, "Acme Freight");
        assert_eq!(found.locations.len(), 2);
    }

    #[tokio::test]
    async fn test_quick_lookup_not_found() {
        let (book, _, _) = seeded_book().await;
        let err = book.quick_lookup("zzz").await.unwrap_err();
        assert_eq!(err.to_string(), "No results found for \"zzz\"");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_shipping_address_resolution() {
        let (book, store, _) = seeded_book().await;
        let acme = store.search_customers("acme").await.unwrap()[0].customer_id;

        let default = book.get_shipping_address(Some(acme), None).await.unwrap();
        assert_eq!(default.receiver_name, "Acme Freight");
        assert_eq!(default.receiver_city, "Montreal");
        assert_eq!(default.receiver_postal, "H3B 1A1");
        assert_eq!(default.carrier_account.as_deref(), Some("1234567890"));

        let warehouse = store.search_locations("Warehouse").await.unwrap()[0].location.location_id;
        let explicit = book.get_shipping_address(Some(acme), Some(warehouse)).await.unwrap();
        assert_eq!(explicit.receiver_city, "Laval");

        let err = book.get_shipping_address(None, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Address not found");
    }

    #[tokio::test]
    async fn test_ship_to_customer_uses_default_location() {
        let (book, store, carrier) = seeded_book().await;
        let acme = store.search_customers("acme").await.unwrap()[0].customer_id;

        let result = book.ship_to_customer(acme, None, None).await.unwrap();
        assert!(result.is_success());
        assert_eq!(carrier.shipped.lock().unwrap()[0].receiver_city, "Montreal");

        let lonely = store.add_customer("No Address Inc", None).await.unwrap();
        let err = book.ship_to_customer(lonely, None, None).await.unwrap_err();
        assert_eq!(err.to_string(), format!("No location found for customer {}", lonely));
    }

    #[tokio::test]
    async fn test_only_one_default_location_per_customer() {
        let (book, store, _) = seeded_book().await;
        let customer = book.add_customer("Northwind Traders", None).await.unwrap();
        let id = customer.customer_id;

        async fn defaults(book: &AddressBook, customer_id: i64) -> Vec<i64> {
            book.customer_locations(customer_id)
                .await
                .unwrap()
                .into_iter()
                .filter(|l| l.is_default)
                .map(|l| l.location_id)
                .collect()
        }

        let first = book.add_location(&location(id, "North", "Montreal", true)).await.unwrap();
        assert_eq!(defaults(&book, id).await, vec![first.location_id]);

        let second = book.add_location(&location(id, "South", "Laval", true)).await.unwrap();
        assert_eq!(defaults(&book, id).await, vec![second.location_id]);
        assert_eq!(book.get_shipping_address(Some(id), None).await.unwrap().receiver_city, "Laval");

        let third = book.add_location(&location(id, "East", "Longueuil", false)).await.unwrap();
        let update = LocationUpdate {
            is_default: Some(true),
            ..Default::default()
        };
        let updated = book.update_location(third.location_id, &update).await.unwrap();
        assert!(updated.is_default);
        assert_eq!(defaults(&book, id).await, vec![third.location_id]);
        assert_eq!(book.get_shipping_address(Some(id), None).await.unwrap().receiver_city, "Longueuil");

        // the seeded customer's default is untouched
        let acme = store.search_customers("acme").await.unwrap()[0].customer_id;
        assert_eq!(defaults(&book, acme).await.len(), 1);
    }

    #[tokio::test]
    async fn test_maintenance_reports_missing_records() {
        let (book, _, _) = seeded_book().await;

        let err = book.update_customer(404, &CustomerUpdate::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Customer 404 not found");
        assert!(err.is_not_found());

        let err = book.delete_location(404).await.unwrap_err();
        assert_eq!(err.to_string(), "Location 404 not found");

        let err = book.add_location(&location(404, "Nowhere", "Laval", false)).await.unwrap_err();
        assert_eq!(err.to_string(), "Customer 404 not found");
    }

    #[tokio::test]
    async fn test_delete_customer_removes_locations_and_orders() {
        let (book, store, _) = seeded_book().await;
        let acme = store.search_customers("acme").await.unwrap()[0].customer_id;
        let location_id = store.default_location(acme).await.unwrap().unwrap().location_id;
        book.create_order(&NewOrder {
            order_id: "SO-50".to_string(),
            customer_id: acme,
            location_id,
            weight: None,
            service_id: None,
            reference: None,
        })
        .await
        .unwrap();

        book.delete_customer(acme).await.unwrap();
        assert!(book.customer_locations(acme).await.unwrap().is_empty());
        assert!(book.get_order("SO-50").await.unwrap().is_none());
        assert!(book.customer_orders(acme, None).await.unwrap().is_empty());
    }
}
