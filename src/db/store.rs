//! Address store contract
//!
//! Everything above the database (address API, shipping integration, CSV
//! import/export, command layer) talks to this trait, so a store instance is
//! constructed once per process and passed in.

use async_trait::async_trait;

use super::models::{
    Customer, CustomerUpdate, LocationListing, LocationUpdate, NewLocation, NewOrder,
    OrderDetails, OrderStatus, SalesOrder, ShippingLocation,
};
use super::pool::DbError;

/// Persistence for customers, shipping locations and sales orders.
///
/// Writes are atomic per call. Marking a location as default clears the flag
/// on the customer's other locations in the same transaction.
#[async_trait]
pub trait AddressStore: Send + Sync {
    // ------------------------------------------------------------------
    // Customers
    // ------------------------------------------------------------------

    async fn add_customer(&self, name: &str, carrier_account: Option<&str>) -> Result<i64, DbError>;

    /// Returns false when the customer doesn't exist
    async fn update_customer(&self, customer_id: i64, update: &CustomerUpdate) -> Result<bool, DbError>;

    /// Deletes the customer together with its orders and locations
    async fn delete_customer(&self, customer_id: i64) -> Result<bool, DbError>;

    async fn get_customer(&self, customer_id: i64) -> Result<Option<Customer>, DbError>;

    /// Case-insensitive substring match on name; empty term lists everyone
    async fn search_customers(&self, term: &str) -> Result<Vec<Customer>, DbError>;

    // ------------------------------------------------------------------
    // Shipping locations
    // ------------------------------------------------------------------

    async fn add_location(&self, location: &NewLocation) -> Result<i64, DbError>;

    async fn update_location(&self, location_id: i64, update: &LocationUpdate) -> Result<bool, DbError>;

    async fn delete_location(&self, location_id: i64) -> Result<bool, DbError>;

    async fn get_location(&self, location_id: i64) -> Result<Option<ShippingLocation>, DbError>;

    /// Default location first, then by name
    async fn customer_locations(&self, customer_id: i64) -> Result<Vec<ShippingLocation>, DbError>;

    async fn default_location(&self, customer_id: i64) -> Result<Option<ShippingLocation>, DbError>;

    /// Substring match on location name, city, postal code or customer name
    async fn search_locations(&self, term: &str) -> Result<Vec<LocationListing>, DbError>;

    // ------------------------------------------------------------------
    // Sales orders
    // ------------------------------------------------------------------

    async fn add_order(&self, order: &NewOrder) -> Result<(), DbError>;

    /// Sets the status; a shipped status also records the PIN and timestamp
    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        shipment_pin: Option<&str>,
    ) -> Result<bool, DbError>;

    async fn get_order(&self, order_id: &str) -> Result<Option<SalesOrder>, DbError>;

    async fn pending_orders(&self) -> Result<Vec<OrderDetails>, DbError>;

    async fn customer_orders(
        &self,
        customer_id: i64,
        status: Option<OrderStatus>,
    ) -> Result<Vec<SalesOrder>, DbError>;

    async fn order_with_details(&self, order_id: &str) -> Result<Option<OrderDetails>, DbError>;
}

/// Build an ILIKE pattern that matches `term` anywhere, with wildcards in
/// the term itself taken literally.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("acme"), "%acme%");
        assert_eq!(like_pattern(" 50%_off "), "%50\\%\\_off%");
        assert_eq!(like_pattern(""), "%%");
    }
}
