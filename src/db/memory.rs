//! In-memory address store for unit tests

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::models::{
    Customer, CustomerUpdate, LocationListing, LocationUpdate, NewLocation, NewOrder,
    OrderDetails, OrderStatus, SalesOrder, ShippingLocation,
};
use super::pool::DbError;
use super::store::AddressStore;
use crate::domain::address::{format_postal_code, normalize_country};

#[derive(Default)]
struct State {
    next_id: i64,
    customers: Vec<Customer>,
    locations: Vec<ShippingLocation>,
    orders: Vec<SalesOrder>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn customer_name(&self, customer_id: i64) -> String {
        self.customers
            .iter()
            .find(|c| c.customer_id == customer_id)
            .map(|c| c.customer_name.clone())
            .unwrap_or_default()
    }

    fn details(&self, order: &SalesOrder) -> Option<OrderDetails> {
        let customer = self.customers.iter().find(|c| c.customer_id == order.customer_id)?;
        let location = self.locations.iter().find(|l| l.location_id == order.location_id)?;
        Some(OrderDetails {
            order: order.clone(),
            customer_name: customer.customer_name.clone(),
            carrier_account: customer.carrier_account.clone(),
            location_name: location.location_name.clone(),
            address_street: location.address_street.clone(),
            address_city: location.address_city.clone(),
            address_province: location.address_province.clone(),
            address_postal: location.address_postal.clone(),
            address_country: location.address_country.clone(),
            phone_number: location.phone_number.clone(),
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

#[async_trait]
impl AddressStore for MemoryStore {
    async fn add_customer(&self, name: &str, carrier_account: Option<&str>) -> Result<i64, DbError> {
        let mut state = self.state.lock().unwrap();
        let customer_id = state.next_id();
        state.customers.push(Customer {
            customer_id,
            customer_name: name.trim().to_string(),
            carrier_account: carrier_account.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        Ok(customer_id)
    }

    async fn update_customer(&self, customer_id: i64, update: &CustomerUpdate) -> Result<bool, DbError> {
        let mut state = self.state.lock().unwrap();
        let Some(customer) = state.customers.iter_mut().find(|c| c.customer_id == customer_id) else {
            return Ok(false);
        };
        if let Some(name) = &update.customer_name {
            customer.customer_name = name.clone();
        }
        if let Some(account) = &update.carrier_account {
            customer.carrier_account = Some(account.clone());
        }
        customer.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_customer(&self, customer_id: i64) -> Result<bool, DbError> {
        let mut state = self.state.lock().unwrap();
        state.orders.retain(|o| o.customer_id != customer_id);
        state.locations.retain(|l| l.customer_id != customer_id);
        let before = state.customers.len();
        state.customers.retain(|c| c.customer_id != customer_id);
        Ok(state.customers.len() < before)
    }

    async fn get_customer(&self, customer_id: i64) -> Result<Option<Customer>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state.customers.iter().find(|c| c.customer_id == customer_id).cloned())
    }

    async fn search_customers(&self, term: &str) -> Result<Vec<Customer>, DbError> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<Customer> = state
            .customers
            .iter()
            .filter(|c| contains(&c.customer_name, term))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.customer_name.cmp(&b.customer_name));
        Ok(found)
    }

    async fn add_location(&self, location: &NewLocation) -> Result<i64, DbError> {
        let mut state = self.state.lock().unwrap();
        if !state.customers.iter().any(|c| c.customer_id == location.customer_id) {
            return Err(DbError::NotFound(format!("Customer {} not found", location.customer_id)));
        }
        if location.is_default {
            for existing in state.locations.iter_mut().filter(|l| l.customer_id == location.customer_id) {
                existing.is_default = false;
            }
        }
        let location_id = state.next_id();
        state.locations.push(ShippingLocation {
            location_id,
            customer_id: location.customer_id,
            location_name: location.location_name.clone(),
            address_street: location.address_street.clone(),
            address_city: location.address_city.clone(),
            address_province: location.address_province.clone(),
            address_postal: format_postal_code(&location.address_postal),
            address_country: normalize_country(&location.address_country),
            phone_number: location.phone_number.clone(),
            is_default: location.is_default,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        Ok(location_id)
    }

    async fn update_location(&self, location_id: i64, update: &LocationUpdate) -> Result<bool, DbError> {
        let mut state = self.state.lock().unwrap();
        let Some(customer_id) = state
            .locations
            .iter()
            .find(|l| l.location_id == location_id)
            .map(|l| l.customer_id)
        else {
            return Ok(false);
        };
        if update.is_default == Some(true) {
            for other in state.locations.iter_mut().filter(|l| l.customer_id == customer_id) {
                other.is_default = false;
            }
        }
        let Some(location) = state.locations.iter_mut().find(|l| l.location_id == location_id) else {
            return Ok(false);
        };
        if let Some(v) = &update.location_name {
            location.location_name = v.clone();
        }
        if let Some(v) = &update.address_street {
            location.address_street = v.clone();
        }
        if let Some(v) = &update.address_city {
            location.address_city = v.clone();
        }
        if let Some(v) = &update.address_province {
            location.address_province = v.clone();
        }
        if let Some(v) = &update.address_postal {
            location.address_postal = format_postal_code(v);
        }
        if let Some(v) = &update.address_country {
            location.address_country = normalize_country(v);
        }
        if let Some(v) = &update.phone_number {
            location.phone_number = Some(v.clone());
        }
        if let Some(v) = update.is_default {
            location.is_default = v;
        }
        location.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_location(&self, location_id: i64) -> Result<bool, DbError> {
        let mut state = self.state.lock().unwrap();
        let before = state.locations.len();
        state.locations.retain(|l| l.location_id != location_id);
        Ok(state.locations.len() < before)
    }

    async fn get_location(&self, location_id: i64) -> Result<Option<ShippingLocation>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state.locations.iter().find(|l| l.location_id == location_id).cloned())
    }

    async fn customer_locations(&self, customer_id: i64) -> Result<Vec<ShippingLocation>, DbError> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<ShippingLocation> = state
            .locations
            .iter()
            .filter(|l| l.customer_id == customer_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then_with(|| a.location_name.cmp(&b.location_name))
        });
        Ok(found)
    }

    async fn default_location(&self, customer_id: i64) -> Result<Option<ShippingLocation>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .locations
            .iter()
            .find(|l| l.customer_id == customer_id && l.is_default)
            .cloned())
    }

    async fn search_locations(&self, term: &str) -> Result<Vec<LocationListing>, DbError> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<LocationListing> = state
            .locations
            .iter()
            .map(|l| LocationListing {
                location: l.clone(),
                customer_name: state.customer_name(l.customer_id),
            })
            .filter(|listing| {
                let l = &listing.location;
                contains(&l.location_name, term)
                    || contains(&l.address_city, term)
                    || contains(&l.address_postal, term)
                    || contains(&listing.customer_name, term)
            })
            .collect();
        found.sort_by(|a, b| {
            a.customer_name
                .cmp(&b.customer_name)
                .then_with(|| a.location.location_name.cmp(&b.location.location_name))
        });
        Ok(found)
    }

    async fn add_order(&self, order: &NewOrder) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        if state.orders.iter().any(|o| o.order_id == order.order_id) {
            return Err(DbError::InvalidData(format!("Order {} already exists", order.order_id)));
        }
        state.orders.push(SalesOrder {
            order_id: order.order_id.clone(),
            customer_id: order.customer_id,
            location_id: order.location_id,
            shipment_pin: None,
            status: OrderStatus::Pending,
            weight: order.weight,
            service_id: order.service_id.clone(),
            reference: order.reference.clone(),
            created_at: Utc::now(),
            shipped_at: None,
        });
        Ok(())
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        shipment_pin: Option<&str>,
    ) -> Result<bool, DbError> {
        let mut state = self.state.lock().unwrap();
        let Some(order) = state.orders.iter_mut().find(|o| o.order_id == order_id) else {
            return Ok(false);
        };
        order.status = status;
        if status == OrderStatus::Shipped {
            order.shipment_pin = shipment_pin.map(str::to_string);
            order.shipped_at = Some(Utc::now());
        }
        Ok(true)
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<SalesOrder>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state.orders.iter().find(|o| o.order_id == order_id).cloned())
    }

    async fn pending_orders(&self) -> Result<Vec<OrderDetails>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .filter_map(|o| state.details(o))
            .collect())
    }

    async fn customer_orders(
        &self,
        customer_id: i64,
        status: Option<OrderStatus>,
    ) -> Result<Vec<SalesOrder>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| o.customer_id == customer_id)
            .filter(|o| status.map_or(true, |s| o.status == s))
            .cloned()
            .collect())
    }

    async fn order_with_details(&self, order_id: &str) -> Result<Option<OrderDetails>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .orders
            .iter()
            .find(|o| o.order_id == order_id)
            .and_then(|o| state.details(o)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_default_replaces_first() {
        let store = MemoryStore::new();
        let customer_id = store.add_customer("Acme", None).await.unwrap();
        let location = |name: &str| NewLocation {
            customer_id,
            location_name: name.to_string(),
            address_street: "1 King St".to_string(),
            address_city: "Toronto".to_string(),
            address_province: "ON".to_string(),
            address_postal: "m5j2r8".to_string(),
            address_country: "CA".to_string(),
            phone_number: None,
            is_default: true,
        };
        store.add_location(&location("A")).await.unwrap();
        let second = store.add_location(&location("B")).await.unwrap();

        let defaults: Vec<_> = store
            .customer_locations(customer_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|l| l.is_default)
            .collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].location_id, second);
        assert_eq!(defaults[0].address_postal, "M5J 2R8");
    }

    #[tokio::test]
    async fn test_country_defaults_to_canada_and_is_uppercased() {
        let store = MemoryStore::new();
        let customer_id = store.add_customer("Acme", None).await.unwrap();
        let mut new = NewLocation {
            customer_id,
            location_name: "Dock".to_string(),
            address_street: "1 King St".to_string(),
            address_city: "Toronto".to_string(),
            address_province: "ON".to_string(),
            address_postal: "M5J2R8".to_string(),
            address_country: "  ".to_string(),
            phone_number: None,
            is_default: false,
        };
        let blank = store.add_location(&new).await.unwrap();
        new.address_country = "us".to_string();
        let lower = store.add_location(&new).await.unwrap();

        assert_eq!(store.get_location(blank).await.unwrap().unwrap().address_country, "CA");
        assert_eq!(store.get_location(lower).await.unwrap().unwrap().address_country, "US");

        let update = LocationUpdate {
            address_country: Some(" ca ".to_string()),
            ..Default::default()
        };
        assert!(store.update_location(lower, &update).await.unwrap());
        assert_eq!(store.get_location(lower).await.unwrap().unwrap().address_country, "CA");
    }
}
