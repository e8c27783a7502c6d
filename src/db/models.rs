//! Database models for the address book

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Customer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    pub customer_id: i64,
    pub customer_name: String,
    pub carrier_account: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ship-to address belonging to a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShippingLocation {
    pub location_id: i64,
    pub customer_id: i64,
    pub location_name: String,
    pub address_street: String,
    pub address_city: String,
    pub address_province: String,
    pub address_postal: String,
    pub address_country: String,
    pub phone_number: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Location joined with its customer's name, as returned by searches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationListing {
    #[serde(flatten)]
    pub location: ShippingLocation,
    pub customer_name: String,
}

/// Lifecycle of a sales order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "shipped" => Ok(OrderStatus::Shipped),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("Unknown order status: {}", other)),
        }
    }
}

/// Sales order awaiting (or past) shipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SalesOrder {
    pub order_id: String,
    pub customer_id: i64,
    pub location_id: i64,
    pub shipment_pin: Option<String>,
    pub status: OrderStatus,
    pub weight: Option<f64>,
    pub service_id: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
}

/// Order joined with its customer and destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: SalesOrder,
    pub customer_name: String,
    pub carrier_account: Option<String>,
    pub location_name: String,
    pub address_street: String,
    pub address_city: String,
    pub address_province: String,
    pub address_postal: String,
    pub address_country: String,
    pub phone_number: Option<String>,
}

/// Fields for inserting a location
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewLocation {
    pub customer_id: i64,
    pub location_name: String,
    pub address_street: String,
    pub address_city: String,
    pub address_province: String,
    pub address_postal: String,
    #[serde(default = "default_country")]
    pub address_country: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

fn default_country() -> String {
    "CA".to_string()
}

/// Partial update of a location. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct LocationUpdate {
    pub location_name: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_province: Option<String>,
    pub address_postal: Option<String>,
    pub address_country: Option<String>,
    pub phone_number: Option<String>,
    pub is_default: Option<bool>,
}

impl LocationUpdate {
    pub fn is_empty(&self) -> bool {
        self.location_name.is_none()
            && self.address_street.is_none()
            && self.address_city.is_none()
            && self.address_province.is_none()
            && self.address_postal.is_none()
            && self.address_country.is_none()
            && self.phone_number.is_none()
            && self.is_default.is_none()
    }
}

/// Partial update of a customer
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CustomerUpdate {
    pub customer_name: Option<String>,
    pub carrier_account: Option<String>,
}

impl CustomerUpdate {
    pub fn is_empty(&self) -> bool {
        self.customer_name.is_none() && self.carrier_account.is_none()
    }
}

/// Fields for creating a sales order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewOrder {
    pub order_id: String,
    pub customer_id: i64,
    pub location_id: i64,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_round_trip_text() {
        for status in [OrderStatus::Pending, OrderStatus::Shipped, OrderStatus::Cancelled] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_location_update_is_empty() {
        assert!(LocationUpdate::default().is_empty());
        let update = LocationUpdate {
            is_default: Some(true),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
