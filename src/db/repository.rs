//! PostgreSQL-backed address store

use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Row};
use tracing::info;

use super::models::{
    Customer, CustomerUpdate, LocationListing, LocationUpdate, NewLocation, NewOrder,
    OrderDetails, OrderStatus, SalesOrder, ShippingLocation,
};
use super::pool::{DbError, DbPool};
use super::store::{like_pattern, AddressStore};
use crate::domain::address::{format_postal_code, normalize_country};

const CUSTOMER_COLUMNS: &str =
    "customer_id, customer_name, carrier_account, created_at, updated_at";

const LOCATION_COLUMNS: &str = r#"
    l.location_id, l.customer_id, l.location_name, l.address_street, l.address_city,
    l.address_province, l.address_postal, l.address_country, l.phone_number,
    l.is_default, l.created_at, l.updated_at
"#;

const ORDER_COLUMNS: &str = r#"
    o.order_id, o.customer_id, o.location_id, o.shipment_pin, o.status,
    o.weight, o.service_id, o.reference, o.created_at, o.shipped_at
"#;

/// Address store over a Postgres pool. One pooled connection per call.
#[derive(Clone)]
pub struct PgAddressStore {
    pool: DbPool,
}

impl PgAddressStore {
    pub fn new(pool: DbPool) -> Self {
        PgAddressStore { pool }
    }
}

fn customer_from_row(row: &Row) -> Customer {
    Customer {
        customer_id: row.get("customer_id"),
        customer_name: row.get("customer_name"),
        carrier_account: row.get("carrier_account"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn location_from_row(row: &Row) -> ShippingLocation {
    ShippingLocation {
        location_id: row.get("location_id"),
        customer_id: row.get("customer_id"),
        location_name: row.get("location_name"),
        address_street: row.get("address_street"),
        address_city: row.get("address_city"),
        address_province: row.get("address_province"),
        address_postal: row.get("address_postal"),
        address_country: row.get("address_country"),
        phone_number: row.get("phone_number"),
        is_default: row.get("is_default"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn order_from_row(row: &Row) -> Result<SalesOrder, DbError> {
    let status: String = row.get("status");
    Ok(SalesOrder {
        order_id: row.get("order_id"),
        customer_id: row.get("customer_id"),
        location_id: row.get("location_id"),
        shipment_pin: row.get("shipment_pin"),
        status: status.parse().map_err(DbError::InvalidData)?,
        weight: row.get("weight"),
        service_id: row.get("service_id"),
        reference: row.get("reference"),
        created_at: row.get("created_at"),
        shipped_at: row.get("shipped_at"),
    })
}

fn order_details_from_row(row: &Row) -> Result<OrderDetails, DbError> {
    Ok(OrderDetails {
        order: order_from_row(row)?,
        customer_name: row.get("customer_name"),
        carrier_account: row.get("carrier_account"),
        location_name: row.get("location_name"),
        address_street: row.get("address_street"),
        address_city: row.get("address_city"),
        address_province: row.get("address_province"),
        address_postal: row.get("address_postal"),
        address_country: row.get("address_country"),
        phone_number: row.get("phone_number"),
    })
}

/// Append `column = $n` to a dynamic UPDATE
fn push_set<'a>(
    sets: &mut Vec<String>,
    params: &mut Vec<&'a (dyn ToSql + Sync)>,
    column: &str,
    value: &'a (dyn ToSql + Sync),
) {
    params.push(value);
    sets.push(format!("{} = ${}", column, params.len()));
}

#[async_trait]
impl AddressStore for PgAddressStore {
    async fn add_customer(&self, name: &str, carrier_account: Option<&str>) -> Result<i64, DbError> {
        let mut client = self.pool.get().await?;
        let tx = Client::transaction(&mut client).await?;

        let row = tx.query_one(
            r#"
            INSERT INTO customers (customer_name, carrier_account)
            VALUES ($1, $2)
            RETURNING customer_id
            "#,
            &[&name.trim(), &carrier_account],
        ).await?;
        tx.commit().await?;

        let customer_id: i64 = row.get("customer_id");
        info!(customer_id, customer_name = %name, "Customer added");
        Ok(customer_id)
    }

    async fn update_customer(&self, customer_id: i64, update: &CustomerUpdate) -> Result<bool, DbError> {
        if update.is_empty() {
            return Ok(self.get_customer(customer_id).await?.is_some());
        }

        let mut sets = Vec::new();
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        if let Some(name) = &update.customer_name {
            push_set(&mut sets, &mut params, "customer_name", name);
        }
        if let Some(account) = &update.carrier_account {
            push_set(&mut sets, &mut params, "carrier_account", account);
        }
        sets.push("updated_at = NOW()".to_string());
        params.push(&customer_id);
        let sql = format!(
            "UPDATE customers SET {} WHERE customer_id = ${}",
            sets.join(", "),
            params.len()
        );

        let mut client = self.pool.get().await?;
        let tx = Client::transaction(&mut client).await?;
        let updated = tx.execute(sql.as_str(), &params[..]).await?;
        tx.commit().await?;

        Ok(updated > 0)
    }

    async fn delete_customer(&self, customer_id: i64) -> Result<bool, DbError> {
        let mut client = self.pool.get().await?;
        let tx = Client::transaction(&mut client).await?;

        let orders = tx.execute("DELETE FROM sales_orders WHERE customer_id = $1", &[&customer_id]).await?;
        let locations = tx.execute("DELETE FROM shipping_locations WHERE customer_id = $1", &[&customer_id]).await?;
        let deleted = tx.execute("DELETE FROM customers WHERE customer_id = $1", &[&customer_id]).await?;
        tx.commit().await?;

        if deleted > 0 {
            info!(customer_id, orders, locations, "Customer deleted");
        }
        Ok(deleted > 0)
    }

    async fn get_customer(&self, customer_id: i64) -> Result<Option<Customer>, DbError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {} FROM customers WHERE customer_id = $1", CUSTOMER_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&customer_id]).await?;
        Ok(row.as_ref().map(customer_from_row))
    }

    async fn search_customers(&self, term: &str) -> Result<Vec<Customer>, DbError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {} FROM customers WHERE customer_name ILIKE $1 ORDER BY customer_name",
            CUSTOMER_COLUMNS
        );
        let rows = client.query(sql.as_str(), &[&like_pattern(term)]).await?;
        Ok(rows.iter().map(customer_from_row).collect())
    }

    async fn add_location(&self, location: &NewLocation) -> Result<i64, DbError> {
        let postal = format_postal_code(&location.address_postal);
        let country = normalize_country(&location.address_country);

        let mut client = self.pool.get().await?;
        let tx = Client::transaction(&mut client).await?;

        if location.is_default {
            tx.execute(
                r#"
                UPDATE shipping_locations
                SET is_default = FALSE, updated_at = NOW()
                WHERE customer_id = $1 AND is_default
                "#,
                &[&location.customer_id],
            ).await?;
        }

        let row = tx.query_one(
            r#"
            INSERT INTO shipping_locations (
                customer_id, location_name, address_street, address_city,
                address_province, address_postal, address_country, phone_number, is_default
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING location_id
            "#,
            &[
                &location.customer_id,
                &location.location_name,
                &location.address_street,
                &location.address_city,
                &location.address_province,
                &postal,
                &country,
                &location.phone_number,
                &location.is_default,
            ],
        ).await?;
        tx.commit().await?;

        let location_id: i64 = row.get("location_id");
        info!(
            location_id,
            customer_id = location.customer_id,
            is_default = location.is_default,
            "Shipping location added"
        );
        Ok(location_id)
    }

    async fn update_location(&self, location_id: i64, update: &LocationUpdate) -> Result<bool, DbError> {
        let postal = update.address_postal.as_deref().map(format_postal_code);
        let country = update.address_country.as_deref().map(normalize_country);

        let mut client = self.pool.get().await?;
        let tx = Client::transaction(&mut client).await?;

        let owner = tx.query_opt(
            "SELECT customer_id FROM shipping_locations WHERE location_id = $1 FOR UPDATE",
            &[&location_id],
        ).await?;
        let customer_id: i64 = match owner {
            Some(row) => row.get("customer_id"),
            None => return Ok(false),
        };

        if update.is_default == Some(true) {
            tx.execute(
                r#"
                UPDATE shipping_locations
                SET is_default = FALSE, updated_at = NOW()
                WHERE customer_id = $1 AND location_id <> $2 AND is_default
                "#,
                &[&customer_id, &location_id],
            ).await?;
        }

        let mut sets = Vec::new();
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        if let Some(v) = &update.location_name {
            push_set(&mut sets, &mut params, "location_name", v);
        }
        if let Some(v) = &update.address_street {
            push_set(&mut sets, &mut params, "address_street", v);
        }
        if let Some(v) = &update.address_city {
            push_set(&mut sets, &mut params, "address_city", v);
        }
        if let Some(v) = &update.address_province {
            push_set(&mut sets, &mut params, "address_province", v);
        }
        if let Some(v) = &postal {
            push_set(&mut sets, &mut params, "address_postal", v);
        }
        if let Some(v) = &country {
            push_set(&mut sets, &mut params, "address_country", v);
        }
        if let Some(v) = &update.phone_number {
            push_set(&mut sets, &mut params, "phone_number", v);
        }
        if let Some(v) = &update.is_default {
            push_set(&mut sets, &mut params, "is_default", v);
        }
        sets.push("updated_at = NOW()".to_string());
        params.push(&location_id);

        let sql = format!(
            "UPDATE shipping_locations SET {} WHERE location_id = ${}",
            sets.join(", "),
            params.len()
        );
        let updated = tx.execute(sql.as_str(), &params[..]).await?;
        tx.commit().await?;

        Ok(updated > 0)
    }

    async fn delete_location(&self, location_id: i64) -> Result<bool, DbError> {
        let mut client = self.pool.get().await?;
        let tx = Client::transaction(&mut client).await?;
        let deleted = tx.execute("DELETE FROM shipping_locations WHERE location_id = $1", &[&location_id]).await?;
        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn get_location(&self, location_id: i64) -> Result<Option<ShippingLocation>, DbError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {} FROM shipping_locations l WHERE l.location_id = $1",
            LOCATION_COLUMNS
        );
        let row = client.query_opt(sql.as_str(), &[&location_id]).await?;
        Ok(row.as_ref().map(location_from_row))
    }

    async fn customer_locations(&self, customer_id: i64) -> Result<Vec<ShippingLocation>, DbError> {
        let client = self.pool.get().await?;
        let sql = format!(
            r#"
            SELECT {} FROM shipping_locations l
            WHERE l.customer_id = $1
            ORDER BY l.is_default DESC, l.location_name
            "#,
            LOCATION_COLUMNS
        );
        let rows = client.query(sql.as_str(), &[&customer_id]).await?;
        Ok(rows.iter().map(location_from_row).collect())
    }

    async fn default_location(&self, customer_id: i64) -> Result<Option<ShippingLocation>, DbError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {} FROM shipping_locations l WHERE l.customer_id = $1 AND l.is_default LIMIT 1",
            LOCATION_COLUMNS
        );
        let row = client.query_opt(sql.as_str(), &[&customer_id]).await?;
        Ok(row.as_ref().map(location_from_row))
    }

    async fn search_locations(&self, term: &str) -> Result<Vec<LocationListing>, DbError> {
        let client = self.pool.get().await?;
        let pattern = like_pattern(term);
        // Postal codes are stored as "A1A 1A1"; also match a compact query
        let compact_pattern = like_pattern(&term.replace(' ', ""));
        let sql = format!(
            r#"
            SELECT {}, c.customer_name
            FROM shipping_locations l
            JOIN customers c ON c.customer_id = l.customer_id
            WHERE l.location_name ILIKE $1
               OR l.address_city ILIKE $1
               OR l.address_postal ILIKE $1
               OR REPLACE(l.address_postal, ' ', '') ILIKE $2
               OR c.customer_name ILIKE $1
            ORDER BY c.customer_name, l.location_name
            "#,
            LOCATION_COLUMNS
        );
        let rows = client.query(sql.as_str(), &[&pattern, &compact_pattern]).await?;
        Ok(rows
            .iter()
            .map(|row| LocationListing {
                location: location_from_row(row),
                customer_name: row.get("customer_name"),
            })
            .collect())
    }

    async fn add_order(&self, order: &NewOrder) -> Result<(), DbError> {
        let mut client = self.pool.get().await?;
        let tx = Client::transaction(&mut client).await?;
        tx.execute(
            r#"
            INSERT INTO sales_orders (order_id, customer_id, location_id, weight, service_id, reference)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
            &[
                &order.order_id,
                &order.customer_id,
                &order.location_id,
                &order.weight,
                &order.service_id,
                &order.reference,
            ],
        ).await?;
        tx.commit().await?;

        info!(order_id = %order.order_id, customer_id = order.customer_id, "Sales order created");
        Ok(())
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        shipment_pin: Option<&str>,
    ) -> Result<bool, DbError> {
        let mut client = self.pool.get().await?;
        let tx = Client::transaction(&mut client).await?;

        let updated = if status == OrderStatus::Shipped {
            tx.execute(
                r#"
                UPDATE sales_orders
                SET status = $1, shipment_pin = $2, shipped_at = NOW()
                WHERE order_id = $3
                "#,
                &[&status.as_str(), &shipment_pin, &order_id],
            ).await?
        } else {
            tx.execute(
                "UPDATE sales_orders SET status = $1 WHERE order_id = $2",
                &[&status.as_str(), &order_id],
            ).await?
        };
        tx.commit().await?;

        info!(order_id = %order_id, status = %status, "Order status updated");
        Ok(updated > 0)
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<SalesOrder>, DbError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {} FROM sales_orders o WHERE o.order_id = $1", ORDER_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&order_id]).await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn pending_orders(&self) -> Result<Vec<OrderDetails>, DbError> {
        let client = self.pool.get().await?;
        let sql = format!(
            r#"
            SELECT {}, c.customer_name, c.carrier_account,
                   l.location_name, l.address_street, l.address_city, l.address_province,
                   l.address_postal, l.address_country, l.phone_number
            FROM sales_orders o
            JOIN customers c ON c.customer_id = o.customer_id
            JOIN shipping_locations l ON l.location_id = o.location_id
            WHERE o.status = 'pending'
            ORDER BY o.created_at
            "#,
            ORDER_COLUMNS
        );
        let rows = client.query(sql.as_str(), &[]).await?;
        rows.iter().map(order_details_from_row).collect()
    }

    async fn customer_orders(
        &self,
        customer_id: i64,
        status: Option<OrderStatus>,
    ) -> Result<Vec<SalesOrder>, DbError> {
        let client = self.pool.get().await?;
        let status = status.map(|s| s.as_str());
        let sql = format!(
            r#"
            SELECT {} FROM sales_orders o
            WHERE o.customer_id = $1 AND ($2::TEXT IS NULL OR o.status = $2)
            ORDER BY o.created_at DESC
            "#,
            ORDER_COLUMNS
        );
        let rows = client.query(sql.as_str(), &[&customer_id, &status]).await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn order_with_details(&self, order_id: &str) -> Result<Option<OrderDetails>, DbError> {
        let client = self.pool.get().await?;
        let sql = format!(
            r#"
            SELECT {}, c.customer_name, c.carrier_account,
                   l.location_name, l.address_street, l.address_city, l.address_province,
                   l.address_postal, l.address_country, l.phone_number
            FROM sales_orders o
            JOIN customers c ON c.customer_id = o.customer_id
            JOIN shipping_locations l ON l.location_id = o.location_id
            WHERE o.order_id = $1
            "#,
            ORDER_COLUMNS
        );
        let row = client.query_opt(sql.as_str(), &[&order_id]).await?;
        row.as_ref().map(order_details_from_row).transpose()
    }
}
