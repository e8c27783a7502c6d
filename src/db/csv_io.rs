//! CSV import/export for the address book

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::models::NewLocation;
use super::pool::DbError;
use super::store::AddressStore;

/// Customer row: `customer_name,carrier_account`
#[derive(Debug, Serialize, Deserialize)]
struct CustomerRow {
    customer_name: String,
    #[serde(default, alias = "purolator_account_number")]
    carrier_account: Option<String>,
}

const LOCATION_COLUMNS: [&str; 10] = [
    "customer_name",
    "customer_id",
    "location_name",
    "address_street",
    "address_city",
    "address_province",
    "address_postal",
    "address_country",
    "phone_number",
    "is_default",
];

/// Location row. The owner is matched by `customer_name` when present,
/// otherwise by `customer_id`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct LocationRow {
    customer_name: String,
    customer_id: String,
    location_name: String,
    address_street: String,
    address_city: String,
    address_province: String,
    address_postal: String,
    address_country: String,
    phone_number: String,
    is_default: String,
}

/// Rows written or read by an import/export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CsvSummary {
    pub rows: usize,
    pub skipped: usize,
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y")
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

async fn write_csv(path: &Path, writer: csv::Writer<Vec<u8>>) -> Result<(), DbError> {
    let bytes = writer.into_inner().map_err(|e| DbError::Io(e.into_error()))?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Export every customer
pub async fn export_customers(store: &dyn AddressStore, path: &Path) -> Result<CsvSummary, DbError> {
    let customers = store.search_customers("").await?;
    let mut writer = csv::Writer::from_writer(Vec::new());
    for customer in &customers {
        writer.serialize(CustomerRow {
            customer_name: customer.customer_name.clone(),
            carrier_account: customer.carrier_account.clone(),
        })?;
    }
    if customers.is_empty() {
        writer.write_record(["customer_name", "carrier_account"])?;
    }
    write_csv(path, writer).await?;

    info!(path = %path.display(), count = customers.len(), "Customers exported");
    Ok(CsvSummary { rows: customers.len(), skipped: 0 })
}

/// Import customers; rows without a name are skipped
pub async fn import_customers(store: &dyn AddressStore, path: &Path) -> Result<CsvSummary, DbError> {
    let bytes = tokio::fs::read(path).await?;
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let mut summary = CsvSummary::default();

    for row in reader.deserialize::<CustomerRow>() {
        let row = row?;
        let Some(name) = non_empty(&row.customer_name) else {
            summary.skipped += 1;
            continue;
        };
        let account = row.carrier_account.as_deref().and_then(non_empty);
        store.add_customer(&name, account.as_deref()).await?;
        summary.rows += 1;
    }

    info!(path = %path.display(), imported = summary.rows, skipped = summary.skipped, "Customers imported");
    Ok(summary)
}

/// Export every location with its customer's name
pub async fn export_locations(store: &dyn AddressStore, path: &Path) -> Result<CsvSummary, DbError> {
    let listings = store.search_locations("").await?;
    let mut writer = csv::Writer::from_writer(Vec::new());
    for listing in &listings {
        let l = &listing.location;
        writer.serialize(LocationRow {
            customer_name: listing.customer_name.clone(),
            customer_id: l.customer_id.to_string(),
            location_name: l.location_name.clone(),
            address_street: l.address_street.clone(),
            address_city: l.address_city.clone(),
            address_province: l.address_province.clone(),
            address_postal: l.address_postal.clone(),
            address_country: l.address_country.clone(),
            phone_number: l.phone_number.clone().unwrap_or_default(),
            is_default: if l.is_default { "1" } else { "0" }.to_string(),
        })?;
    }
    if listings.is_empty() {
        writer.write_record(LOCATION_COLUMNS)?;
    }
    write_csv(path, writer).await?;

    info!(path = %path.display(), count = listings.len(), "Locations exported");
    Ok(CsvSummary { rows: listings.len(), skipped: 0 })
}

/// Import locations. A customer named in the file but missing from the
/// store is created on the fly.
pub async fn import_locations(store: &dyn AddressStore, path: &Path) -> Result<CsvSummary, DbError> {
    let bytes = tokio::fs::read(path).await?;
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let mut summary = CsvSummary::default();

    for (index, row) in reader.deserialize::<LocationRow>().enumerate() {
        let row = row?;
        let line = index + 2;

        let customer_id = match resolve_customer(store, &row).await? {
            Some(id) => id,
            None => {
                warn!(line, "Location row has no usable customer, skipping");
                summary.skipped += 1;
                continue;
            }
        };
        if row.location_name.trim().is_empty() || row.address_street.trim().is_empty() {
            warn!(line, "Location row is missing a name or street, skipping");
            summary.skipped += 1;
            continue;
        }

        let location = NewLocation {
            customer_id,
            location_name: row.location_name.trim().to_string(),
            address_street: row.address_street.trim().to_string(),
            address_city: row.address_city.trim().to_string(),
            address_province: row.address_province.trim().to_string(),
            address_postal: row.address_postal.trim().to_string(),
            address_country: non_empty(&row.address_country).unwrap_or_else(|| "CA".to_string()),
            phone_number: non_empty(&row.phone_number),
            is_default: parse_flag(&row.is_default),
        };
        store.add_location(&location).await?;
        summary.rows += 1;
    }

    info!(path = %path.display(), imported = summary.rows, skipped = summary.skipped, "Locations imported");
    Ok(summary)
}

async fn resolve_customer(store: &dyn AddressStore, row: &LocationRow) -> Result<Option<i64>, DbError> {
    if let Some(name) = non_empty(&row.customer_name) {
        let matches = store.search_customers(&name).await?;
        let exact = matches
            .iter()
            .find(|c| c.customer_name.eq_ignore_ascii_case(&name));
        return match exact {
            Some(customer) => Ok(Some(customer.customer_id)),
            None => Ok(Some(store.add_customer(&name, None).await?)),
        };
    }

    match row.customer_id.trim().parse::<i64>() {
        Ok(id) => Ok(store.get_customer(id).await?.map(|c| c.customer_id)),
        Err(_) => Ok(None),
    }
}
