//! Bin inventory for RF cycle counts

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use tiberius::Row;
use tracing::{info, instrument};

use super::writer::{Cell, Tabular};
use super::{ErpClient, ErpError, SqlParam, SqlQuery};

pub const DEFAULT_WAREHOUSE: &str = "01";
pub const DEFAULT_CUTOFF: &str = "2024-01-01";
pub const DEFAULT_OUT_BASE: &str = "rf_inventory";

const COLUMNS: &str = "B.WhsCode AS Warehouse, \
    B.BinCode, \
    COALESCE(B.Attr1Val, 'General') AS Zone, \
    Q.ItemCode, \
    I.ItemName AS Description, \
    CAST(ISNULL(Q.OnHandQty, 0) AS FLOAT) AS Quantity, \
    CASE WHEN I.frozenFor = 'N' THEN 'active' ELSE 'inactive' END AS Status";

/// Which items to include
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InventoryMode {
    /// Items with warehouse activity since the cutoff date
    Recent,
    /// Every bin in the warehouse
    All,
}

pub fn build_query(mode: InventoryMode, warehouse: &str, cutoff: NaiveDate) -> SqlQuery {
    match mode {
        InventoryMode::Recent => SqlQuery {
            sql: format!(
                "WITH RecentActivity AS (\
                    SELECT DISTINCT T0.ItemCode FROM dbo.OIVL T0 WHERE T0.DocDate >= @P1\
                ) \
                SELECT {COLUMNS} \
                FROM dbo.OITM I \
                LEFT JOIN dbo.OIBQ Q ON Q.ItemCode = I.ItemCode \
                LEFT JOIN dbo.OBIN B ON B.AbsEntry = Q.BinAbs AND B.WhsCode = Q.WhsCode \
                INNER JOIN RecentActivity RA ON RA.ItemCode = I.ItemCode \
                WHERE Q.WhsCode = @P2 AND I.frozenFor = 'N' \
                ORDER BY B.BinCode, Q.ItemCode"
            ),
            params: vec![SqlParam::Date(cutoff), SqlParam::Text(warehouse.to_string())],
        },
        InventoryMode::All => SqlQuery {
            sql: format!(
                "SELECT {COLUMNS} \
                FROM dbo.OBIN B \
                LEFT JOIN dbo.OIBQ Q ON B.AbsEntry = Q.BinAbs AND B.WhsCode = Q.WhsCode \
                LEFT JOIN dbo.OITM I ON I.ItemCode = Q.ItemCode \
                WHERE B.WhsCode = @P1 AND (I.frozenFor = 'N' OR I.frozenFor IS NULL) \
                ORDER BY B.BinCode, Q.ItemCode"
            ),
            params: vec![SqlParam::Text(warehouse.to_string())],
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryRow {
    pub warehouse: String,
    pub bin_code: String,
    pub zone: String,
    pub item_code: String,
    pub description: String,
    pub quantity: f64,
    pub status: String,
}

impl InventoryRow {
    /// `None` for empty bins
    fn from_row(row: &Row) -> Result<Option<Self>, ErpError> {
        let Some(item_code) = row.try_get::<&str, _>("ItemCode")? else {
            return Ok(None);
        };
        let text = |name: &str| -> Result<String, ErpError> {
            Ok(row.try_get::<&str, _>(name)?.unwrap_or_default().to_string())
        };
        Ok(Some(InventoryRow {
            warehouse: text("Warehouse")?,
            bin_code: text("BinCode")?,
            zone: text("Zone")?,
            item_code: item_code.to_string(),
            description: text("Description")?,
            quantity: row.try_get::<f64, _>("Quantity")?.unwrap_or_default(),
            status: text("Status")?,
        }))
    }
}

impl Tabular for InventoryRow {
    const HEADERS: &'static [&'static str] = &[
        "Warehouse", "BinCode", "Zone", "ItemCode", "Description", "Quantity", "Status",
    ];

    fn cells(&self) -> Vec<Cell<'_>> {
        vec![
            Cell::Text(&self.warehouse),
            Cell::Text(&self.bin_code),
            Cell::Text(&self.zone),
            Cell::Text(&self.item_code),
            Cell::Text(&self.description),
            Cell::Number(self.quantity),
            Cell::Text(&self.status),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySummary {
    pub bins: usize,
    pub items: usize,
    pub rows: usize,
    pub total_quantity: f64,
}

impl InventorySummary {
    pub fn from_rows(rows: &[InventoryRow]) -> Self {
        let bins: BTreeSet<&str> = rows.iter().map(|r| r.bin_code.as_str()).collect();
        let items: BTreeSet<&str> = rows.iter().map(|r| r.item_code.as_str()).collect();
        InventorySummary {
            bins: bins.len(),
            items: items.len(),
            rows: rows.len(),
            total_quantity: rows.iter().map(|r| r.quantity).sum(),
        }
    }
}

impl std::fmt::Display for InventorySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Bins: {}, items: {}, rows: {}, total quantity: {:.2}",
            self.bins, self.items, self.rows, self.total_quantity
        )
    }
}

#[instrument(skip(client))]
pub async fn fetch_inventory(
    client: &mut ErpClient,
    mode: InventoryMode,
    warehouse: &str,
    cutoff: NaiveDate,
) -> Result<Vec<InventoryRow>, ErpError> {
    let rows = build_query(mode, warehouse, cutoff).fetch(client).await?;

    let mut inventory = Vec::with_capacity(rows.len());
    for row in &rows {
        if let Some(item) = InventoryRow::from_row(row)? {
            inventory.push(item);
        }
    }
    info!(
        fetched = rows.len(),
        kept = inventory.len(),
        "Fetched bin inventory"
    );
    Ok(inventory)
}
