//! Open purchase order lines for receiving

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use tiberius::Row;
use tracing::{info, instrument};

use super::writer::{Cell, Tabular};
use super::{ErpClient, ErpError, SqlParam, SqlQuery};

const BASE_QUERY: &str = "SELECT \
    CAST(OP.DocNum AS NVARCHAR(20)) AS DocNum, \
    OP.CardName, \
    CONVERT(VARCHAR(10), OP.ReqDate, 120) AS ReqDate, \
    PL.ItemCode, \
    ISNULL(PL.Dscription, '') AS Dscription, \
    CAST(ISNULL(PL.Quantity, 0) AS FLOAT) AS Quantity, \
    CAST(ISNULL(PL.OpenQty, 0) AS FLOAT) AS OpenQty \
FROM OPOR OP \
INNER JOIN POR1 PL ON OP.DocEntry = PL.DocEntry \
WHERE OP.DocStatus = 'O' AND OP.CANCELED = 'N' AND PL.Quantity > 0";

/// Optional filters, combined with AND
#[derive(Debug, Clone, Default)]
pub struct PoFilter {
    pub po_number: Option<String>,
    /// Substring of the vendor name or code
    pub vendor: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl PoFilter {
    pub fn query(&self) -> SqlQuery {
        let mut sql = BASE_QUERY.to_string();
        let mut params = Vec::new();

        if let Some(po_number) = self.po_number.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(SqlParam::Text(po_number.to_string()));
            sql.push_str(&format!(" AND CAST(OP.DocNum AS NVARCHAR(20)) = @P{}", params.len()));
        }
        if let Some(vendor) = self.vendor.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(SqlParam::Text(format!("%{}%", vendor)));
            let n = params.len();
            sql.push_str(&format!(" AND (OP.CardName LIKE @P{n} OR OP.CardCode LIKE @P{n})"));
        }
        if let Some(from) = self.date_from {
            params.push(SqlParam::Date(from));
            sql.push_str(&format!(" AND OP.ReqDate >= @P{}", params.len()));
        }
        if let Some(to) = self.date_to {
            params.push(SqlParam::Date(to));
            sql.push_str(&format!(" AND OP.ReqDate <= @P{}", params.len()));
        }

        sql.push_str(" ORDER BY OP.DocNum, PL.LineNum");
        SqlQuery { sql, params }
    }
}

/// One purchase order line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoLine {
    pub doc_num: String,
    pub card_name: String,
    pub req_date: String,
    pub item_code: String,
    pub description: String,
    pub quantity: f64,
    pub open_qty: f64,
}

impl PoLine {
    fn from_row(row: &Row) -> Result<Self, ErpError> {
        let text = |name: &str| -> Result<String, ErpError> {
            Ok(row.try_get::<&str, _>(name)?.unwrap_or_default().to_string())
        };
        Ok(PoLine {
            doc_num: text("DocNum")?,
            card_name: text("CardName")?,
            req_date: text("ReqDate")?,
            item_code: text("ItemCode")?,
            description: text("Dscription")?,
            quantity: row.try_get::<f64, _>("Quantity")?.unwrap_or_default(),
            open_qty: row.try_get::<f64, _>("OpenQty")?.unwrap_or_default(),
        })
    }
}

impl Tabular for PoLine {
    const HEADERS: &'static [&'static str] = &[
        "DocNum", "CardName", "ReqDate", "ItemCode", "Dscription", "Quantity", "OpenQty",
    ];

    fn cells(&self) -> Vec<Cell<'_>> {
        vec![
            Cell::Text(&self.doc_num),
            Cell::Text(&self.card_name),
            Cell::Text(&self.req_date),
            Cell::Text(&self.item_code),
            Cell::Text(&self.description),
            Cell::Number(self.quantity),
            Cell::Number(self.open_qty),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoSummary {
    pub purchase_orders: usize,
    pub line_items: usize,
    pub total_ordered: f64,
    pub total_open: f64,
    pub total_received: f64,
    pub earliest_date: Option<String>,
    pub latest_date: Option<String>,
}

impl PoSummary {
    pub fn from_lines(lines: &[PoLine]) -> Self {
        let orders: BTreeSet<&str> = lines.iter().map(|l| l.doc_num.as_str()).collect();
        let dates: BTreeSet<&str> = lines
            .iter()
            .map(|l| l.req_date.as_str())
            .filter(|d| !d.is_empty())
            .collect();
        let total_ordered: f64 = lines.iter().map(|l| l.quantity).sum();
        let total_open: f64 = lines.iter().map(|l| l.open_qty).sum();

        PoSummary {
            purchase_orders: orders.len(),
            line_items: lines.len(),
            total_ordered,
            total_open,
            total_received: total_ordered - total_open,
            earliest_date: dates.first().map(|d| d.to_string()),
            latest_date: dates.last().map(|d| d.to_string()),
        }
    }
}

impl std::fmt::Display for PoSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Purchase orders: {}", self.purchase_orders)?;
        writeln!(f, "Line items: {}", self.line_items)?;
        writeln!(f, "Total ordered: {:.2}", self.total_ordered)?;
        writeln!(f, "Total open: {:.2}", self.total_open)?;
        write!(f, "Total received: {:.2}", self.total_received)?;
        if let (Some(first), Some(last)) = (&self.earliest_date, &self.latest_date) {
            write!(f, "\nRequired dates: {} to {}", first, last)?;
        }
        Ok(())
    }
}

#[instrument(skip(client))]
pub async fn fetch_open_lines(client: &mut ErpClient, filter: &PoFilter) -> Result<Vec<PoLine>, ErpError> {
    let rows = filter.query().fetch(client).await?;
    let lines = rows.iter().map(PoLine::from_row).collect::<Result<Vec<_>, _>>()?;
    info!(lines = lines.len(), "Fetched open purchase order lines");
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(doc: &str, date: &str, quantity: f64, open_qty: f64) -> PoLine {
        PoLine {
            doc_num: doc.to_string(),
            card_name: "Nordic Supply".to_string(),
            req_date: date.to_string(),
            item_code: "WIDGET-1".to_string(),
            description: String::new(),
            quantity,
            open_qty,
        }
    }

    #[test]
    fn test_unfiltered_query() {
        let query = PoFilter::default().query();
        assert!(query.params.is_empty());
        assert!(query.sql.contains("OP.DocStatus = 'O' AND OP.CANCELED = 'N' AND PL.Quantity > 0"));
        assert!(query.sql.ends_with("ORDER BY OP.DocNum, PL.LineNum"));
        assert!(!query.sql.contains("@P"));
    }

    #[test]
    fn test_filters_are_numbered_in_order() {
        let filter = PoFilter {
            po_number: None,
            vendor: Some(" nordic ".to_string()),
            date_from: NaiveDate::from_ymd_opt(2025, 1, 1),
            date_to: NaiveDate::from_ymd_opt(2025, 3, 31),
        };
        let query = filter.query();

        assert!(query.sql.contains("(OP.CardName LIKE @P1 OR OP.CardCode LIKE @P1)"));
        assert!(query.sql.contains("OP.ReqDate >= @P2"));
        assert!(query.sql.contains("OP.ReqDate <= @P3"));
        assert_eq!(
            query.params,
            vec![
                SqlParam::Text("%nordic%".to_string()),
                SqlParam::Date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
                SqlParam::Date(NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()),
            ]
        );
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let filter = PoFilter {
            po_number: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(filter.query().params.is_empty());

        let filter = PoFilter {
            po_number: Some("4012".to_string()),
            ..Default::default()
        };
        let query = filter.query();
        assert!(query.sql.contains("= @P1"));
        assert_eq!(query.params, vec![SqlParam::Text("4012".to_string())]);
    }

    #[test]
    fn test_summary() {
        let lines = vec![
            line("4012", "2025-02-10", 10.0, 4.0),
            line("4012", "2025-02-10", 5.0, 5.0),
            line("4013", "2025-01-20", 8.0, 0.0),
        ];
        let summary = PoSummary::from_lines(&lines);

        assert_eq!(summary.purchase_orders, 2);
        assert_eq!(summary.line_items, 3);
        assert_eq!(summary.total_ordered, 23.0);
        assert_eq!(summary.total_open, 9.0);
        assert_eq!(summary.total_received, 14.0);
        assert_eq!(summary.earliest_date.as_deref(), Some("2025-01-20"));
        assert_eq!(summary.latest_date.as_deref(), Some("2025-02-10"));
        assert!(summary.to_string().contains("Required dates: 2025-01-20 to 2025-02-10"));
    }
}
