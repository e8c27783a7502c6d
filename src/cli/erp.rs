//! ERP extract subcommands

use std::path::PathBuf;

use tracing::info;

use super::OutputFormat;
use crate::config::Settings;
use crate::erp::inventory::{fetch_inventory, InventoryMode, InventorySummary};
use crate::erp::purchase_orders::{fetch_open_lines, PoFilter, PoSummary};
use crate::erp::writer::{timestamped_path, write_csv, write_xlsx};
use crate::erp::{connect, parse_date};

pub struct PoArgs {
    pub po_number: Option<String>,
    pub vendor: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

pub async fn export_purchase_orders(settings: &Settings, args: PoArgs) -> anyhow::Result<()> {
    let filter = PoFilter {
        po_number: args.po_number,
        vendor: args.vendor,
        date_from: args.date_from.as_deref().map(parse_date).transpose()?,
        date_to: args.date_to.as_deref().map(parse_date).transpose()?,
    };

    let mut client = connect(&settings.erp).await?;
    let lines = fetch_open_lines(&mut client, &filter).await?;
    if lines.is_empty() {
        info!("No open purchase order lines match the filters, nothing written");
        return Ok(());
    }

    let path = args
        .output
        .unwrap_or_else(|| timestamped_path("po_export", args.format.extension()));
    match args.format {
        OutputFormat::Csv => write_csv(&path, &lines, false)?,
        OutputFormat::Xlsx => write_xlsx(&path, &lines, "Purchase Orders")?,
    }

    let summary = PoSummary::from_lines(&lines);
    info!(path = %path.display(), "Purchase orders exported\n{}", summary);
    Ok(())
}

pub async fn export_inventory(
    settings: &Settings,
    mode: InventoryMode,
    warehouse: &str,
    cutoff_date: &str,
    out_base: &str,
) -> anyhow::Result<()> {
    let cutoff = parse_date(cutoff_date)?;

    let mut client = connect(&settings.erp).await?;
    let rows = fetch_inventory(&mut client, mode, warehouse, cutoff).await?;
    if rows.is_empty() {
        info!(warehouse, "No inventory rows found, nothing written");
        return Ok(());
    }

    let csv_path = timestamped_path(out_base, "csv");
    let xlsx_path = csv_path.with_extension("xlsx");
    write_csv(&csv_path, &rows, true)?;
    write_xlsx(&xlsx_path, &rows, "Inventory")?;

    info!(
        csv = %csv_path.display(),
        xlsx = %xlsx_path.display(),
        "Inventory exported: {}",
        InventorySummary::from_rows(&rows)
    );
    Ok(())
}
