//! Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # HTTP API for the web front-end
//! rf-ship serve
//!
//! # One JSON command on stdin, one JSON response on stdout
//! echo '{"action":"quick_lookup","search_term":"acme"}' | rf-ship rpc
//!
//! # Ship every row of a CSV and save labels
//! rf-ship batch run shipments.csv --labels
//!
//! # Open purchase orders for RF receiving
//! rf-ship export-po --vendor nordic --format xlsx
//! ```

mod batch;
mod erp;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::address_book::AddressBook;
use crate::carrier::{Carrier, PurolatorCarrier, UnavailableCarrier};
use crate::config::Settings;
use crate::db::{csv_io, AddressStore, DbPool, PgAddressStore};
use crate::erp::inventory::{InventoryMode, DEFAULT_CUTOFF, DEFAULT_OUT_BASE, DEFAULT_WAREHOUSE};
use crate::shipping::ShippingIntegration;

#[derive(Parser)]
#[command(name = "rf-ship")]
#[command(author, version, about = "Warehouse shipping bridge: address book, carrier shipments and ERP extracts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve,
    /// Read one JSON command from stdin and write the response to stdout
    Rpc,
    /// Batch shipments from CSV files or order lists
    Batch {
        #[command(subcommand)]
        action: BatchAction,
    },
    /// Import or export the customer address book
    AddressBook {
        #[command(subcommand)]
        action: AddressBookAction,
    },
    /// Write pending sales orders as a batch shipment CSV
    ExportPending {
        /// Output file
        #[arg(default_value = "pending_shipments.csv")]
        path: PathBuf,
    },
    /// Export open purchase order lines from the ERP
    ExportPo {
        /// Only this purchase order number
        #[arg(long)]
        po_number: Option<String>,

        /// Vendor name or code (partial match)
        #[arg(long)]
        vendor: Option<String>,

        /// Earliest required date (YYYY-MM-DD)
        #[arg(long)]
        date_from: Option<String>,

        /// Latest required date (YYYY-MM-DD)
        #[arg(long)]
        date_to: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// Output file (default po_export_<timestamp>.<format>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export bin inventory from the ERP for RF cycle counts
    ExportInventory {
        /// Which items to include
        #[arg(long, value_enum, default_value_t = InventoryMode::Recent)]
        mode: InventoryMode,

        /// Warehouse code
        #[arg(long, default_value = DEFAULT_WAREHOUSE)]
        warehouse: String,

        /// Activity cutoff for recent mode (YYYY-MM-DD)
        #[arg(long, default_value = DEFAULT_CUTOFF)]
        cutoff_date: String,

        /// Output file name prefix; a timestamp and extension are appended
        #[arg(long, default_value = DEFAULT_OUT_BASE)]
        out_base: String,
    },
}

#[derive(Subcommand)]
pub enum BatchAction {
    /// Ship every valid row of a shipment CSV
    Run {
        /// Shipment CSV
        file: PathBuf,

        /// Save each shipment label as a PDF
        #[arg(long)]
        labels: bool,

        /// Also email each saved label
        #[arg(long, requires = "labels")]
        email: bool,
    },
    /// Write a blank shipment CSV with one sample row
    Template {
        #[arg(default_value = "batch_template.csv")]
        path: PathBuf,
    },
    /// Ship sales orders by id
    Orders {
        #[arg(required = true)]
        order_ids: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum AddressBookAction {
    /// Import customers from CSV
    ImportCustomers { path: PathBuf },
    /// Import shipping locations from CSV
    ImportLocations { path: PathBuf },
    /// Export customers to CSV
    ExportCustomers { path: PathBuf },
    /// Export shipping locations to CSV
    ExportLocations { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Csv,
    Xlsx,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Xlsx => "xlsx",
        }
    }
}

/// Connect to the address book database and make sure the schema exists
pub async fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn AddressStore>> {
    let pool = DbPool::new(&settings.database.url, settings.database.max_connections)?;
    pool.init_schema().await.context("Failed to prepare the address book schema")?;
    info!("Address book database ready");
    Ok(Arc::new(PgAddressStore::new(pool)))
}

/// Carrier for surfaces that stay useful without credentials
pub fn carrier_or_unavailable(settings: &Settings) -> Arc<dyn Carrier> {
    match PurolatorCarrier::new(&settings.carrier) {
        Ok(carrier) => Arc::new(carrier),
        Err(e) => {
            warn!(error = %e, "Shipment creation disabled");
            Arc::new(UnavailableCarrier::new(e.to_string()))
        }
    }
}

/// Carrier for commands that only ship
pub fn required_carrier(settings: &Settings) -> anyhow::Result<Arc<dyn Carrier>> {
    Ok(Arc::new(PurolatorCarrier::new(&settings.carrier)?))
}

pub fn address_book(store: Arc<dyn AddressStore>, carrier: Arc<dyn Carrier>, settings: &Settings) -> AddressBook {
    AddressBook::new(ShippingIntegration::new(store, carrier, settings.sender.clone()))
}

/// Run every subcommand except `serve`
pub async fn run(command: Commands, settings: Settings) -> anyhow::Result<()> {
    match command {
        Commands::Serve => bail!("serve runs on the HTTP server runtime"),
        Commands::Rpc => {
            let store = open_store(&settings).await?;
            let book = address_book(store, carrier_or_unavailable(&settings), &settings);
            crate::commands::run_stdio(&book).await?;
        }
        Commands::Batch { action } => match action {
            BatchAction::Run { file, labels, email } => batch::run_file(&settings, &file, labels, email).await?,
            BatchAction::Template { path } => crate::batch::write_template(&path).await?,
            BatchAction::Orders { order_ids } => batch::ship_orders(&settings, &order_ids).await?,
        },
        Commands::AddressBook { action } => {
            let store = open_store(&settings).await?;
            let (label, summary) = match action {
                AddressBookAction::ImportCustomers { path } => ("Customers imported", csv_io::import_customers(&*store, &path).await?),
                AddressBookAction::ImportLocations { path } => ("Locations imported", csv_io::import_locations(&*store, &path).await?),
                AddressBookAction::ExportCustomers { path } => ("Customers exported", csv_io::export_customers(&*store, &path).await?),
                AddressBookAction::ExportLocations { path } => ("Locations exported", csv_io::export_locations(&*store, &path).await?),
            };
            info!(rows = summary.rows, skipped = summary.skipped, "{}", label);
        }
        Commands::ExportPending { path } => {
            let store = open_store(&settings).await?;
            let book = address_book(store, carrier_or_unavailable(&settings), &settings);
            let count = book.shipping().export_pending_to_csv(&path).await?;
            if count == 0 {
                info!("No pending orders");
            }
        }
        Commands::ExportPo {
            po_number,
            vendor,
            date_from,
            date_to,
            format,
            output,
        } => {
            let args = erp::PoArgs {
                po_number,
                vendor,
                date_from,
                date_to,
                format,
                output,
            };
            erp::export_purchase_orders(&settings, args).await?;
        }
        Commands::ExportInventory {
            mode,
            warehouse,
            cutoff_date,
            out_base,
        } => erp::export_inventory(&settings, mode, &warehouse, &cutoff_date, &out_base).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["rf-ship", "batch", "run", "ship.csv", "--labels", "--email"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Batch {
                action: BatchAction::Run { labels: true, email: true, .. }
            }
        ));

        assert!(Cli::try_parse_from(["rf-ship", "batch", "run", "ship.csv", "--email"]).is_err());
        assert!(Cli::try_parse_from(["rf-ship", "batch", "orders"]).is_err());

        let cli = Cli::try_parse_from(["rf-ship", "export-inventory", "--mode", "all"]).unwrap();
        match cli.command {
            Commands::ExportInventory { mode, warehouse, cutoff_date, out_base } => {
                assert_eq!(mode, InventoryMode::All);
                assert_eq!(warehouse, "01");
                assert_eq!(cutoff_date, "2024-01-01");
                assert_eq!(out_base, "rf_inventory");
            }
            _ => panic!("expected export-inventory"),
        }

        let cli = Cli::try_parse_from(["rf-ship", "export-po", "--format", "xlsx"]).unwrap();
        assert!(matches!(cli.command, Commands::ExportPo { format: OutputFormat::Xlsx, .. }));
    }
}
