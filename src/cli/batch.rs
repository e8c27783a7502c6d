//! `batch` subcommands

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::bail;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{address_book, open_store, required_carrier};
use crate::batch::{load_shipments, write_results, BatchEvent, BatchRunner};
use crate::config::Settings;
use crate::domain::ShipmentResult;
use crate::labels::LabelService;

/// Ship a CSV file row by row. Ctrl-C stops after the current row.
pub async fn run_file(settings: &Settings, file: &Path, labels: bool, email: bool) -> anyhow::Result<()> {
    let carrier = required_carrier(settings)?;
    let batch = load_shipments(file, &settings.sender).await?;
    if batch.shipments.is_empty() {
        bail!("No valid shipments to process in {}", file.display());
    }

    let labels = labels.then(|| LabelService::from_settings(carrier.clone(), settings, email));
    let stop = Arc::new(AtomicBool::new(false));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = BatchRunner::new(carrier, labels).spawn(batch.shipments, batch.errors.len(), Some(tx), stop.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stop requested, finishing the current shipment");
            stop.store(true, Ordering::SeqCst);
        }
    });

    while let Some(event) = rx.recv().await {
        match event {
            BatchEvent::Started { job_id, total } => info!(%job_id, total, "Batch started"),
            BatchEvent::ItemFinished { index, result } => log_result(index + 1, &result),
            BatchEvent::Finished(job) => info!(
                status = %job.status,
                processed = job.processed,
                succeeded = job.succeeded,
                failed = job.failed,
                skipped = job.skipped,
                duration_secs = ?job.duration_secs(),
                "Batch summary"
            ),
        }
    }

    let outcome = handle.await?;
    write_results(&settings.batch.results_dir, &outcome.results).await?;
    Ok(())
}

/// Ship stored sales orders by id
pub async fn ship_orders(settings: &Settings, order_ids: &[String]) -> anyhow::Result<()> {
    let store = open_store(settings).await?;
    let book = address_book(store, required_carrier(settings)?, settings);

    let results = book.batch_ship_orders(order_ids).await;
    for (index, entry) in results.iter().enumerate() {
        log_result(index + 1, &entry.result);
    }

    let succeeded = results.iter().filter(|r| r.result.is_success()).count();
    info!(total = results.len(), succeeded, failed = results.len() - succeeded, "Orders processed");

    let rows: Vec<ShipmentResult> = results.into_iter().map(|r| r.result).collect();
    write_results(&settings.batch.results_dir, &rows).await?;
    Ok(())
}

fn log_result(row: usize, result: &ShipmentResult) {
    if result.is_success() {
        info!(
            row,
            reference = %result.reference,
            shipment_pin = result.shipment_pin.as_deref().unwrap_or(""),
            "{}",
            result.message
        );
    } else {
        warn!(row, reference = %result.reference, "{}", result.message);
    }
}
