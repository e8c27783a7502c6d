//! Batch runner
//!
//! Rows go to the carrier strictly one at a time. The stop flag is checked
//! between rows, so an in-flight request always finishes. A failed row
//! becomes an error result and the run continues.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use super::job::{BatchEvent, BatchJob};
use super::loader::BatchRow;
use super::BatchError;
use crate::carrier::Carrier;
use crate::domain::ShipmentResult;
use crate::labels::LabelService;

/// Column layout of the results file
#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    reference: &'a str,
    status: String,
    http_status: Option<u16>,
    shipment_pin: Option<&'a str>,
    message: &'a str,
    label_path: Option<&'a str>,
}

/// Outcome of a finished run
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub job: BatchJob,
    pub results: Vec<ShipmentResult>,
}

pub struct BatchRunner {
    carrier: Arc<dyn Carrier>,
    labels: Option<LabelService>,
}

impl BatchRunner {
    pub fn new(carrier: Arc<dyn Carrier>, labels: Option<LabelService>) -> Self {
        BatchRunner { carrier, labels }
    }

    /// Run on a worker task
    pub fn spawn(
        self,
        shipments: Vec<BatchRow>,
        skipped: usize,
        events: Option<UnboundedSender<BatchEvent>>,
        stop: Arc<AtomicBool>,
    ) -> JoinHandle<BatchOutcome> {
        tokio::spawn(async move { self.run(shipments, skipped, events, stop).await })
    }

    #[instrument(skip_all, fields(total = shipments.len()))]
    pub async fn run(
        &self,
        shipments: Vec<BatchRow>,
        skipped: usize,
        events: Option<UnboundedSender<BatchEvent>>,
        stop: Arc<AtomicBool>,
    ) -> BatchOutcome {
        let emit = |event: BatchEvent| {
            if let Some(tx) = &events {
                // A dropped receiver only means nobody is watching
                let _ = tx.send(event);
            }
        };

        let mut job = BatchJob::new(shipments.len(), skipped);
        job.start();
        emit(BatchEvent::Started {
            job_id: job.id,
            total: job.total,
        });

        let mut results = Vec::with_capacity(shipments.len());
        let mut stopped = false;

        for (index, row) in shipments.iter().enumerate() {
            if stop.load(Ordering::SeqCst) {
                info!(processed = index, "Stop requested, ending batch early");
                stopped = true;
                break;
            }

            info!(
                row = row.row,
                item = index + 1,
                total = job.total,
                reference = %row.record.effective_reference(),
                "Processing shipment"
            );
            let result = self.process(row).await;

            job.record(&result);
            results.push(result.clone());
            emit(BatchEvent::ItemFinished { index, result });
        }

        if stopped {
            job.stop();
        } else {
            job.complete();
        }
        info!(
            job_id = %job.id,
            status = %job.status,
            succeeded = job.succeeded,
            failed = job.failed,
            "Batch finished"
        );
        emit(BatchEvent::Finished(job.clone()));

        BatchOutcome { job, results }
    }

    async fn process(&self, row: &BatchRow) -> ShipmentResult {
        let record = &row.record;
        let mut result = match self.carrier.create_shipment(record).await {
            Ok(result) => result,
            Err(e) => {
                let reference = failure_reference(row);
                warn!(row = row.row, reference = %reference, error = %e, "Shipment request failed");
                return ShipmentResult::failed(&reference, e.to_string());
            }
        };
        if !result.is_success() {
            result.reference = failure_reference(row);
        }

        if let (Some(labels), Some(pin)) = (&self.labels, result.shipment_pin.clone()) {
            match labels.retrieve(record.effective_reference(), &pin).await {
                Ok(path) => result.label_path = Some(path.display().to_string()),
                Err(e) => {
                    warn!(shipment_pin = %pin, error = %e, "Label not saved");
                    result.warnings.push(format!("Label not saved: {}", e));
                }
            }
        }

        result
    }
}

/// Reference for a failed row; unreferenced rows are named by file line
fn failure_reference(row: &BatchRow) -> String {
    let reference = row.record.reference.trim();
    if reference.is_empty() {
        format!("Row {}", row.row)
    } else {
        reference.to_string()
    }
}

/// Results file name for a run started now
pub fn results_file_name() -> String {
    format!("batch_results_{}.csv", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

/// Write results to `<dir>/batch_results_<timestamp>.csv`
pub async fn write_results(dir: &Path, results: &[ShipmentResult]) -> Result<PathBuf, BatchError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for result in results {
        writer.serialize(ResultRow {
            reference: &result.reference,
            status: result.status.to_string(),
            http_status: result.http_status,
            shipment_pin: result.shipment_pin.as_deref(),
            message: &result.message,
            label_path: result.label_path.as_deref(),
        })?;
    }
    if results.is_empty() {
        writer.write_record(["reference", "status", "http_status", "shipment_pin", "message", "label_path"])?;
    }
    let bytes = writer.into_inner().map_err(|e| BatchError::Io(e.into_error()))?;

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(results_file_name());
    tokio::fs::write(&path, bytes).await?;

    info!(path = %path.display(), rows = results.len(), "Batch results saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::job::BatchJobStatus;
    use crate::carrier::fake::FakeCarrier;
    use crate::carrier::UnavailableCarrier;
    use crate::config::SenderSettings;
    use crate::domain::ShipmentRecord;

    fn record(reference: &str) -> ShipmentRecord {
        ShipmentRecord {
            receiver_name: "Jane Smith".to_string(),
            receiver_street: "456 Elm St".to_string(),
            receiver_city: "Montreal".to_string(),
            receiver_province: "QC".to_string(),
            receiver_postal: "H3B 1A1".to_string(),
            reference: reference.to_string(),
            ..Default::default()
        }
        .with_defaults(&SenderSettings::default())
    }

    /// Rows numbered as if read from consecutive file lines after the header
    fn rows(references: &[&str]) -> Vec<BatchRow> {
        references
            .iter()
            .enumerate()
            .map(|(index, reference)| BatchRow {
                row: index + 2,
                record: record(reference),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_run_reports_progress_and_continues_after_rejection() {
        let carrier = Arc::new(FakeCarrier::new());
        carrier.reject_next("Postal code invalid");
        let runner = BatchRunner::new(carrier.clone(), None);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = runner.spawn(
            rows(&["A-1", "A-2", ""]),
            2,
            Some(tx),
            Arc::new(AtomicBool::new(false)),
        );
        let outcome = handle.await.unwrap();

        assert_eq!(outcome.job.status, BatchJobStatus::Completed);
        assert_eq!((outcome.job.succeeded, outcome.job.failed, outcome.job.skipped), (2, 1, 2));
        assert_eq!(outcome.results[0].message, "Postal code invalid");
        assert_eq!(outcome.results[2].reference, "BatchShipment");

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], BatchEvent::Started { total: 3, .. }));
        assert!(matches!(events[2], BatchEvent::ItemFinished { index: 1, .. }));
        assert!(matches!(&events[4], BatchEvent::Finished(job) if job.processed == 3));
    }

    #[tokio::test]
    async fn test_stop_flag_ends_run_between_items() {
        let carrier = Arc::new(FakeCarrier::new());
        let runner = BatchRunner::new(carrier.clone(), None);
        let stop = Arc::new(AtomicBool::new(true));

        let outcome = runner.run(rows(&["A-1", "A-2"]), 0, None, stop).await;
        assert_eq!(outcome.job.status, BatchJobStatus::Stopped);
        assert!(outcome.results.is_empty());
        assert_eq!(carrier.calls(), 0);
    }

    #[tokio::test]
    async fn test_labels_are_saved_for_successful_rows() {
        let dir = std::env::temp_dir().join(format!("rf-ship-batch-{}", uuid::Uuid::new_v4()));
        let carrier = Arc::new(FakeCarrier::with_label(b"%PDF-1.4"));
        let labels = LabelService::new(carrier.clone(), dir.join("labels"), None);
        let runner = BatchRunner::new(carrier, Some(labels));

        let outcome = runner
            .run(rows(&["SO-1"]), 0, None, Arc::new(AtomicBool::new(false)))
            .await;
        let label = outcome.results[0].label_path.clone().unwrap();
        assert!(label.ends_with("label_SO-1_PIN0001.pdf"));

        let path = write_results(&dir, &outcome.results).await.unwrap();
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next(),
            Some("reference,status,http_status,shipment_pin,message,label_path")
        );
        assert!(lines.next().unwrap().starts_with("SO-1,Success,200,PIN0001,Shipment created successfully,"));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_failed_rows_without_reference_name_their_file_line() {
        let carrier = Arc::new(FakeCarrier::new());
        carrier.reject_next("Postal code invalid");
        let runner = BatchRunner::new(carrier, None);

        // lines 3 and 4 were skipped by validation
        let shipments = vec![
            BatchRow { row: 2, record: record("") },
            BatchRow { row: 5, record: record("") },
            BatchRow { row: 6, record: record("A-6") },
        ];
        let outcome = runner.run(shipments, 2, None, Arc::new(AtomicBool::new(false))).await;

        assert_eq!(outcome.results[0].reference, "Row 2");
        assert_eq!(outcome.results[0].message, "Postal code invalid");
        assert_eq!(outcome.results[1].reference, "BatchShipment");
        assert_eq!(outcome.results[2].reference, "A-6");

        let unavailable = BatchRunner::new(Arc::new(UnavailableCarrier::new("no credentials")), None);
        let shipments = vec![
            BatchRow { row: 7, record: record("") },
            BatchRow { row: 9, record: record("A-9") },
        ];
        let outcome = unavailable.run(shipments, 1, None, Arc::new(AtomicBool::new(false))).await;
        assert_eq!(outcome.results[0].reference, "Row 7");
        assert_eq!(outcome.results[1].reference, "A-9");
        assert_eq!(outcome.job.failed, 2);
    }
}
