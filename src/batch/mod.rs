//! Batch shipment processing
//!
//! Loads a shipment CSV, validates each row, ships the valid rows one by
//! one on a worker task and writes a results CSV at the end.

pub mod job;
pub mod loader;
pub mod runner;

use thiserror::Error;

pub use job::{BatchEvent, BatchJob, BatchJobStatus};
pub use loader::{load_shipments, write_template, BatchRow, LoadedBatch, RowError};
pub use runner::{write_results, BatchOutcome, BatchRunner};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
