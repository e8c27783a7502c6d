//! Batch job tracking and progress events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ShipmentResult;

/// Status of a batch job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchJobStatus {
    /// Created, not yet started
    Pending,
    /// Processing rows
    Running,
    /// Every row was processed
    Completed,
    /// Halted by the stop flag before the last row
    Stopped,
}

impl std::fmt::Display for BatchJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchJobStatus::Pending => write!(f, "pending"),
            BatchJobStatus::Running => write!(f, "running"),
            BatchJobStatus::Completed => write!(f, "completed"),
            BatchJobStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// A batch run over shipment rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: Uuid,
    pub status: BatchJobStatus,
    /// Rows queued for the carrier (after validation)
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Rows dropped by validation before the run
    pub skipped: usize,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    pub fn new(total: usize, skipped: usize) -> Self {
        BatchJob {
            id: Uuid::new_v4(),
            status: BatchJobStatus::Pending,
            total,
            processed: 0,
            succeeded: 0,
            failed: 0,
            skipped,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self) {
        self.status = BatchJobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Count one finished row
    pub fn record(&mut self, result: &ShipmentResult) {
        self.processed += 1;
        if result.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn complete(&mut self) {
        self.status = BatchJobStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn stop(&mut self) {
        self.status = BatchJobStatus::Stopped;
        self.completed_at = Some(Utc::now());
    }

    /// Progress percentage
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.processed as f32 / self.total as f32) * 100.0
        }
    }

    pub fn duration_secs(&self) -> Option<i64> {
        let start = self.started_at?;
        let end = self.completed_at.unwrap_or_else(Utc::now);
        Some((end - start).num_seconds())
    }
}

/// Progress reported while a batch runs
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started { job_id: Uuid, total: usize },
    /// `index` is zero-based over the queued rows
    ItemFinished { index: usize, result: ShipmentResult },
    Finished(BatchJob),
}
