//! Shipping label retrieval and delivery
//!
//! After a shipment is created the label is fetched from the carrier,
//! written to the labels directory and optionally emailed.

pub mod email;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::carrier::{Carrier, CarrierError};
use crate::config::Settings;
pub use email::{EmailError, LabelMailer};

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("Label retrieval failed: {0}")]
    Carrier(#[from] CarrierError),

    #[error("Failed to save label: {0}")]
    Io(#[from] std::io::Error),
}

/// File name for a label: `label_<reference>_<pin>.pdf`, with anything
/// outside `[A-Za-z0-9_-]` replaced so references can't escape the directory
pub fn label_file_name(reference: &str, shipment_pin: &str) -> String {
    format!("label_{}_{}.pdf", sanitize(reference), sanitize(shipment_pin))
}

fn sanitize(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "label".to_string()
    } else {
        cleaned
    }
}

/// Fetches labels and writes them to disk
pub struct LabelService {
    carrier: Arc<dyn Carrier>,
    dir: PathBuf,
    mailer: Option<LabelMailer>,
}

impl LabelService {
    pub fn new(carrier: Arc<dyn Carrier>, dir: impl Into<PathBuf>, mailer: Option<LabelMailer>) -> Self {
        LabelService {
            carrier,
            dir: dir.into(),
            mailer,
        }
    }

    /// Build from settings. Email is attached only when requested and configured.
    pub fn from_settings(carrier: Arc<dyn Carrier>, settings: &Settings, send_email: bool) -> Self {
        let mailer = if send_email {
            match LabelMailer::new(&settings.email) {
                Ok(mailer) => Some(mailer),
                Err(e) => {
                    warn!(error = %e, "Label email disabled");
                    None
                }
            }
        } else {
            None
        };
        Self::new(carrier, settings.labels.dir.clone(), mailer)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fetch the label for a PIN and save it; returns the written path.
    /// Email failures are logged and do not fail the call.
    pub async fn retrieve(&self, reference: &str, shipment_pin: &str) -> Result<PathBuf, LabelError> {
        let pdf = self.carrier.fetch_label(shipment_pin).await?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = label_file_name(reference, shipment_pin);
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, &pdf).await?;

        info!(path = %path.display(), bytes = pdf.len(), "Label saved");

        if let Some(mailer) = &self.mailer {
            if let Err(e) = mailer
                .send_label(shipment_pin, reference, &file_name, pdf.to_vec())
                .await
            {
                warn!(shipment_pin, error = %e, "Failed to email label");
            }
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::fake::FakeCarrier;

    #[test]
    fn test_label_file_name_is_sanitized() {
        assert_eq!(label_file_name("SO-1001", "329014521622"), "label_SO-1001_329014521622.pdf");
        assert_eq!(label_file_name("../etc/passwd", "1"), "label____etc_passwd_1.pdf");
        assert_eq!(label_file_name("PO 55/A", "9"), "label_PO_55_A_9.pdf");
        assert_eq!(label_file_name("", "9"), "label_label_9.pdf");
    }

    #[tokio::test]
    async fn test_retrieve_writes_label() {
        let dir = std::env::temp_dir().join(format!("rf-ship-labels-{}", uuid::Uuid::new_v4()));
        let carrier = Arc::new(FakeCarrier::with_label(b"%PDF-1.4"));
        let service = LabelService::new(carrier, &dir, None);

        let path = service.retrieve("SO-1001", "PIN0001").await.unwrap();
        assert_eq!(path, dir.join("label_SO-1001_PIN0001.pdf"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4");

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_retrieve_propagates_missing_label() {
        let service = LabelService::new(Arc::new(FakeCarrier::new()), std::env::temp_dir(), None);
        assert!(matches!(
            service.retrieve("R", "PIN").await,
            Err(LabelError::Carrier(CarrierError::NotFound(_)))
        ));
    }
}
