//! Email delivery for shipping labels
//!
//! Uses SMTP (STARTTLS) via lettre. Sending is optional: the mailer is only
//! built when a from-address and password are configured.

use lettre::{
    message::{header::ContentType, Attachment, MultiPart, SinglePart},
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::info;

use crate::config::EmailSettings;

/// Errors that can occur when sending email
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email is not configured (EMAIL_FROM and EMAIL_PASSWORD are required)")]
    NotConfigured,

    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Sends label PDFs to the shipping inbox
#[derive(Clone)]
pub struct LabelMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    to_address: String,
}

impl LabelMailer {
    /// Build a mailer from settings.
    ///
    /// # Errors
    ///
    /// `NotConfigured` when the sender or password is missing.
    pub fn new(settings: &EmailSettings) -> Result<Self, EmailError> {
        let (Some(from), Some(password)) = (settings.from.as_deref(), settings.password.as_deref()) else {
            return Err(EmailError::NotConfigured);
        };
        if !settings.is_configured() {
            return Err(EmailError::NotConfigured);
        }

        let credentials = Credentials::new(from.to_string(), password.to_string());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_server)?
            .port(settings.smtp_port)
            .credentials(credentials)
            .build();

        Ok(LabelMailer {
            mailer,
            from_address: from.to_string(),
            to_address: settings.to.clone(),
        })
    }

    /// Email one label as a PDF attachment
    pub async fn send_label(
        &self,
        shipment_pin: &str,
        reference: &str,
        file_name: &str,
        pdf: Vec<u8>,
    ) -> Result<(), EmailError> {
        let message = build_label_message(
            &self.from_address,
            &self.to_address,
            shipment_pin,
            reference,
            file_name,
            pdf,
        )?;
        self.mailer.send(message).await?;

        info!(shipment_pin, to = %self.to_address, "Label emailed");
        Ok(())
    }
}

fn label_subject(shipment_pin: &str) -> String {
    format!("Purolator Shipping Label - {}", shipment_pin)
}

fn build_label_message(
    from: &str,
    to: &str,
    shipment_pin: &str,
    reference: &str,
    file_name: &str,
    pdf: Vec<u8>,
) -> Result<Message, EmailError> {
    let body = format!(
        "Please find attached the shipping label.\n\nTracking PIN: {}\nReference: {}\n",
        shipment_pin, reference
    );
    let pdf_type = ContentType::parse("application/pdf")
        .map_err(|e| EmailError::InvalidAddress(e.to_string()))?;

    let message = Message::builder()
        .from(
            from.parse()
                .map_err(|_| EmailError::InvalidAddress(from.to_string()))?,
        )
        .to(to
            .parse()
            .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
        .subject(label_subject(shipment_pin))
        .multipart(
            MultiPart::mixed()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(body),
                )
                .singlepart(Attachment::new(file_name.to_string()).body(pdf, pdf_type)),
        )?;

    Ok(message)
}
