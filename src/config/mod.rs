//! Configuration module for the shipping bridge

use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};
use std::path::PathBuf;

/// Main application settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub carrier: CarrierSettings,
    pub sender: SenderSettings,
    pub labels: LabelSettings,
    pub email: EmailSettings,
    pub erp: ErpSettings,
    pub batch: BatchSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Shared API key; when unset the HTTP API runs without authentication
    pub api_key: Option<String>,
}

/// Address book database (PostgreSQL)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<usize>,
}

/// Carrier web service credentials and endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CarrierSettings {
    pub api_username: String,
    pub api_password: String,
    pub account_number: String,
    pub shipment_url: String,
    pub documents_url: String,
    pub timeout_secs: u64,
}

/// Default sender (ship-from) address
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SenderSettings {
    pub name: String,
    pub street: String,
    pub city: String,
    pub province: String,
    pub postal: String,
    pub phone: String,
}

/// Where retrieved shipping labels are written
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LabelSettings {
    pub dir: PathBuf,
}

/// Outbound SMTP settings for label emails
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub from: Option<String>,
    pub password: Option<String>,
    pub to: String,
}

/// ERP (SQL Server) connection used by the export jobs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ErpSettings {
    pub server: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub trust_cert: bool,
}

/// Batch runner output
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub results_dir: PathBuf,
}

/// Plain environment variables that predate the `RFSHIP_` prefix.
/// They win over files and prefixed variables.
const LEGACY_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("database.url", "DATABASE_URL"),
    ("carrier.api_username", "PUROLATOR_API_USERNAME"),
    ("carrier.api_password", "PUROLATOR_API_PASSWORD"),
    ("carrier.account_number", "PUROLATOR_API_ACCOUNT"),
    ("sender.name", "DEFAULT_SENDER_NAME"),
    ("sender.street", "DEFAULT_SENDER_STREET"),
    ("sender.city", "DEFAULT_SENDER_CITY"),
    ("sender.province", "DEFAULT_SENDER_PROVINCE"),
    ("sender.postal", "DEFAULT_SENDER_POSTAL"),
    ("sender.phone", "DEFAULT_SENDER_PHONE"),
    ("email.smtp_server", "EMAIL_SMTP_SERVER"),
    ("email.smtp_port", "EMAIL_SMTP_PORT"),
    ("email.from", "EMAIL_FROM"),
    ("email.password", "EMAIL_PASSWORD"),
    ("email.to", "EMAIL_TO"),
    ("erp.server", "SQL_SERVER"),
    ("erp.database", "SQL_DATABASE"),
    ("erp.user", "SQL_USER"),
    ("erp.password", "SQL_PASSWORD"),
];

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Legacy plain variables (DATABASE_URL, PUROLATOR_API_*, EMAIL_*, SQL_*)
    /// 2. Environment variables (prefixed with RFSHIP_)
    /// 3. config/local.toml (gitignored)
    /// 4. config/default.toml
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        let mut builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // RFSHIP_SERVER__PORT, RFSHIP_CARRIER__ACCOUNT_NUMBER, ...
            .add_source(
                Environment::with_prefix("RFSHIP")
                    .separator("__")
                    .try_parsing(true)
            );

        for (key, var) in LEGACY_ENV_OVERRIDES {
            let value = std::env::var(var).ok().filter(|v| !v.is_empty());
            builder = builder.set_override_option(*key, value)?;
        }

        builder.build()?.try_deserialize()
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "0.0.0.0".to_string(),
            port: 3001,
            workers: None,
            api_key: None,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            url: String::new(),
            max_connections: Some(10),
        }
    }
}

impl Default for CarrierSettings {
    fn default() -> Self {
        CarrierSettings {
            api_username: String::new(),
            api_password: String::new(),
            account_number: String::new(),
            shipment_url: "https://webservices.purolator.com/EWS/V2/Shipping/ShippingService.asmx".to_string(),
            documents_url: "https://webservices.purolator.com/EWS/V1/ShippingDocuments/ShippingDocumentsService.asmx".to_string(),
            timeout_secs: 30,
        }
    }
}

impl CarrierSettings {
    /// Names of the credential fields that are still empty
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_username.is_empty() {
            missing.push("PUROLATOR_API_USERNAME");
        }
        if self.api_password.is_empty() {
            missing.push("PUROLATOR_API_PASSWORD");
        }
        if self.account_number.is_empty() {
            missing.push("PUROLATOR_API_ACCOUNT");
        }
        missing
    }
}

impl Default for SenderSettings {
    fn default() -> Self {
        SenderSettings {
            name: "Your Warehouse".to_string(),
            street: "123 Main Street".to_string(),
            city: "Toronto".to_string(),
            province: "ON".to_string(),
            postal: "M5J2R8".to_string(),
            phone: "416-555-1234".to_string(),
        }
    }
}

impl Default for LabelSettings {
    fn default() -> Self {
        LabelSettings {
            dir: PathBuf::from("labels"),
        }
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        EmailSettings {
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            from: None,
            password: None,
            to: "recipient@example.com".to_string(),
        }
    }
}

impl EmailSettings {
    /// Email is only sent when both a sender address and password exist
    pub fn is_configured(&self) -> bool {
        self.from.as_deref().is_some_and(|f| !f.is_empty())
            && self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

impl Default for ErpSettings {
    fn default() -> Self {
        ErpSettings {
            server: String::new(),
            port: 1433,
            database: String::new(),
            user: String::new(),
            password: String::new(),
            trust_cert: true,
        }
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        BatchSettings {
            results_dir: PathBuf::from("."),
        }
    }
}
