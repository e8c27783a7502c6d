//! ERP (SAP Business One on SQL Server) extracts
//!
//! Read-only queries that feed the RF scanning workflow: open purchase
//! order lines for receiving and bin inventory for cycle counts.

pub mod inventory;
pub mod purchase_orders;
pub mod writer;

use chrono::NaiveDate;
use thiserror::Error;
use tiberius::{AuthMethod, Client, Config, Query};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use crate::config::ErpSettings;

pub type ErpClient = Client<Compat<TcpStream>>;

#[derive(Debug, Error)]
pub enum ErpError {
    #[error("Missing ERP settings: {0}")]
    MissingSettings(String),

    #[error("SQL Server error: {0}")]
    Sql(#[from] tiberius::error::Error),

    #[error("Invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Query parameter, bound positionally as `@P1`, `@P2`, ...
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Date(NaiveDate),
}

/// A query with its parameters in binding order
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SqlQuery {
    fn bind(&self) -> Query<'_> {
        let mut query = Query::new(self.sql.as_str());
        for param in &self.params {
            match param {
                SqlParam::Text(value) => query.bind(value.as_str()),
                SqlParam::Date(value) => query.bind(*value),
            }
        }
        query
    }

    /// Run and collect the first result set
    pub async fn fetch(&self, client: &mut ErpClient) -> Result<Vec<tiberius::Row>, ErpError> {
        debug!(params = self.params.len(), "Running ERP query");
        let rows = self.bind().query(client).await?.into_first_result().await?;
        Ok(rows)
    }
}

/// Parse a `YYYY-MM-DD` command-line date
pub fn parse_date(value: &str) -> Result<NaiveDate, ErpError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ErpError::InvalidDate(value.to_string()))
}

/// Split `host`, `host,port` or `host:port` into host and port
pub fn parse_server(server: &str, default_port: u16) -> (String, u16) {
    let server = server.trim();
    for separator in [',', ':'] {
        if let Some((host, port)) = server.rsplit_once(separator) {
            if let Ok(port) = port.trim().parse() {
                return (host.trim().to_string(), port);
            }
        }
    }
    (server.to_string(), default_port)
}

fn missing_settings(settings: &ErpSettings) -> Vec<&'static str> {
    [
        ("SQL_SERVER", &settings.server),
        ("SQL_DATABASE", &settings.database),
        ("SQL_USER", &settings.user),
        ("SQL_PASSWORD", &settings.password),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect()
}

fn build_config(settings: &ErpSettings) -> Result<Config, ErpError> {
    let missing = missing_settings(settings);
    if !missing.is_empty() {
        return Err(ErpError::MissingSettings(missing.join(", ")));
    }

    let (host, port) = parse_server(&settings.server, settings.port);
    let mut config = Config::new();
    config.host(&host);
    config.port(port);
    config.database(&settings.database);
    config.authentication(AuthMethod::sql_server(&settings.user, &settings.password));
    if settings.trust_cert {
        config.trust_cert();
    }
    Ok(config)
}

/// Open a connection to the ERP database
pub async fn connect(settings: &ErpSettings) -> Result<ErpClient, ErpError> {
    let config = build_config(settings)?;

    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    let client = Client::connect(config, tcp.compat_write()).await?;

    info!(server = %settings.server, database = %settings.database, "Connected to ERP database");
    Ok(client)
}
