//! RF-Ship
//!
//! Warehouse shipping bridge. Keeps a customer address book, creates
//! Purolator shipments from it (one at a time, by order, or in CSV batches),
//! saves labels and extracts ERP data for RF scanners.

use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use std::time::Instant;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

mod address_book;
mod api;
mod batch;
mod carrier;
mod cli;
mod commands;
mod config;
mod db;
mod domain;
mod erp;
mod labels;
mod shipping;

use crate::address_book::AddressBook;
use crate::api::middleware::ApiMiddleware;
use crate::cli::{Cli, Commands};
use crate::config::Settings;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Settings,
    pub book: AddressBook,
    pub started_at: Instant,
}

#[actix_web::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Commands::Serve));

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e:#}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so `rpc` keeps stdout for its JSON response
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rf_ship=info,actix_web=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load()?;

    match cli.command {
        Commands::Serve => serve(settings).await,
        command => cli::run(command, settings).await,
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!(
        "Starting RF-Ship v{} on {}",
        env!("CARGO_PKG_VERSION"),
        bind_addr
    );

    let store = cli::open_store(&settings).await?;
    let carrier = cli::carrier_or_unavailable(&settings);
    info!(carrier = carrier.name(), "Carrier ready");

    let api_key = settings.server.api_key.clone();
    if api_key.is_none() {
        info!("No API key configured, running without authentication");
    }
    let workers = settings.server.workers.unwrap_or_else(num_cpus::get);

    // Create shared application state
    let app_state = web::Data::new(AppState {
        book: cli::address_book(store, carrier, &settings),
        settings,
        started_at: Instant::now(),
    });

    // Configure and start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::JsonConfig::default().limit(256 * 1024))
            // Shared API key check (skipped when no key is configured)
            .wrap(ApiMiddleware::new(api_key.clone()))
            // Middleware (order matters - these wrap around ApiMiddleware)
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Service", "rf-ship"))
                    .add(("X-Version", env!("CARGO_PKG_VERSION")))
            )
            // Routes
            .configure(api::configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
