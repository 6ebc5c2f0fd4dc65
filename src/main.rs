//! Course Catalog Service
//!
//! Add, list, view and delete course records over HTTP, with a span and a
//! counter for every operation.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                  COURSE CATALOG                  │
//!                        │                                                  │
//!     Client Request     │  ┌─────────┐    ┌──────────────┐    ┌─────────┐  │
//!     ───────────────────┼─▶│  http   │───▶│   catalog    │───▶│  store  │  │
//!                        │  │ server  │    │   service    │    │ memory/ │  │
//!                        │  └─────────┘    └──────┬───────┘    │  json   │  │
//!                        │                        │            └─────────┘  │
//!                        │                        ▼                         │
//!                        │                 ┌──────────────┐                 │
//!                        │                 │  validator   │                 │
//!                        │                 └──────────────┘                 │
//!                        │                                                  │
//!                        │  ┌────────────────────────────────────────────┐  │
//!                        │  │           Cross-Cutting Concerns           │  │
//!                        │  │  ┌────────┐ ┌─────────┐ ┌───────────────┐  │  │
//!                        │  │  │ config │ │ tracing │ │    metrics    │  │  │
//!                        │  │  └────────┘ └────┬────┘ └───────────────┘  │  │
//!                        │  │                  └──▶ OTLP / log export    │  │
//!                        │  └────────────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use course_catalog::config::{load_config, CatalogConfig};
use course_catalog::lifecycle::{build_services, signals, Shutdown};
use course_catalog::observability::{logging, metrics};
use course_catalog::HttpServer;

#[derive(Parser)]
#[command(name = "course-catalog")]
#[command(about = "Course catalog service with request tracing", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => CatalogConfig::default(),
    };

    let _log_guard = logging::init(&config.observability)?;
    tracing::info!("course-catalog v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        store = ?config.store.backend,
        span_exporter = ?config.observability.tracing.exporter,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let shutdown = Shutdown::new();
    let services = build_services(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(config, services.catalog);
    server.run(listener, shutdown.subscribe()).await?;

    // Requests have drained; their spans are all queued by now.
    if let Some(exporter) = services.otlp {
        exporter.shutdown().await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
