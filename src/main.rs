//! Edge router server binary.
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http server ──▶ dispatcher ──▶ resolver ──▶ route store
//!                                        │
//!                   ┌────────────────────┼────────────────────┐
//!                   ▼                    ▼                    ▼
//!               redirect              proxy              object serve
//!            (Location only)     (SSRF-checked origin)  (bucket + edge cache)
//!                                        │
//!                                        ▼
//!                              usage recorder (detached)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_router::config::{load_config, RouterConfig};
use edge_router::lifecycle::signals::spawn_signal_listener;
use edge_router::observability::{logging, metrics};
use edge_router::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "edge-router")]
#[command(about = "Edge request router: redirects, reverse proxy and object serving", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "edge-router.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = if args.config.exists() {
        load_config(&args.config)?
    } else {
        RouterConfig::default()
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("edge-router v{} starting", env!("CARGO_PKG_VERSION"));
    if !args.config.exists() {
        tracing::warn!(path = %args.config.display(), "Config file not found, using defaults");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        domains = config.domains.len(),
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        proxy_timeout_secs = config.proxy.timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
