//! Route gatekeeper.
//!
//! An authenticating reverse proxy: every request is classified against the
//! configured route patterns and either forwarded, forwarded with auth left
//! to the application, or redirected to sign-in.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ request id ──▶ gatekeeper ──┬─ api path ───────────▶ proxy ──▶ upstream app
//!                                 │        ├─ public path ────────▶ proxy
//!                                 │        └─ protected path
//!                                 │              identity lookup ──┬─ user ──▶ proxy
//!                                 │                                └─ none / timeout
//!                                 ▼                                     307 → sign-in?redirect_url=…
//!                          identity provider
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use route_gatekeeper::config::{load_config, watcher::ConfigWatcher, GatekeeperConfig};
use route_gatekeeper::gate::RemoteIdentityLookup;
use route_gatekeeper::lifecycle::{wait_for_shutdown_signal, Shutdown};
use route_gatekeeper::observability::{logging, metrics};
use route_gatekeeper::HttpServer;

#[derive(Parser)]
#[command(name = "route-gatekeeper", version, about = "Authenticating gatekeeper in front of a web application")]
struct Args {
    /// Path to the TOML configuration file. Reloaded on change.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatekeeperConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "route-gatekeeper starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        sign_in_path = %config.auth.sign_in_path,
        public_routes = ?config.routes.public_routes,
        api_routes = ?config.routes.api_routes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let lookup = Arc::new(RemoteIdentityLookup::from_config(&config.auth)?);

    // The watcher must stay alive for reloads to keep arriving.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path, config.clone());
            (Some(watcher.run()?), updates)
        }
        None => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config, lookup)?;

    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
