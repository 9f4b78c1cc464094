//! Route dispatch server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ routing::Router ──▶ security::RouteAuthenticator
//!                          │                 │                       │
//!                          │                 ▼                       ▼
//!                          │          match + params          approve / redirect
//!                          ▼
//!     Client Response ◀── controller (http::dispatch) or 302 / 404 / 500
//!
//!     config::RouterWatcher ──▶ rebuilt Router ──▶ ArcSwap<DispatchTable>
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::Parser;
use tokio::net::TcpListener;

use route_dispatch::config::{load_config, RouterWatcher};
use route_dispatch::http::{echo, HandlerRegistry, HttpServer};
use route_dispatch::observability::{logging, metrics};
use route_dispatch::routing::Router;

#[derive(Parser)]
#[command(name = "route-dispatch")]
#[command(about = "Serve requests through a configured route table", long_about = None)]
struct Args {
    /// Route configuration file.
    #[arg(short, long, default_value = "config/routes.toml")]
    config: PathBuf,

    /// Do not reload routes when the file changes.
    #[arg(long)]
    no_watch: bool,
}

fn controllers() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register("echo", echo);
    registry
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "route-dispatch starting");

    let router = Arc::new(Router::from_config(&config)?);
    let registry = Arc::new(controllers());
    let script_name = config.router.script_name.clone();
    let table = Arc::new(ArcSwap::from_pointee(
        registry.resolve(router, script_name.clone())?,
    ));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        script_name = %script_name,
        "Configuration loaded"
    );

    // Kept alive for the lifetime of the server.
    let _watcher = if args.no_watch {
        None
    } else {
        let (watcher, mut updates) = RouterWatcher::new(&args.config);
        let handle = watcher.run()?;
        let table = Arc::clone(&table);
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            while let Some(router) = updates.recv().await {
                match registry.resolve(router, script_name.clone()) {
                    Ok(next) => {
                        table.store(Arc::new(next));
                        tracing::info!("Route table swapped");
                    }
                    Err(e) => tracing::error!(error = %e, "Reloaded routes rejected, keeping current table"),
                }
            }
        });
        Some(handle)
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(table, config.listener.trust_session_headers);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
