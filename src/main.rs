use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use concierge::{AppConfig, AppState, EvictionPolicy, StoreBackend, build_router};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "concierge")]
#[command(about = "Relays guest service requests to the staff dashboard")]
struct Cli {
    /// Bind host (overrides APP_HOST)
    #[arg(long)]
    host: Option<String>,
    /// Bind port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,
    /// Keep the ledger in this JSON file (overrides CONCIERGE_STORE_FILE and KV settings)
    #[arg(long)]
    store_file: Option<PathBuf>,
    /// Records retained before eviction (overrides CONCIERGE_MAX_REQUESTS)
    #[arg(long)]
    max_requests: Option<usize>,
    /// fifo or prefer_completed (overrides CONCIERGE_EVICTION)
    #[arg(long)]
    eviction: Option<EvictionPolicy>,
}

const DEFAULT_LOG_FILTER: &str = "concierge=debug,tower_http=info";

impl Cli {
    fn apply(self, config: &mut AppConfig) -> Result<()> {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(path) = self.store_file {
            config.store = StoreBackend::File(path);
        }
        if let Some(max_requests) = self.max_requests {
            ensure!(max_requests > 0, "--max-requests must be a positive integer");
            config.max_requests = max_requests;
        }
        if let Some(eviction) = self.eviction {
            config.eviction = eviction;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = AppConfig::from_env().context("failed to load application configuration")?;
    cli.apply(&mut config)?;

    let gateway = config
        .build_gateway()
        .context("failed to build request gateway")?;
    let app = build_router(AppState::new(Arc::new(gateway)));

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        address = %addr,
        max_requests = config.max_requests,
        "concierge listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let signal = shutdown_signal().await;
            info!(signal, "draining in-flight requests before exit");
        })
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves with the name of whichever stop signal arrives first.
async fn shutdown_signal() -> &'static str {
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(err) => {
                error!(error = %err, "cannot listen for Ctrl+C");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                "SIGTERM"
            }
            Err(err) => {
                error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    }
}
