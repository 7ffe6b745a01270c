//! InVEST UI server - serves the workbench's model, validation and datastack endpoints.

use std::env;
use std::path::Path;
use std::sync::Arc;

use invest_common::ModelRegistry;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use ui_server::{build_router, AppState, Config, ShutdownHandle, ShutdownSignal};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("invest-ui-server {}", VERSION);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(());
    }

    // Load configuration
    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Check config.toml and INVEST__SECTION__KEY environment variables.",
            e
        )
    })?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting invest-ui-server {}", VERSION);

    // Build the model registry once; handlers only read it
    let registry = ModelRegistry::load(config.catalog.dir.as_deref().map(Path::new))?;
    tracing::info!("Registered {} models", registry.len());

    let (shutdown, signal) = ShutdownHandle::new();
    let state = Arc::new(AppState::new(Arc::new(registry)).with_shutdown(shutdown));
    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", config.api.host, config.api.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(signal))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(signal: ShutdownSignal) {
    tokio::select! {
        _ = signal.wait() => tracing::info!("Shutting down on request"),
        _ = tokio::signal::ctrl_c() => tracing::info!("Received Ctrl-C, shutting down"),
    }
}
