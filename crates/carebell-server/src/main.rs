//! carebell-server - REST API server binary.

use std::net::SocketAddr;

use carebell_core::CareConfig;
use carebell_server::{create_server, AppState};
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("carebell_server=debug".parse()?),
        )
        .init();

    // Get configuration from environment
    let host = std::env::var("CAREBELL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("CAREBELL_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .map_err(|e| format!("CAREBELL_PORT must be a valid port number: {}", e))?;

    let config = match std::env::var("CAREBELL_CONFIG") {
        Ok(path) => {
            info!(%path, "Loading configuration file");
            CareConfig::from_file(path)?
        }
        Err(_) => CareConfig::from_env(),
    };

    let state = AppState::from_config(config)?;

    // Start timers, the due poller and alert dispatch
    state.runtime().start().await?;
    info!("Reminder runtime started");

    let app = create_server(state.clone());

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting carebell-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received, stopping reminder runtime...");
        })
        .await?;

    state.runtime().shutdown().await?;

    info!("Server stopped cleanly");
    Ok(())
}
