//! HTTP server of the member service
//!
//! - [`ServiceHost`]: shared state, built once at startup
//! - [`build_router`]: member routes plus `/health`, wrapped in the error pipeline
//! - [`serve`]: binds the listener and runs until Ctrl+C or SIGTERM

pub mod host;
pub mod router;

pub use host::ServiceHost;
pub use router::{build_router, with_error_pipeline};

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Serve the application with graceful shutdown
///
/// Binds to `server.bind` from the host configuration.
pub async fn serve(host: Arc<ServiceHost>) -> Result<()> {
    let addr = host.config().server.bind.clone();
    let app = build_router(host);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
