use std::time::Duration;

use anyhow::Context;
use bookshelf::logging::init_tracing;
use bookshelf::metrics::{init_metrics, metrics_app};
use bookshelf::router::init_router;
use bookshelf::state::init_app_state;
use bookshelf_config::ServerConfig;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    init_tracing().context("Failed to initialize logging")?;

    let server_config = ServerConfig::from_env();

    if let Some(handle) = init_metrics().context("Failed to install metrics recorder")? {
        let metrics_addr = format!("0.0.0.0:{}", server_config.metrics_port);
        let metrics_listener = TcpListener::bind(&metrics_addr)
            .await
            .with_context(|| format!("Failed to bind metrics listener on {}", metrics_addr))?;
        info!("Metrics available at http://{}/metrics", metrics_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, metrics_app(handle)).await {
                error!(error = %e, "Metrics server stopped");
            }
        });
    }

    let state = init_app_state().await?;
    let background = state.background.clone();
    let app = init_router(state);

    let addr = format!("0.0.0.0:{}", server_config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running on http://{}", addr);
    info!("OpenAPI document at http://{}/v1/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!(
        in_flight = background.in_flight(),
        "Waiting for background tasks"
    );
    let drain = Duration::from_secs(server_config.shutdown_drain_secs);
    if tokio::time::timeout(drain, background.drain()).await.is_err() {
        warn!(
            in_flight = background.in_flight(),
            "Background tasks still running at shutdown"
        );
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
