use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use air_quality_client::UpstreamClient;
use reading_log::ReadingLog;

mod collector;
mod config;
mod error;
mod history_routes;
mod pollution_routes;
mod readings;
mod reporter;
mod routes;
#[cfg(test)]
mod test_support;

use collector::Collector;
use config::GatewayConfig;
use reporter::{ErrorReporter, TracingReporter};
use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "air_quality_gateway=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env()?;

    let client = Arc::new(UpstreamClient::new(config.upstream)?);
    let log = Arc::new(ReadingLog::open(&config.log_path));
    let reporter: Arc<dyn ErrorReporter> = Arc::new(TracingReporter);
    tracing::info!("   Reading log at {}", log.path().display());

    let shutdown = CancellationToken::new();
    let collector = Arc::new(Collector::new(
        Arc::clone(&client),
        Arc::clone(&log),
        Arc::clone(&reporter),
        config.collector,
    ));
    let collector_task = collector.spawn(shutdown.clone());

    let app = routes::router(AppState {
        client,
        log,
        reporter,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Air Quality Gateway starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    if let Err(e) = collector_task.await {
        tracing::error!("Collector task failed: {}", e);
    }
    tracing::info!("Air Quality Gateway stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received");
}
