//! HTTP surface: `POST /translate`, `GET /` and `GET /metrics`.

use crate::error::GatewayError;
use crate::handler::{HealthReport, TranslationRequest, TranslationResult, TranslationService};
use crate::metrics::MetricsReport;
use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub type AppState = Arc<TranslationService>;

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/translate", post(translate))
        .route("/metrics", get(metrics))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

async fn health(State(service): State<AppState>) -> Json<HealthReport> {
    Json(service.health())
}

async fn translate(
    State(service): State<AppState>,
    Json(request): Json<TranslationRequest>,
) -> Result<Json<TranslationResult>, GatewayError> {
    service.translate(request).await.map(Json)
}

async fn metrics(State(service): State<AppState>) -> Json<MetricsReport> {
    Json(service.metrics().report())
}

/// Serve until Ctrl+C or SIGTERM.
pub async fn serve(service: AppState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server shutdown complete");
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
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
