use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::{get, post}, Router};
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::info;

use super::routes;
use crate::line::LineClient;
use crate::rag::RagBot;

/// Shared state handed to every request handler.
pub struct AppState {
    pub bot: Arc<RagBot>,
    pub line: Arc<LineClient>,
    pub channel_secret: String,
    /// Bounds how many messages run through the pipeline at once
    pub limiter: Semaphore,
    pub request_timeout: Duration,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        bot: Arc<RagBot>,
        line: Arc<LineClient>,
        channel_secret: impl Into<String>,
        concurrency: usize,
        request_timeout: Duration,
    ) -> Self {
        Self {
            bot,
            line,
            channel_secret: channel_secret.into(),
            limiter: Semaphore::new(concurrency.max(1)),
            request_timeout,
            started_at: Utc::now(),
        }
    }
}

/// Builds the HTTP routes of the bot.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(routes::webhook))
        .route("/health", get(routes::health))
        .route("/api/v1/ask", post(routes::ask))
        .with_state(state)
}

/// API Server answering LINE webhooks
pub struct ApiServer {
    state: Arc<AppState>,
    host: String,
    port: u16,
}

impl ApiServer {
    pub fn new(state: AppState, host: String, port: u16) -> Self {
        info!("Creating new API server on {}:{}", host, port);
        Self {
            state: Arc::new(state),
            host,
            port,
        }
    }

    /// Binds the configured address and serves until Ctrl-C or SIGTERM.
    pub async fn start(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        info!("Starting server on {}:{}", self.host, self.port);
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;

        info!("Server started successfully");
        axum::serve(listener, router(Arc::clone(&self.state)))
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
    info!("Shutdown signal received");
}
