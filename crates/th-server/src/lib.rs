//! TrueHearted Import Server Library
//!
//! HTTP surface for running a legacy dump import:
//!
//! - `POST /functions/v1/import-data` with `{"sqlContent": "...", "options": {..}}`
//!   returns the per-kind tally
//! - `GET /health`

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use th_import::config::ImportConfig;
use th_import::store::DestinationStore;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::compression::CompressionLayer;
use tracing::{info, warn};

use crate::config::Config;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DestinationStore>,
    pub import_defaults: ImportConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn DestinationStore>, import_defaults: ImportConfig) -> Self {
        Self {
            store,
            import_defaults,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(routes::health_check))
        .route("/functions/v1/import-data", post(routes::import_data))
        .with_state(state)
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Serve `app` until `signal` resolves, then drain in-flight requests
///
/// Draining stops after `grace` even if imports are still running.
pub async fn serve_until<S>(
    listener: TcpListener,
    app: Router,
    signal: S,
    grace: Duration,
) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let stopping = Arc::new(Notify::new());
    let notify = stopping.clone();

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            notify.notify_one();
        })
        .into_future();

    let deadline = async {
        stopping.notified().await;
        info!("Draining in-flight requests for up to {} seconds", grace.as_secs());
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => result,
        _ = deadline => {
            warn!("Shutdown grace period elapsed with requests still in flight");
            Ok(())
        },
    }
}
