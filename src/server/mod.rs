//! HTTP surface of the relay
//!
//! Routes:
//! - `POST /api/chat` - Generation through the credential pool
//! - `GET /api/logs` - Filtered view of the log store
//! - `GET /api/debug` - Store counts and metadata
//! - `POST /api/receive` - Accepts log entries forwarded by another relay
//! - `GET /health` - Returns "OK" for health checks

mod chat;
mod inspect;
mod receive;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::constants::MAX_BODY_BYTES;
use crate::errors::{RelayError, RelayResult};
use crate::logsink::{LogSink, StoreSet};
use crate::pool::FailoverCoordinator;
use crate::upstream::GoogleUpstream;

/// Shared, read-only state of every handler.
pub(crate) struct AppState {
    pub(crate) config: Arc<Config>,
    pub(crate) coordinator: FailoverCoordinator,
    pub(crate) sink: Arc<LogSink>,
    pub(crate) stores: StoreSet,
}

/// The relay server, built once from a [`Config`].
pub struct RelayServer {
    state: Arc<AppState>,
}

impl RelayServer {
    /// Wires the Google upstream client, the log stores and the sink.
    pub fn new(config: Config) -> RelayResult<Self> {
        let upstream = Arc::new(GoogleUpstream::from_config(&config)?);
        let coordinator = FailoverCoordinator::new(config.credential_pool(), upstream);
        Self::with_coordinator(config, coordinator)
    }

    /// Like [`RelayServer::new`] but with a caller-supplied coordinator.
    pub fn with_coordinator(config: Config, coordinator: FailoverCoordinator) -> RelayResult<Self> {
        let stores = StoreSet::from_config(&config);
        let sink = Arc::new(LogSink::from_config(&config, stores.primary.clone())?);

        Ok(Self {
            state: Arc::new(AppState {
                config: Arc::new(config),
                coordinator,
                sink,
                stores,
            }),
        })
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/chat", post(chat::chat_handler).fallback(method_not_allowed))
            .route("/api/logs", get(inspect::logs_handler).fallback(method_not_allowed))
            .route("/api/debug", get(inspect::debug_handler).fallback(method_not_allowed))
            .route("/api/receive", post(receive::receive_handler).fallback(method_not_allowed))
            .route("/health", get(health_check))
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .with_state(self.state.clone())
    }

    /// Serves on an already bound listener until the server stops.
    pub async fn serve_on(&self, listener: TcpListener) -> RelayResult<()> {
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .await
            .map_err(|e| RelayError::ApiError(format!("Server error: {}", e)))
    }

    /// Binds the configured address and serves.
    pub async fn start(&self) -> RelayResult<()> {
        let address = &self.state.config.bind_address;
        let listener = TcpListener::bind(address).await.map_err(|e| {
            RelayError::ConfigError(format!("Failed to bind {}: {}", address, e))
        })?;

        log::info!(
            "keyrelay listening on http://{} (model {}, {} upstream key(s))",
            address,
            self.state.config.model,
            self.state.coordinator.pool_size()
        );

        self.serve_on(listener).await
    }
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

async fn health_check() -> &'static str {
    "OK"
}
