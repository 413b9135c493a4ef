use axum::body::Bytes;
use axum::extract::{ConnectInfo, FromRequest, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::warn;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::time::Instant;

use super::AppState;
use crate::logsink::CallerInfo;
use crate::upstream::GenerationRequest;

/// `POST /api/chat`: relays `{ contents }` through the credential pool.
pub(crate) async fn chat_handler(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let headers = request.headers().clone();

    let generation = match Bytes::from_request(request, &state).await {
        Ok(bytes) => serde_json::from_slice::<Value>(&bytes)
            .ok()
            .and_then(|body| GenerationRequest::from_body(&body)),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "error": "Request body too large" })),
            )
                .into_response();
        }
        Err(rejection) => {
            warn!("Failed to read request body: {}", rejection.body_text());
            None
        }
    };
    let Some(generation) = generation else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Body \"contents\" is required" })),
        )
            .into_response();
    };

    #[cfg(feature = "metrics")]
    let started = Instant::now();

    let result = state.coordinator.run(&generation).await;

    #[cfg(feature = "metrics")]
    crate::metrics::record_request(&result, started.elapsed());

    match result {
        Ok(payload) => {
            let caller = CallerInfo::from_request(&headers, peer);
            let sink = state.sink.clone();
            let contents = generation.contents;
            let response = payload.clone();

            if state.config.detach_logging {
                tokio::spawn(async move {
                    sink.record(caller, contents, response).await;
                });
            } else {
                sink.record(caller, contents, response).await;
            }

            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => {
            let status = StatusCode::from_u16(error.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(error.body())).into_response()
        }
    }
}
