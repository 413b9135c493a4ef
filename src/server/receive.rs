use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{debug, error};
use serde_json::{json, Value};
use std::sync::Arc;

use super::AppState;
use crate::constants::FORWARD_KEY_HEADER;

/// `POST /api/receive`: stores a log entry forwarded by another relay.
pub(crate) async fn receive_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(expected) = &state.config.log_forward_key {
        let provided = headers.get(FORWARD_KEY_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Missing or invalid key" })),
            )
                .into_response();
        }
    }

    let entry = match serde_json::from_slice::<Value>(&body) {
        Ok(entry @ Value::Object(_)) => entry,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Body must be a JSON object" })),
            )
                .into_response();
        }
    };

    let id = entry.get("id").cloned().unwrap_or(Value::Null);
    match state.stores.received.append(entry).await {
        Ok(()) => {
            debug!("Stored forwarded log entry {}", id);
            (StatusCode::OK, Json(json!({ "ok": true, "id": id }))).into_response()
        }
        Err(e) => {
            error!("Failed to store forwarded log entry: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to store log entry" })),
            )
                .into_response()
        }
    }
}
