use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::AppState;
use crate::constants::{DEFAULT_VIEW_LIMIT, MAX_LOG_ENTRIES, VIEW_KEY_HEADER};
use crate::logsink::StoreSet;
use url::form_urlencoded;

/// First value of `name` in a raw query string. Repeated parameters and
/// undecodable pairs never fail the request.
pub fn query_param(raw: Option<&str>, name: &str) -> Option<String> {
    form_urlencoded::parse(raw.unwrap_or("").as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// `GET /api/logs`: newest-first entries, optionally filtered.
pub(crate) async fn logs_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let query = query.as_deref();

    if let Some(required) = &state.config.log_view_key {
        let provided = query_param(query, "key")
            .filter(|key| !key.is_empty())
            .or_else(|| headers.get(VIEW_KEY_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string));
        if provided.as_deref() != Some(required.as_str()) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Missing or invalid key" })),
            )
                .into_response();
        }
    }

    let entries = read_viewable_entries(&state.stores).await;
    let limit = parse_limit(query_param(query, "limit").as_deref());
    let needle = query_param(query, "q").unwrap_or_default().to_lowercase();

    let mut filtered = filter_entries(entries, &needle);
    filtered.truncate(limit);

    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "no-store")],
        Json(Value::Array(filtered)),
    )
        .into_response()
}

/// Received entries when that store exists, the primary store otherwise.
/// Anything unreadable or malformed yields an empty list.
async fn read_viewable_entries(stores: &StoreSet) -> Vec<Value> {
    let raw = match stores.received.read_raw().await {
        Ok(Some(text)) => Some(text),
        _ => stores.primary.read_raw().await.ok().flatten(),
    };

    match raw {
        Some(text) if !text.trim().is_empty() => {
            serde_json::from_str::<Vec<Value>>(&text).unwrap_or_else(|e| {
                log::warn!("Log store is not a JSON array: {}", e);
                Vec::new()
            })
        }
        _ => Vec::new(),
    }
}

/// `limit` query parameter: default 100 when absent, invalid or zero,
/// never above the store capacity.
pub fn parse_limit(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_VIEW_LIMIT)
        .min(MAX_LOG_ENTRIES)
}

/// Keeps entries whose id, ip, geo country/city or request contents
/// contain `needle` (already lowercased). An empty needle keeps everything.
pub fn filter_entries(entries: Vec<Value>, needle: &str) -> Vec<Value> {
    if needle.is_empty() {
        return entries;
    }
    entries
        .into_iter()
        .filter(|entry| entry_matches(entry, needle))
        .collect()
}

fn entry_matches(entry: &Value, needle: &str) -> bool {
    let field_contains = |value: Option<&Value>| {
        value
            .and_then(Value::as_str)
            .map(|s| s.to_lowercase().contains(needle))
            .unwrap_or(false)
    };

    if field_contains(entry.get("id")) || field_contains(entry.get("ip")) {
        return true;
    }

    if let Some(geo) = entry.get("geo").filter(|g| g.is_object()) {
        if field_contains(geo.get("country")) || field_contains(geo.get("city")) {
            return true;
        }
    }

    entry
        .get("request")
        .and_then(|r| r.get("contents"))
        .filter(|c| !c.is_null())
        .map(|contents| contents.to_string().to_lowercase().contains(needle))
        .unwrap_or(false)
}

/// `GET /api/debug`: per-store metadata, counts and newest entry.
pub(crate) async fn debug_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    let include_all = query_param(query.as_deref(), "full").as_deref() == Some("1");
    let mut out = Map::new();

    for (name, store) in state.stores.named() {
        let stat = store.stat().await;
        let data = store.read_value().await.ok().flatten();

        let mut report = Map::new();
        report.insert("stat".to_string(), json!(stat));
        match &data {
            Some(Value::Array(entries)) => {
                report.insert("count".to_string(), json!(entries.len()));
                report.insert("last".to_string(), entries.first().cloned().unwrap_or(Value::Null));
            }
            _ => {
                report.insert("count".to_string(), Value::Null);
                report.insert("last".to_string(), Value::Null);
            }
        }
        if include_all {
            report.insert("all".to_string(), data.unwrap_or(Value::Null));
        }
        out.insert(name.to_string(), Value::Object(report));
    }

    out.insert(
        "env".to_string(),
        json!({
            "hasLogForwardUrl": state.config.log_forward_url.is_some(),
            "hasLogForwardKey": state.config.log_forward_key.is_some(),
            "logReceiverName": state.config.log_receiver_name,
        }),
    );

    Json(Value::Object(out))
}
