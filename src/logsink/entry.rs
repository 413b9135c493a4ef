use axum::http::HeaderMap;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::IpAddr;
use uuid::Uuid;

use crate::constants::RESPONSE_SUMMARY_CHARS;
use crate::extract::{extract_text, truncate_chars};
use crate::logsink::geo::GeoInfo;

/// Network metadata of the caller, taken from request headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub user_agent: Option<String>,
    pub via: Option<String>,
    pub forwarded: Option<String>,
    pub referer: Option<String>,
}

/// Who sent the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallerInfo {
    /// Empty when no address could be determined
    pub ip: String,
    pub network: NetworkInfo,
}

impl CallerInfo {
    /// Reads the caller address from proxy headers, falling back to the
    /// socket peer.
    ///
    /// Header order: `x-forwarded-for` (first hop), `cf-connecting-ip`,
    /// `x-real-ip`. A header whose value is not an IP address is skipped.
    pub fn from_request(headers: &HeaderMap, peer: Option<IpAddr>) -> Self {
        let forwarded_ip = ["x-forwarded-for", "cf-connecting-ip", "x-real-ip"]
            .iter()
            .filter_map(|name| header_value(headers, name))
            .find_map(|value| value.split(',').next().and_then(|ip| ip.trim().parse::<IpAddr>().ok()));

        let ip = forwarded_ip
            .or(peer)
            .map(|addr| addr.to_string())
            .unwrap_or_default();

        let network = NetworkInfo {
            user_agent: header_value(headers, "user-agent"),
            via: header_value(headers, "via"),
            forwarded: header_value(headers, "forwarded"),
            referer: header_value(headers, "referer").or_else(|| header_value(headers, "referrer")),
        };

        Self { ip, network }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub contents: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSummary {
    /// First characters of the serialized response
    pub truncated: String,
}

/// One durable record of a successful exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub timestamp: String,
    pub ip: Option<String>,
    pub network: NetworkInfo,
    pub geo: Option<GeoInfo>,
    /// Network operator of the caller, from the geolocation answer
    pub provider: Option<String>,
    pub request: RequestRecord,
    pub response_text: Option<String>,
    pub response_full: Value,
    pub response_summary: ResponseSummary,
}

impl LogEntry {
    pub fn new(caller: CallerInfo, geo: Option<GeoInfo>, contents: Value, response: Value) -> Self {
        let response_text = Some(extract_text(&response)).filter(|text| !text.is_empty());
        let serialized = serde_json::to_string(&response).unwrap_or_default();
        let provider = geo
            .as_ref()
            .and_then(|g| g.isp.clone().or_else(|| g.org.clone()))
            .filter(|p| !p.is_empty());

        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            ip: Some(caller.ip).filter(|ip| !ip.is_empty()),
            network: caller.network,
            geo,
            provider,
            request: RequestRecord { contents },
            response_text,
            response_summary: ResponseSummary {
                truncated: truncate_chars(&serialized, RESPONSE_SUMMARY_CHARS).to_string(),
            },
            response_full: response,
        }
    }
}
