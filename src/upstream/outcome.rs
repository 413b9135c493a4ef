use reqwest::StatusCode;
use serde_json::Value;

/// Classification of a single upstream attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 2xx with a parsed JSON body
    Success(Value),
    /// 429, the credential's quota is spent
    QuotaExceeded,
    /// Any other non-2xx status, with the parsed error body when available
    UpstreamError { status: u16, details: Value },
    /// No usable HTTP answer (DNS, refused, timeout, unreadable body)
    NetworkError(String),
}

impl Outcome {
    /// Classifies a raw HTTP answer.
    ///
    /// A success body that is not JSON counts as a transport failure. An
    /// error body that is not JSON is kept as a plain string so the
    /// caller still sees what upstream said.
    pub fn classify(status: StatusCode, body: &[u8]) -> Self {
        if status.is_success() {
            return match serde_json::from_slice::<Value>(body) {
                Ok(payload) => Outcome::Success(payload),
                Err(e) => Outcome::NetworkError(format!("Malformed upstream response body: {}", e)),
            };
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Outcome::QuotaExceeded;
        }

        let details = match serde_json::from_slice::<Value>(body) {
            Ok(json) => json,
            Err(_) if body.is_empty() => Value::Null,
            Err(_) => Value::String(String::from_utf8_lossy(body).into_owned()),
        };

        Outcome::UpstreamError {
            status: status.as_u16(),
            details,
        }
    }

    /// Short stable name, used in logs and metric labels.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::QuotaExceeded => "quota_exceeded",
            Outcome::UpstreamError { .. } => "upstream_error",
            Outcome::NetworkError(_) => "network_error",
        }
    }
}
