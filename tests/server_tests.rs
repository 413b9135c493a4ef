//! End-to-end tests: a real relay on a local port, with mock servers
//! standing in for the upstream API, the geolocation service and the
//! log collector.

use keyrelay::{Config, RelayServer};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

// ============================================================================
// Test helpers
// ============================================================================

fn base_config(log_dir: &Path, upstream_url: &str, keys: &str) -> Config {
    Config {
        credentials: vec![keys.to_string()],
        upstream_base_url: upstream_url.to_string(),
        upstream_timeout_secs: 5,
        log_dir: log_dir.to_string_lossy().into_owned(),
        geo_ip_url: String::new(),
        detach_logging: false,
        ..Config::default()
    }
}

async fn spawn_relay(config: Config) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = RelayServer::new(config).unwrap();

    tokio::spawn(async move {
        let _ = server.serve_on(listener).await;
    });

    format!("http://{}", address)
}

fn chat_body() -> Value {
    json!({"contents": [{"role": "user", "parts": [{"text": "Weather in Paris?"}]}]})
}

fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{"content": {"parts": [{"text": text}], "role": "model"}, "finishReason": "STOP"}]
    })
}

fn read_store(dir: &Path, file: &str) -> Vec<Value> {
    let text = std::fs::read_to_string(dir.join(file)).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn write_store(dir: &Path, file: &str, entries: &Value) {
    std::fs::write(dir.join(file), serde_json::to_string(entries).unwrap()).unwrap();
}

// ============================================================================
// /api/chat
// ============================================================================

#[tokio::test]
async fn test_failover_to_second_key_and_log() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "K1"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "K2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Sunny")))
        .expect(1)
        .mount(&upstream)
        .await;

    let logs = TempDir::new().unwrap();
    let base = spawn_relay(base_config(logs.path(), &upstream.uri(), "K1,K2")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&chat_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let payload: Value = response.json().await.unwrap();
    assert_eq!(payload, gemini_reply("Sunny"));

    let entries = read_store(logs.path(), "logs.json");
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry["responseText"], "Sunny model STOP");
    assert_eq!(entry["responseFull"], gemini_reply("Sunny"));
    assert_eq!(entry["request"]["contents"], chat_body()["contents"]);
    assert_eq!(entry["ip"], "127.0.0.1");
    assert!(entry["geo"].is_null());
    assert!(entry["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(!entry.to_string().contains("K2"));
}

#[tokio::test]
async fn test_upstream_rejection_is_relayed_and_not_logged() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "K1"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "bad prompt"})))
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "K2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("never")))
        .expect(0)
        .mount(&upstream)
        .await;

    let logs = TempDir::new().unwrap();
    let base = spawn_relay(base_config(logs.path(), &upstream.uri(), "K1,K2")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&chat_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Generation failed");
    assert_eq!(body["details"]["status"], 400);
    assert_eq!(body["details"]["details"], json!({"error": "bad prompt"}));

    assert!(!logs.path().join("logs.json").exists());
}

#[tokio::test]
async fn test_all_keys_exhausted() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&upstream)
        .await;

    let logs = TempDir::new().unwrap();
    let base = spawn_relay(base_config(logs.path(), &upstream.uri(), "K1,K2,K3")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&chat_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "All API keys are busy or failing.");
    assert_eq!(body["details"]["message"], "Rate limit exceeded");
}

#[tokio::test]
async fn test_empty_pool_is_configuration_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let logs = TempDir::new().unwrap();
    let base = spawn_relay(base_config(logs.path(), &upstream.uri(), " , ")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&chat_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Server configuration error");
    assert_eq!(body["message"], "No API keys found.");
}

#[tokio::test]
async fn test_missing_contents_is_bad_request() {
    let upstream = MockServer::start().await;
    let logs = TempDir::new().unwrap();
    let base = spawn_relay(base_config(logs.path(), &upstream.uri(), "K1")).await;
    let client = reqwest::Client::new();

    for body in ["{}", "{\"contents\": null}", "not json", ""] {
        let response = client
            .post(format!("{}/api/chat", base))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "body {:?}", body);
        let error: Value = response.json().await.unwrap();
        assert_eq!(error["error"], "Body \"contents\" is required");
    }
}

#[tokio::test]
async fn test_oversized_body_is_payload_too_large() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let logs = TempDir::new().unwrap();
    let base = spawn_relay(base_config(logs.path(), &upstream.uri(), "K1")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .header("content-type", "application/json")
        .body(vec![b' '; keyrelay::constants::MAX_BODY_BYTES + 1])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 413);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Request body too large");
}

#[tokio::test]
async fn test_wrong_method_is_rejected() {
    let upstream = MockServer::start().await;
    let logs = TempDir::new().unwrap();
    let base = spawn_relay(base_config(logs.path(), &upstream.uri(), "K1")).await;

    let response = reqwest::get(format!("{}/api/chat", base)).await.unwrap();
    assert_eq!(response.status(), 405);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Method not allowed");

    let health = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(health.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_log_failure_does_not_fail_request() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("fine")))
        .mount(&upstream)
        .await;

    let logs = TempDir::new().unwrap();
    std::fs::create_dir(logs.path().join("logs.json")).unwrap();
    let base = spawn_relay(base_config(logs.path(), &upstream.uri(), "K1")).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&chat_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let payload: Value = response.json().await.unwrap();
    assert_eq!(payload, gemini_reply("fine"));
}

#[tokio::test]
async fn test_detached_logging_eventually_writes() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("later")))
        .mount(&upstream)
        .await;

    let logs = TempDir::new().unwrap();
    let mut config = base_config(logs.path(), &upstream.uri(), "K1");
    config.detach_logging = true;
    let base = spawn_relay(config).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&chat_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let store = logs.path().join("logs.json");
    for _ in 0..50 {
        if store.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(read_store(logs.path(), "logs.json")[0]["responseText"], "later model STOP");
}

// ============================================================================
// Geolocation and forwarding
// ============================================================================

#[tokio::test]
async fn test_entry_carries_geo_and_is_forwarded() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Hi")))
        .mount(&upstream)
        .await;

    let geo = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/203.0.113.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "country": "Indonesia",
            "city": "Jakarta",
            "isp": "ExampleNet"
        })))
        .expect(1)
        .mount(&geo)
        .await;

    let collector = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collect"))
        .and(header("x-log-forward-key", "shared"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&collector)
        .await;

    let logs = TempDir::new().unwrap();
    let mut config = base_config(logs.path(), &upstream.uri(), "K1");
    config.geo_ip_url = format!("{}/json", geo.uri());
    config.log_forward_url = Some(format!("{}/collect", collector.uri()));
    config.log_forward_key = Some("shared".to_string());
    let base = spawn_relay(config).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .header("user-agent", "relay-test")
        .json(&chat_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let entry = &read_store(logs.path(), "logs.json")[0];
    assert_eq!(entry["ip"], "203.0.113.7");
    assert_eq!(entry["geo"]["country"], "Indonesia");
    assert_eq!(entry["provider"], "ExampleNet");
    assert_eq!(entry["network"]["userAgent"], "relay-test");

    let forwarded = collector.received_requests().await.unwrap();
    let forwarded: Value = serde_json::from_slice(&forwarded[0].body).unwrap();
    assert_eq!(forwarded["id"], entry["id"]);
}

#[tokio::test]
async fn test_non_ip_forwarded_for_never_reaches_geo_service() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Hi")))
        .mount(&upstream)
        .await;

    let geo = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success", "country": "X"})))
        .mount(&geo)
        .await;

    let logs = TempDir::new().unwrap();
    let mut config = base_config(logs.path(), &upstream.uri(), "K1");
    config.geo_ip_url = format!("{}/json", geo.uri());
    let base = spawn_relay(config).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .header("x-forwarded-for", "../admin/delete?target=all#")
        .json(&chat_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Only the socket peer may be looked up, and only under the base path.
    for request in geo.received_requests().await.unwrap() {
        assert_eq!(request.url.path(), "/json/127.0.0.1");
    }

    let entry = &read_store(logs.path(), "logs.json")[0];
    assert_eq!(entry["ip"], "127.0.0.1");
}

#[tokio::test]
async fn test_failed_geo_lookup_still_logs() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Hi")))
        .mount(&upstream)
        .await;

    let geo = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&geo)
        .await;

    let logs = TempDir::new().unwrap();
    let mut config = base_config(logs.path(), &upstream.uri(), "K1");
    config.geo_ip_url = geo.uri();
    let base = spawn_relay(config).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&chat_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let entry = &read_store(logs.path(), "logs.json")[0];
    assert!(entry["geo"].is_null());
    assert!(entry["provider"].is_null());
}

// ============================================================================
// /api/logs, /api/debug, /api/receive
// ============================================================================

#[tokio::test]
async fn test_logs_require_view_key() {
    let upstream = MockServer::start().await;
    let logs = TempDir::new().unwrap();
    write_store(logs.path(), "logs.json", &json!([{"id": "a"}]));

    let mut config = base_config(logs.path(), &upstream.uri(), "K1");
    config.log_view_key = Some("view".to_string());
    let base = spawn_relay(config).await;
    let client = reqwest::Client::new();

    let denied = client.get(format!("{}/api/logs", base)).send().await.unwrap();
    assert_eq!(denied.status(), 401);

    let wrong = client
        .get(format!("{}/api/logs?key=nope", base))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);

    let by_query = client
        .get(format!("{}/api/logs?key=view", base))
        .send()
        .await
        .unwrap();
    assert_eq!(by_query.status(), 200);
    assert_eq!(
        by_query.headers().get("cache-control").unwrap().to_str().unwrap(),
        "no-store"
    );

    let by_header = client
        .get(format!("{}/api/logs", base))
        .header("x-log-key", "view")
        .send()
        .await
        .unwrap();
    assert_eq!(by_header.status(), 200);
    let entries: Value = by_header.json().await.unwrap();
    assert_eq!(entries, json!([{"id": "a"}]));
}

#[tokio::test]
async fn test_empty_query_key_falls_back_to_header() {
    let upstream = MockServer::start().await;
    let logs = TempDir::new().unwrap();
    write_store(logs.path(), "logs.json", &json!([{"id": "a"}]));

    let mut config = base_config(logs.path(), &upstream.uri(), "K1");
    config.log_view_key = Some("view".to_string());
    let base = spawn_relay(config).await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/logs?key=", base))
        .header("x-log-key", "view")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), json!([{"id": "a"}]));
}

#[tokio::test]
async fn test_repeated_query_parameters_are_tolerated() {
    let upstream = MockServer::start().await;
    let logs = TempDir::new().unwrap();
    write_store(logs.path(), "logs.json", &json!([{"id": "b"}, {"id": "a"}]));
    let base = spawn_relay(base_config(logs.path(), &upstream.uri(), "K1")).await;

    let response = reqwest::get(format!("{}/api/logs?limit=1&limit=2", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), json!([{"id": "b"}]));

    let debug = reqwest::get(format!("{}/api/debug?full=1&full=0", base)).await.unwrap();
    assert_eq!(debug.status(), 200);
    let report: Value = debug.json().await.unwrap();
    assert_eq!(report["legacy"]["all"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_logs_filter_and_limit() {
    let upstream = MockServer::start().await;
    let logs = TempDir::new().unwrap();
    write_store(
        logs.path(),
        "logs.json",
        &json!([
            {"id": "e3", "ip": "198.51.100.1", "geo": {"country": "France", "city": "Paris"}, "request": {"contents": "bonjour"}},
            {"id": "e2", "ip": "203.0.113.7", "geo": null, "request": {"contents": [{"parts": [{"text": "Weather in PARIS"}]}]}},
            {"id": "e1", "ip": "192.0.2.9", "geo": {"country": "Japan", "city": "Tokyo"}, "request": {"contents": "hi"}}
        ]),
    );
    let base = spawn_relay(base_config(logs.path(), &upstream.uri(), "K1")).await;

    let paris: Value = reqwest::get(format!("{}/api/logs?q=Paris", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<&str> = paris.as_array().unwrap().iter().map(|e| e["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["e3", "e2"]);

    let limited: Value = reqwest::get(format!("{}/api/logs?limit=1", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(limited.as_array().unwrap().len(), 1);
    assert_eq!(limited[0]["id"], "e3");
}

#[tokio::test]
async fn test_logs_tolerate_missing_and_malformed_stores() {
    let upstream = MockServer::start().await;
    let logs = TempDir::new().unwrap();
    let base = spawn_relay(base_config(logs.path(), &upstream.uri(), "K1")).await;

    let empty: Value = reqwest::get(format!("{}/api/logs", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(empty, json!([]));

    std::fs::write(logs.path().join("logs.json"), "[{broken").unwrap();
    let response = reqwest::get(format!("{}/api/logs", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), json!([]));
}

#[tokio::test]
async fn test_debug_reports_stores() {
    let upstream = MockServer::start().await;
    let logs = TempDir::new().unwrap();
    write_store(logs.path(), "logs.json", &json!([{"id": "newest"}, {"id": "older"}]));

    let mut config = base_config(logs.path(), &upstream.uri(), "K1");
    config.log_receiver_name = Some("edge-1".to_string());
    let base = spawn_relay(config).await;

    let report: Value = reqwest::get(format!("{}/api/debug", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["legacy"]["count"], 2);
    assert_eq!(report["legacy"]["last"]["id"], "newest");
    assert!(report["legacy"]["stat"]["size"].as_u64().unwrap() > 0);
    assert!(report["legacy"].get("all").is_none());
    assert!(report["received"]["stat"].is_null());
    assert!(report["received"]["count"].is_null());
    assert_eq!(report["env"]["hasLogForwardUrl"], false);
    assert_eq!(report["env"]["logReceiverName"], "edge-1");

    let full: Value = reqwest::get(format!("{}/api/debug?full=1", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(full["legacy"]["all"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_receive_stores_forwarded_entries() {
    let upstream = MockServer::start().await;
    let logs = TempDir::new().unwrap();
    write_store(logs.path(), "logs.json", &json!([{"id": "local"}]));

    let mut config = base_config(logs.path(), &upstream.uri(), "K1");
    config.log_forward_key = Some("shared".to_string());
    let base = spawn_relay(config).await;
    let client = reqwest::Client::new();

    let denied = client
        .post(format!("{}/api/receive", base))
        .header("x-log-forward-key", "wrong")
        .json(&json!({"id": "remote"}))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 401);

    let not_object = client
        .post(format!("{}/api/receive", base))
        .header("x-log-forward-key", "shared")
        .json(&json!([1, 2]))
        .send()
        .await
        .unwrap();
    assert_eq!(not_object.status(), 400);

    let accepted = client
        .post(format!("{}/api/receive", base))
        .header("x-log-forward-key", "shared")
        .json(&json!({"id": "remote"}))
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), 200);
    let ack: Value = accepted.json().await.unwrap();
    assert_eq!(ack, json!({"ok": true, "id": "remote"}));

    assert_eq!(read_store(logs.path(), "received.json"), vec![json!({"id": "remote"})]);

    // Once received entries exist the viewer shows them instead of local ones.
    let viewed: Value = client
        .get(format!("{}/api/logs", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(viewed, json!([{"id": "remote"}]));
}
