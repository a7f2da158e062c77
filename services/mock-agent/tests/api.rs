//! Integration tests for the control API.
//!
//! The router is driven in-process; state lives in a temp directory and
//! host metadata comes from a static source.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use mockcn_agent::{
    api::create_router,
    context::AppState,
    defaults::DefaultsEngine,
    inventory::{InventoryValidator, ValidationMode},
    metadata::{StaticMetadata, DATACENTER_NAME_KEY, MOCK_OUI_KEY},
    profiles::CannedProfiles,
    state::StateStore,
};
use mockcn_networking::MacAddress;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const SERVER: &str = "564d6fa9-b1e2-4cd4-a9d2-3f3c6e1b0a4d";
const OTHER: &str = "0b5e6c1e-7d0a-4f4e-8c11-0f1d2b6a9e33";

struct TestApp {
    dir: TempDir,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let router = router_with_state_file(dir.path().join("mockcn.json"));
        Self { dir, router }
    }

    fn state_file(&self) -> std::path::PathBuf {
        self.dir.path().join("mockcn.json")
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, content_type, body)
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, body) = self.send(request).await;
        (status, body)
    }
}

fn router_with_state_file(state_file: std::path::PathBuf) -> Router {
    let metadata = StaticMetadata::new()
        .with_value(DATACENTER_NAME_KEY, "us-test-1")
        .with_value(MOCK_OUI_KEY, "90:b8:d0")
        .with_version("joyent_20150101T000000Z");
    let store = Arc::new(StateStore::new(state_file));
    let defaults = DefaultsEngine::new(
        Arc::new(metadata),
        Arc::clone(&store),
        CannedProfiles::embedded().unwrap(),
    );
    let state = AppState::new(
        store,
        InventoryValidator::new(ValidationMode::Lenient),
        defaults,
    );
    create_router(state)
}

fn request(method: Method, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

fn nic_macs(record: &Value) -> Vec<MacAddress> {
    record["Network Interfaces"]
        .as_object()
        .unwrap()
        .values()
        .map(|nic| nic["MAC Address"].as_str().unwrap().parse().unwrap())
        .collect()
}

#[tokio::test]
async fn test_create_with_hostname() {
    let app = TestApp::new();

    let (status, body) = app
        .post(&format!("/servers/{SERVER}"), json!({"Hostname": "abc"}))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["Hostname"], "abc");
    assert_eq!(body["UUID"], SERVER);
    assert_eq!(body["System Type"], "SunOS");
    assert_eq!(body["SDC Version"], "7.0");
    assert_eq!(body["Datacenter Name"], "us-test-1");
    assert_eq!(body["Live Image"], "20150101T000000Z");
    assert!(body["Boot Time"].is_string());
    // Profile fields.
    assert!(body["Product"].is_string());
    assert!(body["MiB of Memory"].is_number());
}

#[tokio::test]
async fn test_create_with_empty_body() {
    let app = TestApp::new();

    let (status, _, body) = app
        .send(request(Method::POST, &format!("/servers/{SERVER}")))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["UUID"], SERVER);
    // Hostname falls back to the admin NIC's MAC.
    assert_eq!(body["Hostname"], "90-b8-d0-00-00-00");
}

#[tokio::test]
async fn test_create_bad_id_is_not_found() {
    let app = TestApp::new();

    let (status, body) = app.post("/servers/123", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    // Uppercase hex is not canonical.
    let (status, _) = app
        .post(&format!("/servers/{}", SERVER.to_uppercase()), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_uuid_mismatch() {
    let app = TestApp::new();

    let (status, body) = app
        .post(&format!("/servers/{SERVER}"), json!({"UUID": OTHER}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "identifier_mismatch");

    // Mismatch wins even when other fields are also invalid.
    let (status, body) = app
        .post(
            &format!("/servers/{SERVER}"),
            json!({"UUID": OTHER, "Hostname": "-bad-"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "identifier_mismatch");
}

#[tokio::test]
async fn test_create_invalid_field() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            &format!("/servers/{SERVER}"),
            json!({"Hostname": "abc", "System Type": "Linux", "MiB of Memory": "lots"}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_field");
    let fields: HashSet<_> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, HashSet::from(["System Type", "MiB of Memory"]));
}

#[tokio::test]
async fn test_unknown_fields_dropped() {
    let app = TestApp::new();

    let (status, body) = app
        .post(&format!("/servers/{SERVER}"), json!({"Favorite Color": "blue"}))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body.get("Favorite Color").is_none());
}

#[tokio::test]
async fn test_create_rejects_non_object_body() {
    let app = TestApp::new();

    let (status, body) = app.post(&format!("/servers/{SERVER}"), json!([1, 2])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "malformed_request");

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/servers/{SERVER}"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_content_type_must_be_json() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/servers/{SERVER}"))
        .header(CONTENT_TYPE, "text/plain")
        .body(Body::from("{}"))
        .unwrap();
    let (status, content_type, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/problem+json"));
    assert_eq!(body["code"], "malformed_request");

    // Checked for every method.
    let request = Request::builder()
        .method(Method::GET)
        .uri("/servers")
        .header(CONTENT_TYPE, "text/plain")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Parameters are ignored.
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/servers/{SERVER}"))
        .header(CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_macs_unique_and_index_stable() {
    let app = TestApp::new();
    let nics = json!({
        "Network Interfaces": {"e0": {}, "e1": {}, "e2": {}}
    });

    let (_, first) = app.post(&format!("/servers/{SERVER}"), nics.clone()).await;
    let (_, other) = app.post(&format!("/servers/{OTHER}"), nics.clone()).await;
    let (_, again) = app.post(&format!("/servers/{SERVER}"), nics).await;

    let first = nic_macs(&first);
    assert_eq!(first.len(), 3);
    assert_eq!(first.iter().collect::<HashSet<_>>().len(), 3);
    assert!(first.iter().all(|mac| mac.node_index() == 0));

    assert!(nic_macs(&other).iter().all(|mac| mac.node_index() == 1));
    assert_eq!(nic_macs(&again), first);

    let state: Value =
        serde_json::from_slice(&std::fs::read(app.state_file()).unwrap()).unwrap();
    assert_eq!(state, json!({"cn_indexes": {SERVER: 0, OTHER: 1}}));
}

#[tokio::test]
async fn test_create_extends_existing_state() {
    let app = TestApp::new();
    std::fs::write(app.state_file(), r#"{"cn_indexes":{"a":0,"b":1}}"#).unwrap();

    let (status, body) = app.post(&format!("/servers/{SERVER}"), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(nic_macs(&body).iter().all(|mac| mac.node_index() >= 2));

    let state: Value =
        serde_json::from_slice(&std::fs::read(app.state_file()).unwrap()).unwrap();
    let indexes = state["cn_indexes"].as_object().unwrap();
    assert_eq!(indexes.len(), 3);
    assert_eq!(indexes["a"], 0);
    assert_eq!(indexes["b"], 1);
}

#[tokio::test]
async fn test_corrupt_state_is_server_error() {
    let app = TestApp::new();
    std::fs::write(app.state_file(), "{not json").unwrap();

    let (status, body) = app.post(&format!("/servers/{SERVER}"), json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "state_unavailable");

    let (status, _, _) = app
        .send(request(Method::DELETE, &format!("/servers/{SERVER}")))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_delete() {
    let app = TestApp::new();

    let (status, content_type, body) = app
        .send(request(Method::DELETE, &format!("/servers/{SERVER}")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body, Value::Null);

    let (status, _, _) = app.send(request(Method::DELETE, "/servers/123")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reads() {
    let app = TestApp::new();

    let (status, _, body) = app.send(request(Method::GET, "/servers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _, body) = app
        .send(request(Method::GET, &format!("/servers/{SERVER}")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"uuid": SERVER}));

    let (status, _, _) = app.send(request(Method::GET, "/servers/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unrouted_is_not_found() {
    let app = TestApp::new();
    let server = format!("/servers/{SERVER}");
    let nested = format!("/servers/{SERVER}/extra");

    for (method, path) in [
        (Method::GET, "/"),
        (Method::GET, "/other"),
        (Method::POST, "/servers"),
        (Method::DELETE, "/servers"),
        (Method::PUT, server.as_str()),
        (Method::GET, nested.as_str()),
        (Method::GET, "/servers/%FF"),
        (Method::POST, "/servers/%FF"),
        (Method::DELETE, "/servers/%FF"),
    ] {
        let (status, _, body) = app.send(request(method.clone(), path)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {path}");
        assert_eq!(body["code"], "not_found", "{method} {path}");
    }
}

#[tokio::test]
async fn test_head_is_not_found() {
    let app = TestApp::new();
    let server = format!("/servers/{SERVER}");

    for path in ["/servers", server.as_str()] {
        // HEAD responses carry no body, so only the status is checked.
        let (status, _, _) = app.send(request(Method::HEAD, path)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "HEAD {path}");
    }
}

#[tokio::test]
async fn test_created_record_is_accepted_again() {
    let app = TestApp::new();
    let path = format!("/servers/{SERVER}");

    let (status, created) = app.post(&path, json!({})).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, again) = app.post(&path, created.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{again}");
    assert_eq!(again["CPU Type"], created["CPU Type"]);
    assert_eq!(again["Network Interfaces"], created["Network Interfaces"]);
}
