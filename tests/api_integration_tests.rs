//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mini_toolkit::{
    api::create_router,
    storage::{ClientContext, StorageKind},
    AppState, Cache, CacheOptions, Config, RateLimiter,
};
use serde_json::{json, Value};
use std::thread::sleep;
use std::time::Duration;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    create_router(AppState::from_config(Config::default(), None))
}

/// App whose engines can reach browser-style storage.
fn create_client_app(config: Config) -> Router {
    let client = ClientContext::in_memory();
    let cache = Cache::with_client(config.cache_defaults(), client.clone());
    let limiter = RateLimiter::with_client(config.rate_limit_defaults(), client);
    create_router(AppState::new(cache, limiter, config))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn put_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json("/cache", json!({"key": "test_key", "value": "test_value"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("test_key"));
}

#[tokio::test]
async fn test_set_endpoint_invalid_ttl() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json("/cache", json!({"key": "k", "value": 1, "ttl": "soon"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("Invalid time format"));
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/cache", json!({"key": "user", "value": {"name": "alice", "age": 23}})))
        .await
        .unwrap();

    let response = app.oneshot(request("GET", "/cache/user")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "user");
    assert_eq!(json["value"], json!({"name": "alice", "age": 23}));
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let response = app.oneshot(request("GET", "/cache/missing")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_max_uses_via_api() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/cache", json!({"key": "otp", "value": "1234", "maxUses": 2})))
        .await
        .unwrap();

    for _ in 0..2 {
        let response = app.clone().oneshot(request("GET", "/cache/otp")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(request("GET", "/cache/otp")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint_success() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/cache", json!({"key": "to_delete", "value": 1})))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request("DELETE", "/cache/to_delete"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(request("GET", "/cache/to_delete")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Listing and Clearing ==

#[tokio::test]
async fn test_list_and_clear_endpoints() {
    let app = create_test_app();

    for key in ["a", "b", "c"] {
        app.clone()
            .oneshot(put_json("/cache", json!({"key": key, "value": key})))
            .await
            .unwrap();
    }

    let response = app.clone().oneshot(request("GET", "/cache")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 3);
    assert_eq!(json["storage"], "memory");
    assert_eq!(json["entries"]["b"]["value"], "b");

    let response = app.clone().oneshot(request("DELETE", "/cache")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(request("GET", "/cache")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn test_storage_query_selects_backend() {
    let app = create_client_app(Config::default());

    app.clone()
        .oneshot(put_json(
            "/cache",
            json!({"key": "theme", "value": "dark", "storage": "localStorage"}),
        ))
        .await
        .unwrap();

    let response = app.clone().oneshot(request("GET", "/cache")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 0);

    let response = app
        .clone()
        .oneshot(request("GET", "/cache?storage=localStorage"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 1);

    let response = app
        .oneshot(request("GET", "/cache/theme?storage=localStorage"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"], "dark");
}

#[tokio::test]
async fn test_unknown_storage_query() {
    let app = create_test_app();

    let response = app
        .oneshot(request("GET", "/cache?storage=floppy"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == Rate Limit Endpoint Tests ==

#[tokio::test]
async fn test_limit_endpoint_blocks() {
    let config = Config {
        rate_limit: 3,
        ..Config::default()
    };
    let app = create_router(AppState::from_config(config, None));

    for expected in [2, 1, 0] {
        let response = app.clone().oneshot(request("POST", "/limit/1.2.3.4")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["remaining"], expected);
    }

    let response = app.clone().oneshot(request("POST", "/limit/1.2.3.4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["limit"], 3);

    let response = app.oneshot(request("POST", "/limit/5.6.7.8")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_limit_endpoint_missing_external_store() {
    let config = Config {
        rate_limit_storage: StorageKind::External,
        ..Config::default()
    };
    let app = create_router(AppState::from_config(config, None));

    let response = app.oneshot(request("POST", "/limit/x")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_limit_endpoint_browser_storage_without_client() {
    let config = Config {
        rate_limit_storage: StorageKind::SessionStorage,
        ..Config::default()
    };
    let app = create_router(AppState::from_config(config, None));

    let response = app.oneshot(request("POST", "/limit/x")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_limit_endpoint_session_storage() {
    let config = Config {
        rate_limit: 1,
        rate_limit_storage: StorageKind::SessionStorage,
        ..Config::default()
    };
    let app = create_client_app(config);

    let response = app.clone().oneshot(request("POST", "/limit/x")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(request("POST", "/limit/x")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app.oneshot(request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Error Response Tests ==

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/cache")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_empty_key_request() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json("/cache", json!({"key": "", "value": 1})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == TTL Expiration via API Tests ==

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let app = create_router(AppState::new(
        Cache::new(CacheOptions::new().ttl("50ms")),
        RateLimiter::default(),
        Config::default(),
    ));

    app.clone()
        .oneshot(put_json("/cache", json!({"key": "short", "value": "lived"})))
        .await
        .unwrap();

    let response = app.clone().oneshot(request("GET", "/cache/short")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    sleep(Duration::from_millis(80));

    let response = app.oneshot(request("GET", "/cache/short")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
