//! Downstream HTTP client tests against a mock REST server.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use toolbridge::downstream::issues::IssueTool;
use toolbridge::downstream::{HttpClient, HttpClientConfig, RetryPolicy};
use toolbridge::server::ToolHandler;
use toolbridge::BridgeError;
use wiremock::matchers::{basic_auth, bearer_token, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        retry_delay: Duration::from_millis(10),
        ..Default::default()
    }
}

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::new(HttpClientConfig {
        base_url: server.uri(),
        retry: fast_retry(),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_transient_statuses_are_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/issues/X-1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/issues/X-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "X-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server).get("/issues/X-1").await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.data["key"], "X-1");
}

#[tokio::test]
async fn test_non_retryable_status_fails_on_first_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/issues/MISSING"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such issue"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get("/issues/MISSING")
        .await
        .unwrap_err();
    match err {
        BridgeError::RequestError { status, message } => {
            assert_eq!(status, 404);
            assert!(message.contains("no such issue"));
        }
        other => panic!("expected RequestError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_exhausted_retries_surface_the_last_failure() {
    let server = MockServer::start().await;

    // Default policy allows 3 retries, so four attempts in total.
    Mock::given(method("GET"))
        .and(path("/issues/X-2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let err = client_for(&server).get("/issues/X-2").await.unwrap_err();
    assert!(matches!(err, BridgeError::RequestError { status: 500, .. }));
}

#[tokio::test]
async fn test_bearer_token_is_attached() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/issues"))
        .and(bearer_token("secret-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"key": "X-3"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(HttpClientConfig {
        base_url: server.uri(),
        bearer_token: Some("secret-token".into()),
        retry: fast_retry(),
        ..Default::default()
    })
    .unwrap();

    let response = client
        .post("/issues", json!({"summary": "bug"}))
        .await
        .unwrap();
    assert_eq!(response.status, 201);
}

#[tokio::test]
async fn test_basic_auth_is_attached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pages/1"))
        .and(basic_auth("bot", "hunter2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(HttpClientConfig {
        base_url: server.uri(),
        basic_auth: Some(("bot".into(), "hunter2".into())),
        retry: fast_retry(),
        ..Default::default()
    })
    .unwrap();

    assert!(client.get("/pages/1").await.is_ok());
}

#[tokio::test]
async fn test_empty_body_maps_to_null() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/issues/X-4"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let response = client_for(&server).delete("/issues/X-4").await.unwrap();
    assert_eq!(response.status, 204);
    assert!(response.data.is_null());
}

#[tokio::test]
async fn test_issue_tool_invokes_the_tracker() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/issues/PROJ-7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"key": "PROJ-7", "status": "open"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tool = IssueTool::new(Arc::new(client_for(&server)));
    let data = tool
        .invoke("getIssue", json!({"key": "PROJ-7"}))
        .await
        .unwrap();
    assert_eq!(data["status"], "open");
}

#[tokio::test]
async fn test_issue_tool_rejects_unknown_method() {
    let server = MockServer::start().await;
    let tool = IssueTool::new(Arc::new(client_for(&server)));

    let err = tool.invoke("explodeIssue", json!({})).await.unwrap_err();
    assert!(matches!(err, BridgeError::ExecutionError(_)));
}
