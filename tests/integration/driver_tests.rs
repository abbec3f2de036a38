//! WebDriver readiness probe against a mock driver

use sumi_atlas::browser::{probe_driver, BrowserError, Engine};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn driver_answering(response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_ready_driver() {
    let server = driver_answering(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "value": { "ready": true, "message": "ChromeDriver ready for new sessions." }
    })))
    .await;

    assert!(probe_driver(Engine::Chromium, &server.uri()).await.is_ok());
}

#[tokio::test]
async fn test_driver_without_readiness_flag_is_assumed_ready() {
    let server = driver_answering(
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "value": {} })),
    )
    .await;

    assert!(probe_driver(Engine::Webkit, &format!("{}/", server.uri())).await.is_ok());
}

#[tokio::test]
async fn test_busy_driver() {
    let server = driver_answering(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "value": { "ready": false, "message": "Session already started" }
    })))
    .await;

    let result = probe_driver(Engine::Firefox, &server.uri()).await;
    assert!(matches!(result, Err(BrowserError::DriverUnavailable { .. })));
}

#[tokio::test]
async fn test_driver_error_status() {
    let server = driver_answering(ResponseTemplate::new(500)).await;

    match probe_driver(Engine::Chromium, &server.uri()).await {
        Err(BrowserError::DriverUnavailable { engine, reason, .. }) => {
            assert_eq!(engine, "chromium");
            assert!(reason.contains("500"));
        }
        other => panic!("expected DriverUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_driver() {
    let server = MockServer::start().await;
    let endpoint = server.uri();
    drop(server);

    let result = probe_driver(Engine::Chromium, &endpoint).await;
    assert!(matches!(result, Err(BrowserError::DriverUnavailable { .. })));
}
