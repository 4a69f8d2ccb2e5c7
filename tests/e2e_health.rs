//! E2E tests for the operational endpoints

mod common;

use common::TestServer;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let response = server.get_as(None, "/health").await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let server = TestServer::new().await;
    // Generate at least one request sample
    server.get_as(None, "/health").await;

    let response = server.get_as(None, "/metrics").await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("postwall_http_requests_total"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let server = TestServer::new().await;

    let response = server.get_as(None, "/does/not/exist/here").await;

    assert_eq!(response.status(), 404);
    assert!(response.text().await.unwrap().contains("/does/not/exist/here"));
}
