mod common;

use common::{read_envelope, TestApp};

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn(&[]).await;

    let response = app.get("/health").await;
    let (status, body) = read_envelope(response).await;

    assert_eq!(status, 200);
    assert_eq!(body["code"], 1);
    assert_eq!(body["message"], "OK");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn health_check_needs_no_token() {
    let app = TestApp::spawn(&[]).await;

    let response = app.get("/health").await;

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn unknown_route_returns_envelope_404() {
    let app = TestApp::spawn(&[]).await;

    let response = app.get("/sas/unknown/693595").await;
    let (status, body) = read_envelope(response).await;

    assert_eq!(status, 404);
    assert_eq!(body["code"], 0);
    assert_eq!(body["message"], "Not Found");
    assert!(body["data"].is_null());
    assert!(body.as_object().unwrap().contains_key("data"));
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::spawn(&[]).await;

    let response = app.get("/health").await;

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn incoming_request_id_is_echoed() {
    let app = TestApp::spawn(&[]).await;

    let response = app
        .get_with_headers("/health", &[("x-request-id", "it-health-1")])
        .await;

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "it-health-1"
    );
}
