//! Integration tests using WireMock
//!
//! These tests run the controllers and the provider against a mock SendGrid
//! API, covering the full request/response cycle: paths, bodies, bearer
//! authentication, error decoding and the lifecycle rules every resource
//! follows.

mod resources;

use integrations_sendgrid::SendGridClient;
use serde_json::{json, Value};
use wiremock::matchers::{any, header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

/// API key every test client authenticates with.
pub const TEST_KEY: &str = "test-key";

/// Helper to start a mock server.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Helper to create a client pointing at the mock server.
pub fn test_client(server: &MockServer) -> SendGridClient {
    SendGridClient::with_api_key(TEST_KEY, server.uri()).expect("Failed to build client")
}

/// Helper to match an authenticated request.
pub fn mock_with_auth(method_matcher: &str, path_matcher: &str) -> MockBuilder {
    Mock::given(method(method_matcher))
        .and(path(path_matcher))
        .and(header("authorization", format!("Bearer {}", TEST_KEY).as_str()))
}

/// Helper to create a SendGrid error response.
pub fn error_response(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "errors": [{"message": message}]
    }))
}

/// Helper to create a success response.
pub fn success_response(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Fails the test if the server sees any request at all.
pub async fn expect_no_requests(server: &MockServer) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}
