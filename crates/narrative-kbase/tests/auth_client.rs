//! Auth service client tests for narrative-kbase.
// crates/narrative-kbase/tests/auth_client.rs
// =============================================================================
// Module: Auth Client Tests
// Description: Token introspection against a loopback auth service.
// Purpose: Ensure token payloads and auth error envelopes map correctly.
// =============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

mod common;

use common::MockResponse;
use common::MockServer;
use common::auth_bad_token_payload;
use common::auth_server;
use common::auth_success_payload;
use narrative_kbase::AuthClient;
use narrative_kbase::HttpSettings;
use narrative_kbase::ServiceError;

#[test]
fn token_info_decodes_success_payload() {
    let server = auth_server("some_token", auth_success_payload(), 200);
    let client = AuthClient::new(server.url(), HttpSettings::default()).expect("client");
    let info = client.token_info("some_token").expect("token info");
    assert_eq!(info.user, "j_random_user");
    assert_eq!(info.token_type, "Login");
    assert_eq!(info.name.as_deref(), Some("llm agency"));
    assert_eq!(info.cachefor, 300_000);
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "/api/V2/token");
}

#[test]
fn user_name_returns_owner() {
    let server = auth_server("some_token", auth_success_payload(), 200);
    let client = AuthClient::new(server.url(), HttpSettings::default()).expect("client");
    assert_eq!(client.user_name("some_token").expect("user"), "j_random_user");
}

#[test]
fn current_token_uses_configured_token() {
    let server = auth_server("configured", auth_success_payload(), 200);
    let settings = HttpSettings {
        token: Some("configured".to_string()),
        ..HttpSettings::default()
    };
    let client = AuthClient::new(server.url(), settings).expect("client");
    assert_eq!(client.current_token_info().expect("token info").user, "j_random_user");
}

#[test]
fn current_token_without_token_is_config_error() {
    let client = AuthClient::new("http://127.0.0.1:1", HttpSettings::default()).expect("client");
    let err = client.current_token_info().expect_err("no token");
    assert!(matches!(err, ServiceError::Config(_)));
}

#[test]
fn bad_token_maps_auth_error_envelope() {
    let server = auth_server("bad_token", auth_bad_token_payload(), 401);
    let client = AuthClient::new(server.url(), HttpSettings::default()).expect("client");
    let err = client.token_info("bad_token").expect_err("bad token");
    match err {
        ServiceError::Auth {
            status,
            app_code,
            app_error,
            message,
        } => {
            assert_eq!(status, 401);
            assert_eq!(app_code, 10020);
            assert_eq!(app_error, "Invalid token");
            assert_eq!(message, "10020 Invalid token");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn non_envelope_failure_is_http_error() {
    let server = MockServer::start(|_| MockResponse::text(503, "maintenance"));
    let client = AuthClient::new(server.url(), HttpSettings::default()).expect("client");
    let err = client.token_info("any").expect_err("unavailable");
    assert!(matches!(err, ServiceError::Http { status: 503, ref body } if body == "maintenance"));
}

#[test]
fn malformed_success_payload_is_json_error() {
    let server = MockServer::start(|_| MockResponse::text(200, "{\"user\": 5}"));
    let client = AuthClient::new(server.url(), HttpSettings::default()).expect("client");
    let err = client.token_info("any").expect_err("bad payload");
    assert!(matches!(err, ServiceError::Json(_)));
}

#[test]
fn token_url_joins_route_once() {
    let client =
        AuthClient::new("https://kbase.us/services/auth/", HttpSettings::default()).expect("client");
    assert_eq!(client.token_url(), "https://kbase.us/services/auth/api/V2/token");
}
