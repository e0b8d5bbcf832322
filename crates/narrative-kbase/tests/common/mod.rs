// crates/narrative-kbase/tests/common/mod.rs
// ============================================================================
// Module: KBase Test Fixtures
// Description: Loopback HTTP servers simulating KBase auth and JSON-RPC services.
// Purpose: Exercise the real HTTP clients without network access.
// Dependencies: tiny_http, serde_json
// ============================================================================

//! ## Overview
//! [`MockServer`] runs a `tiny_http` server on `127.0.0.1:0`, records every
//! request, and answers through a handler closure. Helpers build KBase-shaped
//! payloads: JSON-RPC 1.1 envelopes, auth token payloads, and the auth error
//! envelope. Requests that do not match the registered shape receive a 404 so
//! the client surfaces a failure, mirroring an unmatched mock.

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test helpers are selectively used across suites and may panic."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;

use narrative_kbase::ServiceAuditSink;
use narrative_kbase::ServiceCallEvent;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Recorded Requests
// ============================================================================

/// A request captured by [`MockServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Request path and query.
    pub url: String,
    /// Request headers as (name, value) pairs.
    pub headers: Vec<(String, String)>,
    /// Raw request body.
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Returns the first header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Parses the body as JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// A canned response returned by a handler.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
    /// Whether to send `Content-Type: application/json`.
    pub json: bool,
}

impl MockResponse {
    /// JSON response with the given status.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            body: serde_json::to_vec(body).expect("serialize mock body"),
            json: true,
        }
    }

    /// Plain-text response with the given status.
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.as_bytes().to_vec(),
            json: false,
        }
    }

    /// Response used when a request matches no registered mock.
    pub fn no_match() -> Self {
        Self::text(404, "no mock matched this request")
    }
}

// ============================================================================
// SECTION: Mock Server
// ============================================================================

/// Loopback HTTP server answering through a handler closure.
pub struct MockServer {
    /// Base URL (`http://127.0.0.1:port`).
    url: String,
    /// Shared server handle.
    server: Arc<Server>,
    /// Requests seen so far.
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    /// Worker thread.
    handle: Option<JoinHandle<()>>,
}

impl MockServer {
    /// Starts a server that answers every request with `handler`.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + 'static,
    {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind mock server"));
        let addr = server.server_addr().to_ip().expect("ip listener");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let worker_server = Arc::clone(&server);
        let worker_requests = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            while let Ok(mut request) = worker_server.recv() {
                let mut body = Vec::new();
                let _ = request.as_reader().read_to_end(&mut body);
                let recorded = RecordedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|header| (header.field.to_string(), header.value.to_string()))
                        .collect(),
                    body,
                };
                let reply = handler(&recorded);
                worker_requests.lock().expect("requests lock").push(recorded);
                let mut response =
                    Response::from_data(reply.body).with_status_code(reply.status);
                if reply.json {
                    response = response.with_header(
                        Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                            .expect("content type header"),
                    );
                }
                let _ = request.respond(response);
            }
        });
        Self {
            url: format!("http://{addr}"),
            server,
            requests,
            handle: Some(handle),
        }
    }

    /// Returns the base URL.
    pub fn url(&self) -> String {
        self.url.clone()
    }

    /// Returns a URL for `path` under the server.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.url, path.trim_start_matches('/'))
    }

    /// Returns a snapshot of recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ============================================================================
// SECTION: JSON-RPC Fixtures
// ============================================================================

/// Builds a KBase JSON-RPC 1.1 response envelope.
///
/// Errors place `result` under `error`; successes wrap it in a one element
/// list under `result`; `no_result` omits both.
pub fn build_jsonrpc_1_response(result: &Value, is_error: bool, no_result: bool) -> Value {
    let mut response = json!({
        "id": "12345",
        "version": "1.1",
    });
    if no_result {
        return response;
    }
    if is_error {
        response["error"] = result.clone();
    } else {
        response["result"] = json!([result]);
    }
    response
}

/// Returns true if `packet` looks like a KBase JSON-RPC 1.1 request.
///
/// It must have exactly the keys `id`, `version`, `method` (strings) and
/// `params` (a list).
pub fn is_jsonrpc_1_packet(packet: &Value) -> bool {
    let Some(object) = packet.as_object() else {
        return false;
    };
    if object.len() != 4 {
        return false;
    }
    if !object.get("params").is_some_and(Value::is_array) {
        return false;
    }
    ["id", "version", "method"].iter().all(|key| object.get(*key).is_some_and(Value::is_string))
}

/// Returns true if `packet` is a JSON-RPC 1.1 call to `service` (and
/// `method`, when given).
pub fn is_service_call(packet: &Value, service: &str, method: Option<&str>) -> bool {
    let Some(full_method) = packet.get("method").and_then(Value::as_str) else {
        return false;
    };
    let parts: Vec<&str> = full_method.split('.').collect();
    if parts.len() != 2 || parts[0] != service {
        return false;
    }
    if let Some(method) = method
        && parts[1] != method
    {
        return false;
    }
    is_jsonrpc_1_packet(packet)
}

/// Starts a JSON-RPC 1.1 endpoint answering every well-formed POST.
///
/// A non-200 `status` sends `result` as the error payload.
pub fn jsonrpc_1_server(result: Value, status: u16, no_result: bool) -> MockServer {
    let response = build_jsonrpc_1_response(&result, status != 200, no_result);
    MockServer::start(move |request| {
        let matches = request.method == "POST"
            && request.json().is_some_and(|packet| is_jsonrpc_1_packet(&packet));
        if matches { MockResponse::json(status, &response) } else { MockResponse::no_match() }
    })
}

/// Starts an endpoint answering calls to `service` (and `method`, when given).
pub fn kbase_service_server(
    service: &'static str,
    method: Option<&'static str>,
    result: Value,
    status: u16,
) -> MockServer {
    let response = build_jsonrpc_1_response(&result, status != 200, false);
    MockServer::start(move |request| {
        let matches = request.method == "POST"
            && request.json().is_some_and(|packet| is_service_call(&packet, service, method));
        if matches { MockResponse::json(status, &response) } else { MockResponse::no_match() }
    })
}

/// Workspace-style server error payload.
pub fn server_error_payload(message: &str) -> Value {
    json!({
        "name": "JSONRPCError",
        "code": -32500,
        "message": message,
        "error": format!("Traceback: {message}"),
    })
}

// ============================================================================
// SECTION: Auth Fixtures
// ============================================================================

/// Successful token introspection payload.
pub fn auth_success_payload() -> Value {
    json!({
        "type": "Login",
        "id": "blah_blah_token_id",
        "expires": 1_714_583_567_055_i64,
        "created": 1_706_807_567_055_i64,
        "name": "llm agency",
        "user": "j_random_user",
        "custom": {},
        "cachefor": 300_000,
    })
}

/// Auth error envelope for an invalid token.
pub fn auth_bad_token_payload() -> Value {
    json!({
        "error": {
            "httpcode": 401,
            "httpstatus": "Unauthorized",
            "appcode": 10020,
            "apperror": "Invalid token",
            "message": "10020 Invalid token",
            "callid": "12345",
            "time": 1_708_720_112_853_i64,
        }
    })
}

/// Starts an auth endpoint that answers `GET` requests carrying `token`.
pub fn auth_server(token: &'static str, payload: Value, status: u16) -> MockServer {
    MockServer::start(move |request| {
        let matches = request.method == "GET" && request.header("Authorization") == Some(token);
        if matches { MockResponse::json(status, &payload) } else { MockResponse::no_match() }
    })
}

// ============================================================================
// SECTION: Audit Capture
// ============================================================================

/// Audit sink that keeps events in memory.
#[derive(Default)]
pub struct CapturingAuditSink {
    /// Captured events.
    events: Mutex<Vec<ServiceCallEvent>>,
}

impl CapturingAuditSink {
    /// Returns a snapshot of captured events.
    pub fn events(&self) -> Vec<ServiceCallEvent> {
        self.events.lock().expect("events lock").clone()
    }
}

impl ServiceAuditSink for CapturingAuditSink {
    fn record(&self, event: &ServiceCallEvent) {
        self.events.lock().expect("events lock").push(event.clone());
    }
}
