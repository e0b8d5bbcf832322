// crates/narrative-kbase/src/service.rs
// ============================================================================
// Module: JSON-RPC 1.1 Service Client
// Description: Generic client for KBase JSON-RPC 1.1 services.
// Purpose: Frame `Service.method` calls and map server errors faithfully.
// Dependencies: reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! KBase services speak a JSON-RPC 1.1 dialect over HTTP POST. A request body
//! carries exactly four keys (`id`, `version`, `method`, `params`), where
//! `method` is `Service.method_name` and `params` is an ordered list. A
//! success response wraps its single result object in a list under `result`;
//! a failure returns HTTP 500 with an `error` object instead.
//!
//! Security posture: server responses are untrusted; bodies are size limited
//! and tokens never appear in errors or audit events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Instant;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::audit::NoopAuditSink;
use crate::audit::ServiceAuditSink;
use crate::audit::ServiceCallEvent;
use crate::audit::ServiceCallEventParams;
use crate::error::ServiceError;
use crate::http::HttpSettings;
use crate::http::body_preview;
use crate::http::build_http_client;
use crate::http::read_response_limited;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON-RPC version tag used by KBase services.
pub const JSONRPC_VERSION: &str = "1.1";

// ============================================================================
// SECTION: JSON-RPC Structures
// ============================================================================

/// JSON-RPC 1.1 request envelope.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    /// Request identifier.
    id: String,
    /// JSON-RPC version tag.
    version: &'static str,
    /// Fully qualified `Service.method` name.
    method: String,
    /// Positional parameters.
    params: &'a [Value],
}

/// JSON-RPC 1.1 response envelope.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    /// Result list, present on success.
    #[serde(default)]
    result: Option<Value>,
    /// Error payload, present on failure.
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error payload as reported by KBase services.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    /// Error name (usually `JSONRPCError`).
    #[serde(default)]
    name: Option<String>,
    /// Numeric error code.
    #[serde(default)]
    code: Option<i64>,
    /// Error message.
    #[serde(default)]
    message: Option<String>,
    /// Additional data, typically a traceback.
    #[serde(default)]
    error: Option<Value>,
}

impl From<JsonRpcError> for ServiceError {
    fn from(error: JsonRpcError) -> Self {
        let data = match error.error {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text),
            Some(other) => Some(other.to_string()),
        };
        Self::Server {
            name: error.name.unwrap_or_else(|| "JSONRPCError".to_string()),
            code: error.code.unwrap_or(0),
            message: error.message.unwrap_or_default(),
            data,
        }
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Client for one KBase JSON-RPC 1.1 service.
///
/// # Invariants
/// - Every request body has exactly the keys `id`, `version`, `method`, `params`.
/// - Request identifiers are unique per client instance.
pub struct ServiceClient {
    /// Service name used as the method prefix.
    service: String,
    /// Service endpoint URL.
    endpoint: String,
    /// Shared HTTP settings.
    settings: HttpSettings,
    /// Blocking HTTP client.
    client: Client,
    /// Next JSON-RPC request identifier.
    next_id: AtomicU64,
    /// Audit sink for call events.
    audit: Arc<dyn ServiceAuditSink>,
}

impl ServiceClient {
    /// Creates a client for `service` served at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] when the service name or endpoint is
    /// invalid, or [`ServiceError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn new(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        settings: HttpSettings,
    ) -> Result<Self, ServiceError> {
        let service = service.into();
        let endpoint = endpoint.into();
        if service.trim().is_empty() || service.contains('.') {
            return Err(ServiceError::Config(format!("invalid service name: '{service}'")));
        }
        if endpoint.trim().is_empty() {
            return Err(ServiceError::Config("service endpoint is required".to_string()));
        }
        let client = build_http_client(&settings)?;
        Ok(Self {
            service,
            endpoint,
            settings,
            client,
            next_id: AtomicU64::new(1),
            audit: Arc::new(NoopAuditSink),
        })
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn ServiceAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the service endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Calls `Service.method` and returns the first element of `result`.
    ///
    /// Returns `Ok(None)` when the service answers with an empty or null
    /// result list.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Server`] for errors reported by the service and
    /// other [`ServiceError`] variants for transport or protocol failures.
    pub fn simple_call(
        &self,
        method: &str,
        params: &[Value],
    ) -> Result<Option<Value>, ServiceError> {
        if method.trim().is_empty() || method.contains('.') {
            return Err(ServiceError::Config(format!("invalid method name: '{method}'")));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let request = JsonRpcRequest {
            id: id.clone(),
            version: JSONRPC_VERSION,
            method: format!("{}.{method}", self.service),
            params,
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|err| ServiceError::Json(format!("jsonrpc serialization failed: {err}")))?;
        let request_bytes = payload.len();
        let started = Instant::now();
        let mut status = None;
        let mut response_bytes = 0;
        let result = self.send(payload, &mut status, &mut response_bytes);
        self.audit.record(&ServiceCallEvent::new(ServiceCallEventParams {
            service: &self.service,
            method,
            request_id: Some(&id),
            http_status: status,
            error: result.as_ref().err(),
            request_bytes,
            response_bytes,
            latency: started.elapsed(),
        }));
        result
    }

    /// Calls `Service.method` and decodes the first result element.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the call fails, the result is missing, or
    /// it does not decode into `T`.
    pub fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[Value],
    ) -> Result<T, ServiceError> {
        let value = self.simple_call(method, params)?.ok_or_else(|| {
            ServiceError::Protocol(format!("{}.{method} returned no result", self.service))
        })?;
        serde_json::from_value(value).map_err(|err| {
            ServiceError::Json(format!("invalid {}.{method} result: {err}", self.service))
        })
    }

    /// Posts the framed request and interprets the response.
    fn send(
        &self,
        payload: Vec<u8>,
        status_out: &mut Option<u16>,
        bytes_out: &mut usize,
    ) -> Result<Option<Value>, ServiceError> {
        let mut response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers()?)
            .body(payload)
            .send()
            .map_err(|err| ServiceError::Transport(err.to_string()))?;
        let status = response.status();
        *status_out = Some(status.as_u16());
        let body = read_response_limited(&mut response, self.settings.max_response_bytes)?;
        *bytes_out = body.len();
        parse_jsonrpc_response(status, &body)
    }

    /// Builds request headers.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] when the token is not a valid header value.
    fn headers(&self) -> Result<HeaderMap, ServiceError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.settings.token {
            let mut header = HeaderValue::from_str(token)
                .map_err(|_| ServiceError::Config("invalid auth token header".to_string()))?;
            header.set_sensitive(true);
            headers.insert(AUTHORIZATION, header);
        }
        Ok(headers)
    }
}

// ============================================================================
// SECTION: Response Handling
// ============================================================================

/// Interprets a JSON-RPC 1.1 HTTP response.
///
/// # Errors
///
/// Returns [`ServiceError`] following the KBase error conventions.
fn parse_jsonrpc_response(status: StatusCode, body: &[u8]) -> Result<Option<Value>, ServiceError> {
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        return Err(match serde_json::from_slice::<JsonRpcResponse>(body) {
            Ok(JsonRpcResponse {
                error: Some(error),
                ..
            }) => error.into(),
            _ => ServiceError::unknown_server(body_preview(body)),
        });
    }
    if !status.is_success() {
        return Err(ServiceError::Http {
            status: status.as_u16(),
            body: body_preview(body),
        });
    }
    let response: JsonRpcResponse = serde_json::from_slice(body)
        .map_err(|err| ServiceError::Protocol(format!("invalid json-rpc response: {err}")))?;
    if let Some(error) = response.error {
        return Err(error.into());
    }
    match response.result {
        None => Err(ServiceError::unknown_server("An unknown server error occurred")),
        Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(items.into_iter().next()),
        Some(_) => Err(ServiceError::Protocol("json-rpc result must be a list".to_string())),
    }
}
