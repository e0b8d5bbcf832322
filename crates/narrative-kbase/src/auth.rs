// crates/narrative-kbase/src/auth.rs
// ============================================================================
// Module: KBase Auth Client
// Description: Token validation against the KBase auth service.
// Purpose: Resolve a token to its owning user and lifetime metadata.
// Dependencies: reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! The auth service is a plain REST endpoint, not JSON-RPC. A token is
//! validated with `GET {auth}/api/V2/token`, sending the raw token as the
//! `Authorization` header. Failures come back as `{"error": {...}}` with the
//! HTTP status mirrored in `httpcode`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
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

/// Route used to introspect a token.
pub const TOKEN_ROUTE: &str = "api/V2/token";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Token metadata returned by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenInfo {
    /// Token type (`Login`, `Agent`, `Dev`, ...).
    #[serde(rename = "type")]
    pub token_type: String,
    /// Token identifier.
    pub id: String,
    /// Expiry time (milliseconds since epoch).
    pub expires: i64,
    /// Creation time (milliseconds since epoch).
    pub created: i64,
    /// Optional token name.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning user name.
    pub user: String,
    /// Custom token metadata.
    #[serde(default)]
    pub custom: Map<String, Value>,
    /// Suggested cache lifetime in milliseconds.
    pub cachefor: i64,
}

/// Auth service error envelope.
#[derive(Debug, Deserialize)]
struct AuthErrorEnvelope {
    /// Error payload.
    error: AuthErrorPayload,
}

/// Auth service error payload.
#[derive(Debug, Deserialize)]
struct AuthErrorPayload {
    /// HTTP status mirrored by the service.
    #[serde(default)]
    httpcode: Option<u16>,
    /// Application error code.
    #[serde(default)]
    appcode: Option<i64>,
    /// Application error label.
    #[serde(default)]
    apperror: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    message: Option<String>,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Client for the KBase auth service.
pub struct AuthClient {
    /// Auth service root URL.
    endpoint: String,
    /// Shared HTTP settings.
    settings: HttpSettings,
    /// Blocking HTTP client.
    client: Client,
    /// Audit sink for call events.
    audit: Arc<dyn ServiceAuditSink>,
}

impl AuthClient {
    /// Creates an auth client rooted at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the endpoint is empty or the HTTP client
    /// cannot be built.
    pub fn new(endpoint: impl Into<String>, settings: HttpSettings) -> Result<Self, ServiceError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(ServiceError::Config("auth endpoint is required".to_string()));
        }
        let client = build_http_client(&settings)?;
        Ok(Self {
            endpoint,
            settings,
            client,
            audit: Arc::new(NoopAuditSink),
        })
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn ServiceAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the URL used for token introspection.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/{TOKEN_ROUTE}", self.endpoint.trim_end_matches('/'))
    }

    /// Validates the configured token.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] when no token is configured, otherwise
    /// as [`AuthClient::token_info`].
    pub fn current_token_info(&self) -> Result<TokenInfo, ServiceError> {
        let token = self
            .settings
            .token
            .as_deref()
            .ok_or_else(|| ServiceError::Config("no auth token configured".to_string()))?;
        self.token_info(token)
    }

    /// Validates `token` and returns its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Auth`] when the service rejects the token and
    /// other [`ServiceError`] variants for transport or decoding failures.
    pub fn token_info(&self, token: &str) -> Result<TokenInfo, ServiceError> {
        let started = Instant::now();
        let mut status = None;
        let mut response_bytes = 0;
        let result = self.fetch_token_info(token, &mut status, &mut response_bytes);
        self.audit.record(&ServiceCallEvent::new(ServiceCallEventParams {
            service: "auth",
            method: TOKEN_ROUTE,
            request_id: None,
            http_status: status,
            error: result.as_ref().err(),
            request_bytes: 0,
            response_bytes,
            latency: started.elapsed(),
        }));
        result
    }

    /// Returns the user name owning `token`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] as [`AuthClient::token_info`].
    pub fn user_name(&self, token: &str) -> Result<String, ServiceError> {
        Ok(self.token_info(token)?.user)
    }

    /// Issues the token introspection request.
    fn fetch_token_info(
        &self,
        token: &str,
        status_out: &mut Option<u16>,
        bytes_out: &mut usize,
    ) -> Result<TokenInfo, ServiceError> {
        let mut header = HeaderValue::from_str(token.trim())
            .map_err(|_| ServiceError::Config("invalid auth token header".to_string()))?;
        header.set_sensitive(true);
        let mut response = self
            .client
            .get(self.token_url())
            .header(AUTHORIZATION, header)
            .send()
            .map_err(|err| ServiceError::Transport(err.to_string()))?;
        let status = response.status();
        *status_out = Some(status.as_u16());
        let body = read_response_limited(&mut response, self.settings.max_response_bytes)?;
        *bytes_out = body.len();
        if !status.is_success() {
            return Err(match serde_json::from_slice::<AuthErrorEnvelope>(&body) {
                Ok(envelope) => ServiceError::Auth {
                    status: envelope.error.httpcode.unwrap_or_else(|| status.as_u16()),
                    app_code: envelope.error.appcode.unwrap_or(0),
                    app_error: envelope.error.apperror.unwrap_or_default(),
                    message: envelope.error.message.unwrap_or_default(),
                },
                Err(_) => ServiceError::Http {
                    status: status.as_u16(),
                    body: body_preview(&body),
                },
            });
        }
        serde_json::from_slice(&body)
            .map_err(|err| ServiceError::Json(format!("invalid token info payload: {err}")))
    }
}
