// crates/narrative-kbase/src/http.rs
// ============================================================================
// Module: HTTP Helpers
// Description: Shared blocking HTTP plumbing for KBase service clients.
// Purpose: Build clients with uniform limits and read bounded response bodies.
// Dependencies: reqwest
// ============================================================================

//! ## Overview
//! Every KBase client shares the same HTTP posture: a fixed timeout, a user
//! agent, no redirects, and a hard upper bound on response body size.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Read;
use std::time::Duration;

use narrative_config::ClientConfig;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::redirect::Policy;

use crate::error::ServiceError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of body bytes echoed into error messages.
const MAX_BODY_PREVIEW_BYTES: usize = 512;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// HTTP settings shared by service clients.
///
/// # Invariants
/// - `max_response_bytes` is enforced as a hard upper bound on response bodies.
/// - `timeout` applies to the full request lifecycle.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
    /// Optional KBase auth token sent as the `Authorization` header.
    pub token: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_response_bytes: 16 * 1024 * 1024,
            user_agent: format!("narrative-agent/{}", env!("CARGO_PKG_VERSION")),
            token: None,
        }
    }
}

impl HttpSettings {
    /// Builds settings from the validated client configuration.
    #[must_use]
    pub fn from_config(config: &ClientConfig, token: Option<String>) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            max_response_bytes: config.max_response_bytes,
            user_agent: config.user_agent.trim().to_string(),
            token,
        }
    }
}

impl fmt::Debug for HttpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSettings")
            .field("timeout", &self.timeout)
            .field("max_response_bytes", &self.max_response_bytes)
            .field("user_agent", &self.user_agent)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a blocking HTTP client with the shared posture.
///
/// # Errors
///
/// Returns [`ServiceError::Transport`] when the client cannot be built.
pub(crate) fn build_http_client(settings: &HttpSettings) -> Result<Client, ServiceError> {
    Client::builder()
        .timeout(settings.timeout)
        .user_agent(settings.user_agent.clone())
        .redirect(Policy::none())
        .build()
        .map_err(|err| ServiceError::Transport(format!("http client build failed: {err}")))
}

/// Reads the response body while enforcing a byte limit.
///
/// # Errors
///
/// Returns [`ServiceError`] when the body exceeds the limit, is truncated, or
/// cannot be read.
pub(crate) fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, ServiceError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| ServiceError::Config("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(ServiceError::ResponseTooLarge {
            actual: usize::try_from(expected).unwrap_or(usize::MAX),
            limit: max_bytes,
        });
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle
        .read_to_end(&mut buf)
        .map_err(|err| ServiceError::Transport(format!("failed to read response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(ServiceError::ResponseTooLarge {
            actual: buf.len(),
            limit: max_bytes,
        });
    }
    if let Some(expected) = expected_len {
        let expected = usize::try_from(expected)
            .map_err(|_| ServiceError::Protocol("invalid response length".to_string()))?;
        if buf.len() < expected {
            return Err(ServiceError::Transport("http response truncated".to_string()));
        }
    }
    Ok(buf)
}

/// Returns a trimmed, bounded text preview of a response body.
pub(crate) fn body_preview(body: &[u8]) -> String {
    let end = body.len().min(MAX_BODY_PREVIEW_BYTES);
    String::from_utf8_lossy(&body[.. end]).trim().to_string()
}
