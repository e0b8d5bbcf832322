// crates/narrative-kbase/src/error.rs
// ============================================================================
// Module: KBase Service Errors
// Description: Error taxonomy shared by every KBase service client.
// Purpose: Separate server-reported failures from transport and protocol faults.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`ServiceError`] is returned by the JSON-RPC, auth, workspace, and method
//! store clients. The [`ServiceError::Server`] variant carries the error object
//! a KBase service reports (for example a workspace object that does not
//! exist); the remaining variants describe local, transport, or protocol
//! failures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// KBase service client errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling and audit labels.
/// - String payloads are user-facing and may include untrusted server text.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Client configuration error.
    #[error("service client config error: {0}")]
    Config(String),
    /// Transport failure (connect, timeout, read).
    #[error("service transport error: {0}")]
    Transport(String),
    /// JSON serialization or payload decoding error.
    #[error("service json error: {0}")]
    Json(String),
    /// Response did not follow the expected protocol shape.
    #[error("service protocol error: {0}")]
    Protocol(String),
    /// Non-success HTTP status without a server error payload.
    #[error("http status {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Trimmed response body preview.
        body: String,
    },
    /// Error object reported by a JSON-RPC service.
    #[error("{name} ({code}): {message}")]
    Server {
        /// Error name reported by the server.
        name: String,
        /// Numeric error code.
        code: i64,
        /// Error message.
        message: String,
        /// Additional error data (often a server-side traceback).
        data: Option<String>,
    },
    /// Error object reported by the auth service.
    #[error("auth error {status} ({app_code} {app_error}): {message}")]
    Auth {
        /// HTTP status code.
        status: u16,
        /// Application error code.
        app_code: i64,
        /// Application error label.
        app_error: String,
        /// Error message.
        message: String,
    },
    /// Response size exceeds limits.
    #[error("service response exceeds size limit ({actual} > {limit})")]
    ResponseTooLarge {
        /// Actual size in bytes.
        actual: usize,
        /// Maximum size in bytes.
        limit: usize,
    },
}

impl ServiceError {
    /// Builds the generic server error used when a response lacks detail.
    #[must_use]
    pub fn unknown_server(message: impl Into<String>) -> Self {
        Self::Server {
            name: "Unknown".to_string(),
            code: 0,
            message: message.into(),
            data: None,
        }
    }

    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Transport(_) => "transport",
            Self::Json(_) => "json",
            Self::Protocol(_) => "protocol",
            Self::Http {
                ..
            } => "http",
            Self::Server {
                ..
            } => "server",
            Self::Auth {
                ..
            } => "auth",
            Self::ResponseTooLarge {
                ..
            } => "response_too_large",
        }
    }

    /// Returns true when the error was reported by the remote service.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Server {
                ..
            }
        )
    }
}
