// crates/narrative-kbase/src/audit.rs
// ============================================================================
// Module: Service Call Audit Logging
// Description: Structured audit events for outbound KBase service calls.
// Purpose: Emit redacted JSON-line logs without hard dependencies.
// Dependencies: narrative-config, serde, serde_json
// ============================================================================

//! ## Overview
//! Every service call made through the clients in this crate produces one
//! [`ServiceCallEvent`]. Sinks route events to stderr, an append-only file, or
//! nowhere. Events never carry tokens, request parameters, or response bodies;
//! only sizes, status codes, and error kinds are recorded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use narrative_config::AuditConfig;
use narrative_config::AuditMode;
use serde::Serialize;

use crate::error::ServiceError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Service call outcome classification.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    /// The call returned a result.
    Ok,
    /// The call failed.
    Error,
}

/// Audit event payload for one outbound service call.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceCallEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Target service name (`Workspace`, `auth`, ...).
    pub service: String,
    /// Method or route invoked.
    pub method: String,
    /// JSON-RPC request identifier when applicable.
    pub request_id: Option<String>,
    /// Call outcome.
    pub outcome: CallOutcome,
    /// HTTP status when a response was received.
    pub http_status: Option<u16>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
    /// Wall-clock latency in milliseconds.
    pub latency_ms: u128,
}

/// Inputs for building a [`ServiceCallEvent`].
pub struct ServiceCallEventParams<'a> {
    /// Target service name.
    pub service: &'a str,
    /// Method or route invoked.
    pub method: &'a str,
    /// JSON-RPC request identifier when applicable.
    pub request_id: Option<&'a str>,
    /// HTTP status when a response was received.
    pub http_status: Option<u16>,
    /// Error when the call failed.
    pub error: Option<&'a ServiceError>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
    /// Wall-clock latency.
    pub latency: Duration,
}

impl ServiceCallEvent {
    /// Builds a call event stamped with the current time.
    #[must_use]
    pub fn new(params: ServiceCallEventParams<'_>) -> Self {
        let outcome = if params.error.is_some() { CallOutcome::Error } else { CallOutcome::Ok };
        Self {
            event: "kbase_service_call",
            timestamp_ms: now_ms(),
            service: params.service.to_string(),
            method: params.method.to_string(),
            request_id: params.request_id.map(ToString::to_string),
            outcome,
            http_status: params.http_status,
            error_kind: params.error.map(ServiceError::kind),
            request_bytes: params.request_bytes,
            response_bytes: params.response_bytes,
            latency_ms: params.latency.as_millis(),
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for outbound service calls.
pub trait ServiceAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &ServiceCallEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ServiceAuditSink for StderrAuditSink {
    fn record(&self, event: &ServiceCallEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ServiceAuditSink for FileAuditSink {
    fn record(&self, event: &ServiceCallEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl ServiceAuditSink for NoopAuditSink {
    fn record(&self, _event: &ServiceCallEvent) {}
}

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Builds the audit sink selected by configuration.
///
/// # Errors
///
/// Returns an error when the file sink cannot open its log file.
pub fn audit_sink_from_config(config: &AuditConfig) -> io::Result<Arc<dyn ServiceAuditSink>> {
    match config.mode {
        AuditMode::None => Ok(Arc::new(NoopAuditSink)),
        AuditMode::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditMode::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "audit.mode=file requires audit.path")
            })?;
            Ok(Arc::new(FileAuditSink::new(Path::new(path.trim()))?))
        }
    }
}

/// Milliseconds since the Unix epoch, or zero if the clock is before it.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_millis()).unwrap_or(0)
}
