// crates/narrative-kbase/src/lib.rs
// ============================================================================
// Module: Narrative KBase Clients
// Description: JSON-RPC 1.1 and REST clients for KBase services.
// Purpose: Provide the service access layer used by the app parameter helpers.
// Dependencies: narrative-config, reqwest, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This crate talks to KBase services: a generic JSON-RPC 1.1
//! [`ServiceClient`], typed clients for the auth service, the Workspace, and
//! the Narrative Method Store, and the [`WorkspaceAccess`] seam that reference
//! resolution is written against.
//! Invariants:
//! - JSON-RPC requests carry exactly `id`, `version`, `method`, and `params`.
//! - Errors reported by a service surface as [`ServiceError::Server`].
//! - Response bodies are bounded by the configured size limit.
//!
//! Security posture: tokens are redacted from `Debug` output and never logged.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod clients;
pub mod error;
pub mod http;
pub mod method_store;
pub mod service;
pub mod workspace;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::CallOutcome;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::ServiceAuditSink;
pub use audit::ServiceCallEvent;
pub use audit::StderrAuditSink;
pub use audit::audit_sink_from_config;
pub use auth::AuthClient;
pub use auth::TokenInfo;
pub use clients::KBaseClients;
pub use error::ServiceError;
pub use http::HttpSettings;
pub use method_store::AppSpecClient;
pub use method_store::AppTag;
pub use service::ServiceClient;
pub use workspace::ObjectInfo;
pub use workspace::WorkspaceAccess;
pub use workspace::WorkspaceClient;
pub use workspace::WorkspaceInfo;
