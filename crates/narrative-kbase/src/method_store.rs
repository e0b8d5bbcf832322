// crates/narrative-kbase/src/method_store.rs
// ============================================================================
// Module: Narrative Method Store Client
// Description: App specification lookups against the Narrative Method Store.
// Purpose: Fetch the declarative spec of an app by id and release tag.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The Narrative Method Store (NMS) serves app specs. Specs are returned as raw
//! JSON; typed parsing lives with the parameter helpers that consume them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::audit::ServiceAuditSink;
use crate::error::ServiceError;
use crate::http::HttpSettings;
use crate::service::ServiceClient;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON-RPC service name of the Narrative Method Store.
pub const METHOD_STORE_SERVICE: &str = "NarrativeMethodStore";

// ============================================================================
// SECTION: Types
// ============================================================================

/// App release tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppTag {
    /// Released version.
    #[default]
    Release,
    /// Beta version.
    Beta,
    /// Development version.
    Dev,
}

impl AppTag {
    /// Returns the wire label for the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Beta => "beta",
            Self::Dev => "dev",
        }
    }
}

impl fmt::Display for AppTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppTag {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "release" => Ok(Self::Release),
            "beta" => Ok(Self::Beta),
            "dev" => Ok(Self::Dev),
            other => Err(ServiceError::Config(format!(
                "unknown app tag '{other}' (expected release, beta, or dev)"
            ))),
        }
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// JSON-RPC client for the Narrative Method Store.
pub struct AppSpecClient {
    /// Underlying JSON-RPC client.
    inner: ServiceClient,
}

impl AppSpecClient {
    /// Creates a method store client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the underlying client cannot be built.
    pub fn new(endpoint: impl Into<String>, settings: HttpSettings) -> Result<Self, ServiceError> {
        Ok(Self {
            inner: ServiceClient::new(METHOD_STORE_SERVICE, endpoint, settings)?,
        })
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(self, audit: Arc<dyn ServiceAuditSink>) -> Self {
        Self {
            inner: self.inner.with_audit(audit),
        }
    }

    /// Fetches the spec of `app_id` (`Module/method`) at `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the call fails or no spec is returned.
    pub fn get_app_spec(&self, app_id: &str, tag: AppTag) -> Result<Value, ServiceError> {
        let parts: Vec<&str> = app_id.split('/').collect();
        if parts.len() != 2 || parts.iter().any(|part| part.trim().is_empty()) {
            return Err(ServiceError::Config(format!(
                "app id '{app_id}' must have the form Module/method"
            )));
        }
        let params = [json!({ "ids": [app_id], "tag": tag.as_str() })];
        let specs: Vec<Value> = self.inner.call("get_method_spec", &params)?;
        specs.into_iter().next().ok_or_else(|| {
            ServiceError::Protocol(format!("no app spec returned for {app_id} ({tag})"))
        })
    }
}
