// crates/narrative-kbase/src/clients.rs
// ============================================================================
// Module: Configured Client Set
// Description: Builds every KBase client from one validated configuration.
// Purpose: Keep endpoint derivation, limits, and auditing consistent.
// Dependencies: narrative-config
// ============================================================================

//! ## Overview
//! [`KBaseClients`] wires the auth, workspace, and method store clients from a
//! [`NarrativeConfig`], sharing HTTP limits, the token, and one audit sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use narrative_config::NarrativeConfig;

use crate::audit::ServiceAuditSink;
use crate::auth::AuthClient;
use crate::error::ServiceError;
use crate::http::HttpSettings;
use crate::method_store::AppSpecClient;
use crate::workspace::WorkspaceClient;

// ============================================================================
// SECTION: Client Set
// ============================================================================

/// The KBase clients used by the narrative agent.
pub struct KBaseClients {
    /// Auth service client.
    pub auth: AuthClient,
    /// Workspace service client.
    pub workspace: WorkspaceClient,
    /// Narrative Method Store client.
    pub method_store: AppSpecClient,
}

impl KBaseClients {
    /// Builds the client set from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when any client cannot be constructed.
    pub fn from_config(
        config: &NarrativeConfig,
        token: Option<String>,
        audit: &Arc<dyn ServiceAuditSink>,
    ) -> Result<Self, ServiceError> {
        let settings = HttpSettings::from_config(&config.client, token);
        let services = &config.services;
        Ok(Self {
            auth: AuthClient::new(services.auth_url(), settings.clone())?
                .with_audit(Arc::clone(audit)),
            workspace: WorkspaceClient::new(services.workspace_url(), settings.clone())?
                .with_audit(Arc::clone(audit)),
            method_store: AppSpecClient::new(services.method_store_url(), settings)?
                .with_audit(Arc::clone(audit)),
        })
    }
}
