// crates/narrative-kbase/src/workspace.rs
// ============================================================================
// Module: KBase Workspace Client
// Description: Object and workspace info lookups against the Workspace service.
// Purpose: Decode positional info tuples and expose the lookup seam.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The Workspace service reports object and workspace metadata as positional
//! tuples (11 and 9 elements). This module decodes them into named structs and
//! defines [`WorkspaceAccess`], the only view of the workspace that reference
//! resolution needs. [`WorkspaceClient`] implements it over JSON-RPC.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
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

/// JSON-RPC service name of the Workspace.
pub const WORKSPACE_SERVICE: &str = "Workspace";

// ============================================================================
// SECTION: Info Types
// ============================================================================

/// Positional object info tuple as sent by the Workspace.
type ObjectInfoTuple = (
    u64,
    String,
    String,
    String,
    u64,
    String,
    u64,
    String,
    String,
    u64,
    Option<BTreeMap<String, String>>,
);

/// Positional workspace info tuple as sent by the Workspace.
type WorkspaceInfoTuple =
    (u64, String, String, String, u64, String, String, String, BTreeMap<String, String>);

/// Metadata about one versioned workspace object.
///
/// # Invariants
/// - `(workspace_id, object_id, version)` is the object's UPA.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "ObjectInfoTuple", into = "ObjectInfoTuple")]
pub struct ObjectInfo {
    /// Object id within its workspace.
    pub object_id: u64,
    /// Object name.
    pub name: String,
    /// Full type string (`Module.Type-major.minor`).
    pub type_string: String,
    /// Save date (ISO 8601).
    pub save_date: String,
    /// Object version.
    pub version: u64,
    /// User that saved this version.
    pub saved_by: String,
    /// Owning workspace id.
    pub workspace_id: u64,
    /// Owning workspace name.
    pub workspace_name: String,
    /// MD5 checksum of the object data.
    pub checksum: String,
    /// Object size in bytes.
    pub size: u64,
    /// User metadata, when requested.
    pub metadata: Option<BTreeMap<String, String>>,
}

impl ObjectInfo {
    /// Returns the object's UPA (`ws/obj/ver`).
    #[must_use]
    pub fn upa(&self) -> String {
        format!("{}/{}/{}", self.workspace_id, self.object_id, self.version)
    }
}

impl From<ObjectInfoTuple> for ObjectInfo {
    fn from(tuple: ObjectInfoTuple) -> Self {
        let (
            object_id,
            name,
            type_string,
            save_date,
            version,
            saved_by,
            workspace_id,
            workspace_name,
            checksum,
            size,
            metadata,
        ) = tuple;
        Self {
            object_id,
            name,
            type_string,
            save_date,
            version,
            saved_by,
            workspace_id,
            workspace_name,
            checksum,
            size,
            metadata,
        }
    }
}

impl From<ObjectInfo> for ObjectInfoTuple {
    fn from(info: ObjectInfo) -> Self {
        (
            info.object_id,
            info.name,
            info.type_string,
            info.save_date,
            info.version,
            info.saved_by,
            info.workspace_id,
            info.workspace_name,
            info.checksum,
            info.size,
            info.metadata,
        )
    }
}

/// Metadata about one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "WorkspaceInfoTuple", into = "WorkspaceInfoTuple")]
pub struct WorkspaceInfo {
    /// Workspace id.
    pub id: u64,
    /// Workspace name.
    pub name: String,
    /// Owning user.
    pub owner: String,
    /// Last modification date (ISO 8601).
    pub modified: String,
    /// Highest object id in the workspace.
    pub max_object_id: u64,
    /// Caller's permission (`a`, `w`, `r`, `n`).
    pub user_permission: String,
    /// Global read flag (`r` or `n`).
    pub global_read: String,
    /// Lock status.
    pub lock_status: String,
    /// Workspace metadata.
    pub metadata: BTreeMap<String, String>,
}

impl From<WorkspaceInfoTuple> for WorkspaceInfo {
    fn from(tuple: WorkspaceInfoTuple) -> Self {
        let (
            id,
            name,
            owner,
            modified,
            max_object_id,
            user_permission,
            global_read,
            lock_status,
            metadata,
        ) = tuple;
        Self {
            id,
            name,
            owner,
            modified,
            max_object_id,
            user_permission,
            global_read,
            lock_status,
            metadata,
        }
    }
}

impl From<WorkspaceInfo> for WorkspaceInfoTuple {
    fn from(info: WorkspaceInfo) -> Self {
        (
            info.id,
            info.name,
            info.owner,
            info.modified,
            info.max_object_id,
            info.user_permission,
            info.global_read,
            info.lock_status,
            info.metadata,
        )
    }
}

// ============================================================================
// SECTION: Access Trait
// ============================================================================

/// Read-only view of the Workspace used by reference resolution.
pub trait WorkspaceAccess {
    /// Returns info for the object addressed by `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Server`] when the object does not exist or is
    /// not readable, and other [`ServiceError`] variants on transport failure.
    fn get_object_info(&self, reference: &str) -> Result<ObjectInfo, ServiceError>;

    /// Returns info for the workspace with id `workspace_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the lookup fails.
    fn get_workspace_info(&self, workspace_id: u64) -> Result<WorkspaceInfo, ServiceError>;
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// `get_object_info3` result payload.
#[derive(Debug, Deserialize)]
struct ObjectInfo3Result {
    /// Object infos in request order.
    infos: Vec<Option<ObjectInfo>>,
}

/// JSON-RPC client for the Workspace service.
pub struct WorkspaceClient {
    /// Underlying JSON-RPC client.
    inner: ServiceClient,
}

impl WorkspaceClient {
    /// Creates a Workspace client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the underlying client cannot be built.
    pub fn new(endpoint: impl Into<String>, settings: HttpSettings) -> Result<Self, ServiceError> {
        Ok(Self {
            inner: ServiceClient::new(WORKSPACE_SERVICE, endpoint, settings)?,
        })
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(self, audit: Arc<dyn ServiceAuditSink>) -> Self {
        Self {
            inner: self.inner.with_audit(audit),
        }
    }

    /// Returns the underlying JSON-RPC client.
    #[must_use]
    pub const fn service_client(&self) -> &ServiceClient {
        &self.inner
    }

    /// Returns infos for several references in one call.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the call fails or any object is missing.
    pub fn get_object_infos(&self, references: &[&str]) -> Result<Vec<ObjectInfo>, ServiceError> {
        let objects: Vec<Value> =
            references.iter().map(|reference| json!({ "ref": reference })).collect();
        let params = [json!({ "objects": objects, "includeMetadata": 1 })];
        let result: ObjectInfo3Result = self.inner.call("get_object_info3", &params)?;
        if result.infos.len() != references.len() {
            return Err(ServiceError::Protocol(format!(
                "get_object_info3 returned {} infos for {} refs",
                result.infos.len(),
                references.len()
            )));
        }
        result
            .infos
            .into_iter()
            .zip(references)
            .map(|(info, reference)| {
                info.ok_or_else(|| {
                    ServiceError::unknown_server(format!("Object {reference} is not accessible"))
                })
            })
            .collect()
    }
}

impl WorkspaceAccess for WorkspaceClient {
    fn get_object_info(&self, reference: &str) -> Result<ObjectInfo, ServiceError> {
        self.get_object_infos(&[reference])?
            .pop()
            .ok_or_else(|| ServiceError::Protocol("get_object_info3 returned no info".to_string()))
    }

    fn get_workspace_info(&self, workspace_id: u64) -> Result<WorkspaceInfo, ServiceError> {
        self.inner.call("get_workspace_info", &[json!({ "id": workspace_id })])
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn object_info_decodes_positional_tuple() {
        let raw = json!([
            2, "foo", "KBaseGenomes.Genome-17.0", "2024-01-01T00:00:00+0000", 3, "someone",
            1000, "test_workspace", "abc123", 1024, {"key": "value"}
        ]);
        let info: Result<ObjectInfo, _> = serde_json::from_value(raw);
        let Ok(info) = info else {
            unreachable!("tuple should decode");
        };
        assert_eq!(info.upa(), "1000/2/3");
        assert_eq!(info.name, "foo");
        assert_eq!(info.metadata.as_ref().and_then(|meta| meta.get("key")).map(String::as_str), Some("value"));
    }

    #[test]
    fn object_info_accepts_null_metadata() {
        let raw = json!([
            4, "bar", "KBaseFile.PairedEndLibrary-2.1", "2024-01-01T00:00:00+0000", 1,
            "someone", 1, "other", "ffff", 12, null
        ]);
        let info: Result<ObjectInfo, _> = serde_json::from_value(raw);
        assert!(matches!(info, Ok(ref info) if info.metadata.is_none() && info.upa() == "1/4/1"));
    }

    #[test]
    fn workspace_info_round_trips_through_tuple() {
        let raw = json!([
            1000, "test_workspace", "someone", "2024-01-01T00:00:00+0000", 12, "a", "n",
            "unlocked", {"narrative": "1"}
        ]);
        let info: Result<WorkspaceInfo, _> = serde_json::from_value(raw.clone());
        let Ok(info) = info else {
            unreachable!("tuple should decode");
        };
        assert_eq!(info.name, "test_workspace");
        assert_eq!(serde_json::to_value(&info).ok(), Some(raw));
    }

    #[test]
    fn short_tuple_is_rejected() {
        let info: Result<ObjectInfo, _> = serde_json::from_value(json!([1, "foo"]));
        assert!(info.is_err());
    }
}
