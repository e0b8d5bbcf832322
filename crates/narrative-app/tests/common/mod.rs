// crates/narrative-app/tests/common/mod.rs
// ============================================================================
// Module: App Helper Test Fixtures
// Description: In-memory Workspace and app spec fixtures.
// Purpose: Exercise reference resolution without a live Workspace.
// Dependencies: narrative-kbase, serde_json
// ============================================================================

//! ## Overview
//! [`MockWorkspace`] implements [`WorkspaceAccess`] over two small workspaces:
//! `1000` (`test_workspace`, objects `foo` = 2 at version 3 and `bar` = 3 at
//! version 4) and `1` (`other_workspace`, objects 2, 3, and 4). Lookups accept
//! ids or names for both workspace and object. Anything else fails the way
//! the Workspace does, with a server error.

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test helpers are selectively used across suites and may panic."
)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use narrative_app::AppSpec;
use narrative_kbase::ObjectInfo;
use narrative_kbase::ServiceError;
use narrative_kbase::WorkspaceAccess;
use narrative_kbase::WorkspaceInfo;
use serde_json::Map;
use serde_json::Value;

/// Id of the current workspace in tests.
pub const MOCK_WS_ID: u64 = 1000;
/// Name of the current workspace in tests.
pub const MOCK_WS_NAME: &str = "test_workspace";

// ============================================================================
// SECTION: Mock Workspace
// ============================================================================

/// One stored object.
struct MockObject {
    /// Owning workspace id.
    ws_id: u64,
    /// Object id.
    obj_id: u64,
    /// Object name.
    name: &'static str,
    /// Latest version.
    latest: u64,
}

/// In-memory Workspace.
pub struct MockWorkspace {
    /// Workspaces as (id, name).
    workspaces: Vec<(u64, &'static str)>,
    /// Stored objects.
    objects: Vec<MockObject>,
    /// Refs looked up, in order.
    lookups: Mutex<Vec<String>>,
}

impl Default for MockWorkspace {
    fn default() -> Self {
        Self {
            workspaces: vec![(MOCK_WS_ID, MOCK_WS_NAME), (1, "other_workspace")],
            objects: vec![
                MockObject { ws_id: MOCK_WS_ID, obj_id: 2, name: "foo", latest: 3 },
                MockObject { ws_id: MOCK_WS_ID, obj_id: 3, name: "bar", latest: 4 },
                MockObject { ws_id: 1, obj_id: 2, name: "genome", latest: 3 },
                MockObject { ws_id: 1, obj_id: 3, name: "reads", latest: 1 },
                MockObject { ws_id: 1, obj_id: 4, name: "reads_set", latest: 1 },
            ],
            lookups: Mutex::new(Vec::new()),
        }
    }
}

impl MockWorkspace {
    /// Refs passed to `get_object_info` so far.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().expect("lookups lock").clone()
    }

    /// Finds a workspace id by id or name.
    fn workspace_id(&self, segment: &str) -> Option<u64> {
        self.workspaces
            .iter()
            .find(|(id, name)| segment.parse::<u64>().ok() == Some(*id) || *name == segment)
            .map(|(id, _)| *id)
    }
}

/// Workspace-style "not found" error.
fn not_found(message: String) -> ServiceError {
    ServiceError::Server {
        name: "JSONRPCError".to_string(),
        code: -32500,
        message,
        data: None,
    }
}

impl WorkspaceAccess for MockWorkspace {
    fn get_object_info(&self, reference: &str) -> Result<ObjectInfo, ServiceError> {
        self.lookups.lock().expect("lookups lock").push(reference.to_string());
        let parts: Vec<&str> = reference.split('/').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(not_found(format!("Illegal reference {reference}")));
        }
        let ws_id = self
            .workspace_id(parts[0])
            .ok_or_else(|| not_found(format!("No workspace with name {} exists", parts[0])))?;
        let object = self
            .objects
            .iter()
            .find(|object| {
                object.ws_id == ws_id
                    && (parts[1].parse::<u64>().ok() == Some(object.obj_id)
                        || object.name == parts[1])
            })
            .ok_or_else(|| {
                not_found(format!("No object with name {} exists in workspace {ws_id}", parts[1]))
            })?;
        let version = match parts.get(2) {
            Some(version) => version
                .parse::<u64>()
                .ok()
                .filter(|version| (1..=object.latest).contains(version))
                .ok_or_else(|| not_found(format!("No object with version {version}")))?,
            None => object.latest,
        };
        let workspace_name =
            self.workspaces.iter().find(|(id, _)| *id == ws_id).map(|(_, name)| *name).unwrap_or("");
        Ok(ObjectInfo {
            object_id: object.obj_id,
            name: object.name.to_string(),
            type_string: "KBaseGenomes.Genome-17.0".to_string(),
            save_date: "2024-01-01T00:00:00+0000".to_string(),
            version,
            saved_by: "some_user".to_string(),
            workspace_id: ws_id,
            workspace_name: workspace_name.to_string(),
            checksum: "0123456789abcdef".to_string(),
            size: 1024,
            metadata: None,
        })
    }

    fn get_workspace_info(&self, workspace_id: u64) -> Result<WorkspaceInfo, ServiceError> {
        let (id, name) = self
            .workspaces
            .iter()
            .find(|(id, _)| *id == workspace_id)
            .ok_or_else(|| not_found(format!("No workspace with id {workspace_id} exists")))?;
        Ok(WorkspaceInfo {
            id: *id,
            name: (*name).to_string(),
            owner: "some_user".to_string(),
            modified: "2024-01-01T00:00:00+0000".to_string(),
            max_object_id: 4,
            user_permission: "a".to_string(),
            global_read: "n".to_string(),
            lock_status: "unlocked".to_string(),
            metadata: BTreeMap::new(),
        })
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// The `NarrativeTest/test_input_params` app spec.
pub fn app_spec() -> AppSpec {
    serde_json::from_str(include_str!("../fixtures/app_spec.json")).expect("app spec fixture")
}

/// A filled-in parameter set for [`app_spec`].
pub fn input_params() -> Map<String, Value> {
    serde_json::from_str(include_str!("../fixtures/app_spec_inputs.json"))
        .expect("inputs fixture")
}

/// Expected processed parameters for [`app_spec`].
pub fn expected_processed_params() -> Value {
    serde_json::from_str(include_str!("../fixtures/app_spec_processed_params.json"))
        .expect("processed params fixture")
}
