// crates/narrative-app/src/upa.rs
// ============================================================================
// Module: Workspace References
// Description: UPA parsing and syntactic reference validation.
// Purpose: Decide whether a string addresses a workspace object.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A UPA is an immutable address `ws_id/obj_id/version` of three numeric
//! segments. A ref is looser: `ws/obj` or `ws/obj/ver`, where the workspace
//! and object may be names and the version, when present, is numeric. Both
//! checks are purely syntactic; nothing here talks to the Workspace.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::RefError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Parsed unique persistent address.
///
/// # Invariants
/// - Displays as `workspace_id/object_id/version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Upa {
    /// Workspace id.
    pub workspace_id: u64,
    /// Object id within the workspace.
    pub object_id: u64,
    /// Object version.
    pub version: u64,
}

impl Upa {
    /// Builds a UPA from its three ids.
    #[must_use]
    pub const fn new(workspace_id: u64, object_id: u64, version: u64) -> Self {
        Self {
            workspace_id,
            object_id,
            version,
        }
    }
}

impl fmt::Display for Upa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.workspace_id, self.object_id, self.version)
    }
}

impl FromStr for Upa {
    type Err = RefError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || RefError::InvalidUpa(value.to_string());
        let mut parts = value.split('/');
        let (Some(ws), Some(obj), Some(ver), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if ![ws, obj, ver].iter().all(|part| is_numeric_segment(part)) {
            return Err(invalid());
        }
        Ok(Self {
            workspace_id: ws.parse().map_err(|_| invalid())?,
            object_id: obj.parse().map_err(|_| invalid())?,
            version: ver.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for Upa {
    type Error = RefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Upa> for String {
    fn from(upa: Upa) -> Self {
        upa.to_string()
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Returns true if `value` is a UPA: three `/`-separated numeric segments.
///
/// Purely syntactic; `0/0/0` is valid. Each segment must fit in a `u64`, so
/// every valid UPA also parses as a [`Upa`].
#[must_use]
pub fn is_valid_upa(value: &str) -> bool {
    let parts: Vec<&str> = value.split('/').collect();
    parts.len() == 3 && parts.iter().all(|part| is_numeric_segment(part))
}

/// Returns true if `value` is a workspace ref (`ws/obj` or `ws/obj/ver`).
///
/// Workspace and object may be names or ids. A third segment must be a
/// numeric version.
#[must_use]
pub fn is_valid_ref(value: &str) -> bool {
    let parts: Vec<&str> = value.split('/').collect();
    if !(2..=3).contains(&parts.len()) {
        return false;
    }
    if !parts.iter().all(|part| is_name_segment(part)) {
        return false;
    }
    parts.get(2).is_none_or(|version| is_numeric_segment(version))
}

/// [`is_valid_upa`] over JSON input; non-strings are never UPAs.
#[must_use]
pub fn json_is_upa(value: &Value) -> bool {
    value.as_str().is_some_and(is_valid_upa)
}

/// [`is_valid_ref`] over JSON input; non-strings are never refs.
#[must_use]
pub fn json_is_ref(value: &Value) -> bool {
    value.as_str().is_some_and(is_valid_ref)
}

/// Non-empty, all ASCII digits, and fits in a `u64`.
fn is_numeric_segment(part: &str) -> bool {
    !part.is_empty()
        && part.bytes().all(|byte| byte.is_ascii_digit())
        && part.parse::<u64>().is_ok()
}

/// Non-empty, no whitespace.
fn is_name_segment(part: &str) -> bool {
    !part.is_empty() && !part.chars().any(char::is_whitespace)
}
