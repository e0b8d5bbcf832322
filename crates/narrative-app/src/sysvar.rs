// crates/narrative-app/src/sysvar.rs
// ============================================================================
// Module: Narrative System Variables
// Description: Values the Narrative supplies to apps on the user's behalf.
// Purpose: Resolve `narrative_system_variable` mappings.
// Dependencies: narrative-kbase, serde_json
// ============================================================================

//! ## Overview
//! Supported names: `workspace` (name, looked up), `workspace_id`, `user_id`,
//! `timestamp_epoch_ms`, `timestamp_epoch_sec`. Unknown names yield `None`.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use narrative_kbase::WorkspaceAccess;
use serde_json::Value;

use crate::error::AppError;

/// Returns the value of system variable `name`.
///
/// `user_id` is `None` when no authenticated user is known.
///
/// # Errors
///
/// Returns [`AppError::Service`] when the workspace name lookup fails.
pub fn system_variable<W>(
    name: &str,
    ws_id: u64,
    ws: &W,
    user: Option<&str>,
) -> Result<Option<Value>, AppError>
where
    W: WorkspaceAccess + ?Sized,
{
    let value = match name {
        "workspace" => Some(Value::String(ws.get_workspace_info(ws_id)?.name)),
        "workspace_id" => Some(Value::from(ws_id)),
        "user_id" => user.map(|user| Value::String(user.to_string())),
        "timestamp_epoch_ms" => Some(Value::from(epoch_millis())),
        "timestamp_epoch_sec" => Some(Value::from(epoch_millis() / 1000)),
        _ => None,
    };
    Ok(value)
}

/// Milliseconds since the Unix epoch, saturating.
fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
