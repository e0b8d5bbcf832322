// crates/narrative-app/src/resolve.rs
// ============================================================================
// Module: Reference Resolution
// Description: Resolve workspace refs to UPAs through the Workspace.
// Purpose: Pin object inputs to immutable addresses before a service call.
// Dependencies: narrative-kbase, serde_json
// ============================================================================

//! ## Overview
//! A ref may name its workspace and object by name or id and may omit the
//! version. Resolution asks the Workspace for the object's info and rebuilds
//! the UPA from it, so even a full UPA is checked for existence. Bare object
//! names are qualified with the current workspace id first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use narrative_kbase::WorkspaceAccess;
use serde_json::Value;

use crate::error::AppError;
use crate::params::ProcessedParam;
use crate::params::is_blank;

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves one ref (`obj`, `ws/obj`, or `ws/obj/ver`) to a UPA.
///
/// # Errors
///
/// Returns [`AppError::Value`] when the ref has more than two slashes and
/// [`AppError::Service`] when the Workspace cannot find the object.
pub fn resolve_single_ref<W>(value: &str, ws_id: u64, ws: &W) -> Result<String, AppError>
where
    W: WorkspaceAccess + ?Sized,
{
    let slashes = value.matches('/').count();
    if slashes > 2 {
        return Err(AppError::Value(format!(
            "Object reference {value} has too many slashes - should be ws/obj/ver"
        )));
    }
    let reference = if slashes == 0 { format!("{ws_id}/{value}") } else { value.to_string() };
    Ok(ws.get_object_info(&reference)?.upa())
}

/// Resolves a ref or a list of refs.
///
/// Strings resolve to strings and lists to lists, element by element.
///
/// # Errors
///
/// Returns [`AppError::Value`] for values that are neither a string nor a
/// list of strings, and the first element failure otherwise.
pub fn resolve_ref<W>(value: &Value, ws_id: u64, ws: &W) -> Result<Value, AppError>
where
    W: WorkspaceAccess + ?Sized,
{
    match value {
        Value::String(reference) => Ok(Value::String(resolve_single_ref(reference, ws_id, ws)?)),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(reference) => {
                    resolve_single_ref(reference, ws_id, ws).map(Value::String)
                }
                other => Err(AppError::Value(format!("cannot resolve non-string ref {other}"))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Err(AppError::Value(format!("cannot resolve ref from {other}"))),
    }
}

/// Resolves `value` only when `spec_param` is an input object.
///
/// Output object names and non-object parameters pass through unchanged, as
/// does a blank value (null or whitespace). Blank list elements are dropped
/// before the rest of the list is resolved.
///
/// # Errors
///
/// Returns [`AppError`] as [`resolve_ref`].
pub fn resolve_ref_if_typed<W>(
    value: &Value,
    spec_param: &ProcessedParam,
    ws_id: u64,
    ws: &W,
) -> Result<Value, AppError>
where
    W: WorkspaceAccess + ?Sized,
{
    if !spec_param.is_input_object() || is_blank(value) {
        return Ok(value.clone());
    }
    match value {
        Value::Array(items) => {
            let refs = items.iter().filter(|item| !is_blank(item)).cloned().collect();
            resolve_ref(&Value::Array(refs), ws_id, ws)
        }
        other => resolve_ref(other, ws_id, ws),
    }
}
