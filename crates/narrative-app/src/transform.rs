// crates/narrative-app/src/transform.rs
// ============================================================================
// Module: Parameter Value Transforms
// Description: Coerce app parameter values into the types a service expects.
// Purpose: Apply `target_type_transform` rules from input mappings.
// Dependencies: narrative-kbase, serde_json
// ============================================================================

//! ## Overview
//! Transform types:
//! - `none`, `object`: unchanged
//! - `string`: lists joined with `,`, maps as `k=v` pairs joined with `,`
//! - `int`, `float`: numeric coercion; null and blank strings become null
//! - `ref`, `unresolved-ref`: bare names qualified with the workspace id
//! - `resolved-ref`, `upa`: resolved to a UPA through the Workspace
//! - `list<T>`: each element transformed with `T`; scalars are wrapped
//!
//! With no transform type, `textsubdata` parameters are treated as `string`
//! and everything else passes through.

// ============================================================================
// SECTION: Imports
// ============================================================================

use narrative_kbase::WorkspaceAccess;
use serde_json::Number;
use serde_json::Value;

use crate::error::AppError;
use crate::params::ProcessedParam;
use crate::resolve::resolve_ref;

// ============================================================================
// SECTION: Transform
// ============================================================================

/// Transforms `value` according to `transform_type`.
///
/// # Errors
///
/// Returns [`AppError::Value`] for unsupported transform types and values
/// that cannot be coerced, and [`AppError::Service`] when a ref fails to
/// resolve.
pub fn transform_param_value<W>(
    transform_type: Option<&str>,
    value: &Value,
    spec_param: Option<&ProcessedParam>,
    ws_id: u64,
    ws: &W,
) -> Result<Value, AppError>
where
    W: WorkspaceAccess + ?Sized,
{
    let transform = match transform_type.map(str::trim) {
        Some(transform) if !transform.is_empty() => transform,
        _ if spec_param.is_some_and(|param| param.param_type == "textsubdata") => "string",
        _ => return Ok(value.clone()),
    };
    if let Some(inner) = transform.strip_prefix("list<").and_then(|rest| rest.strip_suffix('>')) {
        let items = match value {
            Value::Null => return Ok(Value::Null),
            Value::Array(items) => items.as_slice(),
            other => std::slice::from_ref(other),
        };
        return items
            .iter()
            .map(|item| transform_param_value(Some(inner), item, spec_param, ws_id, ws))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }
    match transform {
        "none" | "object" => Ok(value.clone()),
        "string" => Ok(to_string_value(value)),
        "int" => to_int(value),
        "float" => to_float(value),
        "ref" | "unresolved-ref" => qualify_ref(value, ws_id),
        "resolved-ref" | "upa" if value.is_null() => Ok(Value::Null),
        "resolved-ref" | "upa" => resolve_ref(value, ws_id, ws),
        other => Err(AppError::Value(format!("Unsupported Transformation type: {other}"))),
    }
}

// ============================================================================
// SECTION: Coercions
// ============================================================================

/// String form of a value; null stays null.
fn to_string_value(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Array(items) => {
            Value::String(items.iter().map(scalar_text).collect::<Vec<_>>().join(","))
        }
        Value::Object(map) => Value::String(
            map.iter()
                .map(|(key, item)| format!("{key}={}", scalar_text(item)))
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Value::String(scalar_text(other)),
    }
}

/// Text of a value without quoting for top-level strings.
///
/// Booleans render as `True`/`False`, null as `None`, and nested lists and
/// objects as `[1, 2]` and `{'k': 'v'}`.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => nested_text(other),
    }
}

/// Text of a value inside a list or object; strings are single-quoted.
fn nested_text(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => quoted_text(text),
        Value::Array(items) => {
            format!("[{}]", items.iter().map(nested_text).collect::<Vec<_>>().join(", "))
        }
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(key, item)| format!("{}: {}", quoted_text(key), nested_text(item)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Single-quoted string, switching to double quotes when the text holds `'`.
fn quoted_text(text: &str) -> String {
    if text.contains('\'') && !text.contains('"') {
        format!("\"{text}\"")
    } else {
        format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

/// Integer coercion.
fn to_int(value: &Value) -> Result<Value, AppError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(text) if text.trim().is_empty() => Ok(Value::Null),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| AppError::Value(format!("Can't transform '{text}' to an int"))),
        Value::Number(number) if number.is_i64() || number.is_u64() => Ok(value.clone()),
        Value::Bool(flag) => Ok(Value::from(i64::from(*flag))),
        other => Err(AppError::Value(format!("Can't transform {other} to an int"))),
    }
}

/// Float coercion.
fn to_float(value: &Value) -> Result<Value, AppError> {
    let parsed = match value {
        Value::Null => return Ok(Value::Null),
        Value::String(text) if text.trim().is_empty() => return Ok(Value::Null),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Number(number) => number.as_f64(),
        _ => None,
    };
    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| AppError::Value(format!("Can't transform {value} to a float")))
}

/// Qualifies a bare object name with the workspace id.
fn qualify_ref(value: &Value, ws_id: u64) -> Result<Value, AppError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(text) if text.contains('/') => Ok(value.clone()),
        Value::String(text) => Ok(Value::String(format!("{ws_id}/{text}"))),
        other => Err(AppError::Value(format!("Can't transform {other} to a ref"))),
    }
}
