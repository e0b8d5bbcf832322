// crates/narrative-app/src/params.rs
// ============================================================================
// Module: App Parameter Processing
// Description: Compact parameter descriptions and object input discovery.
// Purpose: Turn declarative app parameters into the facts callers act on.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`process_param_type`] infers a parameter's effective type from its input
//! widget: object pickers become `data_object`, validated text becomes `int`
//! or `float`, dropdowns list their labels. [`get_processed_app_spec_params`]
//! applies it to every parameter of a spec, and [`get_ws_object_refs`] pulls
//! the workspace objects a filled-in parameter set refers to.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::spec::AppSpec;
use crate::spec::ParamSpec;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Processed type of parameters that pick existing workspace objects.
pub const DATA_OBJECT_TYPE: &str = "data_object";

/// Processed type of dropdown parameters.
pub const DROPDOWN_TYPE: &str = "dropdown";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Compact description of one app parameter.
///
/// # Invariants
/// - `min_val`/`max_val` are set only for `int` and `float` parameters.
/// - `valid_ws_types` is set only for `data_object` parameters.
/// - `allowed_values` is set only for `dropdown` parameters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ProcessedParam {
    /// Parameter id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Processed type.
    #[serde(rename = "type")]
    pub param_type: String,
    /// Short description.
    pub description: String,
    /// Whether a value may be omitted.
    pub optional: bool,
    /// Whether a list of values is accepted.
    pub allow_multiple: bool,
    /// Default value (a list when `allow_multiple`).
    pub default_value: Value,
    /// Whether the value names a new output object.
    pub is_output_object: bool,
    /// Lower numeric bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_val: Option<Value>,
    /// Upper numeric bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_val: Option<Value>,
    /// Accepted workspace types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_ws_types: Option<Vec<String>>,
    /// Dropdown labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
}

impl ProcessedParam {
    /// Returns true for object inputs that must resolve to existing objects.
    #[must_use]
    pub fn is_input_object(&self) -> bool {
        self.param_type == DATA_OBJECT_TYPE && !self.is_output_object
    }
}

// ============================================================================
// SECTION: Type Processing
// ============================================================================

/// Infers a parameter's processed type and its constraints.
///
/// - `text` with `valid_ws_types` → (`data_object`, the types)
/// - `text` validated as `int`/`float` → (that kind, `[min, max]`), missing
///   bounds are null
/// - `dropdown` → (`dropdown`, display labels in order)
/// - anything else → (`field_type`, `[]`)
#[must_use]
pub fn process_param_type(param: &ParamSpec) -> (String, Vec<Value>) {
    match param.field_type.as_str() {
        "text" => {
            let Some(options) = &param.text_options else {
                return (param.field_type.clone(), Vec::new());
            };
            if !options.valid_ws_types.is_empty() {
                let types = options.valid_ws_types.iter().cloned().map(Value::String).collect();
                return (DATA_OBJECT_TYPE.to_string(), types);
            }
            match options.validate_as.as_deref() {
                Some(kind @ ("int" | "float")) => {
                    let (min, max) = options.bounds(kind);
                    let bounds = vec![
                        min.cloned().unwrap_or(Value::Null),
                        max.cloned().unwrap_or(Value::Null),
                    ];
                    (kind.to_string(), bounds)
                }
                _ => (param.field_type.clone(), Vec::new()),
            }
        }
        "dropdown" => {
            let labels = param
                .dropdown_options
                .iter()
                .flat_map(|dropdown| &dropdown.options)
                .map(|option| Value::String(option.display.clone()))
                .collect();
            (DROPDOWN_TYPE.to_string(), labels)
        }
        other => (other.to_string(), Vec::new()),
    }
}

/// Processes every parameter of `spec`, keyed by parameter id.
#[must_use]
pub fn get_processed_app_spec_params(spec: &AppSpec) -> BTreeMap<String, ProcessedParam> {
    spec.parameters.iter().map(|param| (param.id.clone(), process_param(param))).collect()
}

/// Builds the compact description of one parameter.
fn process_param(param: &ParamSpec) -> ProcessedParam {
    let (param_type, constraints) = process_param_type(param);
    let description =
        if param.short_hint.trim().is_empty() { &param.description } else { &param.short_hint };
    let mut processed = ProcessedParam {
        id: param.id.clone(),
        name: param.ui_name.clone(),
        param_type,
        description: description.clone(),
        optional: param.optional,
        allow_multiple: param.allow_multiple,
        default_value: default_value(param),
        is_output_object: param.is_output_object(),
        ..ProcessedParam::default()
    };
    match processed.param_type.as_str() {
        "int" | "float" => {
            let mut bounds = constraints.into_iter();
            processed.min_val = Some(bounds.next().unwrap_or(Value::Null));
            processed.max_val = Some(bounds.next().unwrap_or(Value::Null));
        }
        DATA_OBJECT_TYPE => processed.valid_ws_types = Some(strings(constraints)),
        DROPDOWN_TYPE => processed.allowed_values = Some(strings(constraints)),
        _ => {}
    }
    processed
}

/// Picks the default: the non-blank list for multi-valued parameters,
/// otherwise the first non-blank value or null.
fn default_value(param: &ParamSpec) -> Value {
    let mut values = param.default_values.iter().filter(|value| !is_blank(value)).cloned();
    if param.allow_multiple {
        Value::Array(values.collect())
    } else {
        values.next().unwrap_or(Value::Null)
    }
}

/// Extracts the string members of a constraint list.
fn strings(values: Vec<Value>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::String(text) => Some(text),
            _ => None,
        })
        .collect()
}

// ============================================================================
// SECTION: Object Refs
// ============================================================================

/// Returns the workspace objects referenced by input object parameters.
///
/// Looks at top-level values and at values nested in parameter groups. Lists
/// are flattened, blank values skipped, and duplicates dropped while keeping
/// first-seen order. Output object names are not refs and are ignored.
#[must_use]
pub fn get_ws_object_refs(spec: &AppSpec, params: &Map<String, Value>) -> Vec<String> {
    let processed = get_processed_app_spec_params(spec);
    let inputs: BTreeSet<&str> = processed
        .values()
        .filter(|param| param.is_input_object())
        .map(|param| param.id.as_str())
        .collect();
    let mut refs = Vec::new();
    for (id, value) in params {
        if inputs.contains(id.as_str()) {
            collect_refs(value, &mut refs);
        }
    }
    for group in &spec.parameter_groups {
        let Some(group_value) = params.get(&group.id) else {
            continue;
        };
        for members in group_entries(group_value) {
            for member in &group.parameter_ids {
                if inputs.contains(member.as_str())
                    && let Some(value) = members.get(member)
                {
                    collect_refs(value, &mut refs);
                }
            }
        }
    }
    let mut seen = BTreeSet::new();
    refs.retain(|reference| seen.insert(reference.clone()));
    refs
}

/// Returns the member maps of a group value (one map or a list of maps).
pub(crate) fn group_entries(value: &Value) -> Vec<&Map<String, Value>> {
    match value {
        Value::Object(members) => vec![members],
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

/// Appends non-blank strings from a scalar or list value.
fn collect_refs(value: &Value, refs: &mut Vec<String>) {
    match value {
        Value::String(text) if !text.trim().is_empty() => refs.push(text.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, refs)),
        _ => {}
    }
}

/// Null or a whitespace-only string.
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}
