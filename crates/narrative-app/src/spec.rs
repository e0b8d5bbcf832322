// crates/narrative-app/src/spec.rs
// ============================================================================
// Module: App Specification Model
// Description: Typed view of Narrative Method Store app specs.
// Purpose: Deserialize the parts of an app spec the parameter helpers read.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! App specs are served by the Narrative Method Store as JSON. These structs
//! cover parameters, parameter groups, and the service input mapping. Unknown
//! fields are ignored and almost everything defaults, so partial specs (as
//! hand-written in tests or tooling) deserialize too.
//!
//! The store encodes booleans as `0`/`1`; [`flag`] accepts both that and
//! JSON booleans.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: App Spec
// ============================================================================

/// A Narrative Method Store app spec.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppSpec {
    /// Identity and display info.
    #[serde(default)]
    pub info: AppInfo,
    /// Input parameters in display order.
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,
    /// Parameter groups bundling several parameters into one input.
    #[serde(default)]
    pub parameter_groups: Vec<ParamGroupSpec>,
    /// How inputs reach the backing service.
    #[serde(default)]
    pub behavior: Behavior,
}

impl AppSpec {
    /// Returns the parameter with `id`, if declared.
    #[must_use]
    pub fn parameter(&self, id: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|param| param.id == id)
    }

    /// Returns the parameter group with `id`, if declared.
    #[must_use]
    pub fn parameter_group(&self, id: &str) -> Option<&ParamGroupSpec> {
        self.parameter_groups.iter().find(|group| group.id == id)
    }
}

/// App identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppInfo {
    /// App id (`Module/method`).
    #[serde(default)]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Module name.
    #[serde(default)]
    pub module_name: String,
    /// Spec version.
    #[serde(default)]
    pub ver: String,
    /// Short description.
    #[serde(default)]
    pub subtitle: String,
}

// ============================================================================
// SECTION: Parameters
// ============================================================================

/// One declared app parameter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ParamSpec {
    /// Parameter id.
    #[serde(default)]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub ui_name: String,
    /// One-line hint.
    #[serde(default)]
    pub short_hint: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// Input widget type (`text`, `dropdown`, `checkbox`, ...).
    #[serde(default)]
    pub field_type: String,
    /// Whether a value may be omitted.
    #[serde(default, deserialize_with = "flag")]
    pub optional: bool,
    /// Whether the parameter is hidden under advanced options.
    #[serde(default, deserialize_with = "flag")]
    pub advanced: bool,
    /// Whether a list of values is accepted.
    #[serde(default, deserialize_with = "flag")]
    pub allow_multiple: bool,
    /// Default values.
    #[serde(default)]
    pub default_values: Vec<Value>,
    /// Options for `text` fields.
    #[serde(default)]
    pub text_options: Option<TextOptions>,
    /// Options for `dropdown` fields.
    #[serde(default)]
    pub dropdown_options: Option<DropdownOptions>,
}

impl ParamSpec {
    /// Returns true when the parameter names an object the app will create.
    #[must_use]
    pub fn is_output_object(&self) -> bool {
        self.text_options.as_ref().is_some_and(|options| options.is_output_name)
    }
}

/// Options for `text` fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TextOptions {
    /// Workspace types an object input must have.
    #[serde(default)]
    pub valid_ws_types: Vec<String>,
    /// Number validation (`int` or `float`).
    #[serde(default)]
    pub validate_as: Option<String>,
    /// Whether the value names a new output object.
    #[serde(default, deserialize_with = "flag")]
    pub is_output_name: bool,
    /// Lower bound for `int` validation.
    #[serde(default)]
    pub min_int: Option<Value>,
    /// Upper bound for `int` validation.
    #[serde(default)]
    pub max_int: Option<Value>,
    /// Lower bound for `float` validation.
    #[serde(default)]
    pub min_float: Option<Value>,
    /// Upper bound for `float` validation.
    #[serde(default)]
    pub max_float: Option<Value>,
}

impl TextOptions {
    /// Returns `(min, max)` bounds for a numeric validation kind.
    #[must_use]
    pub fn bounds(&self, kind: &str) -> (Option<&Value>, Option<&Value>) {
        match kind {
            "int" => (self.min_int.as_ref(), self.max_int.as_ref()),
            "float" => (self.min_float.as_ref(), self.max_float.as_ref()),
            _ => (None, None),
        }
    }
}

/// Options for `dropdown` fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DropdownOptions {
    /// Choices in display order.
    #[serde(default)]
    pub options: Vec<DropdownOption>,
}

/// One dropdown choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DropdownOption {
    /// Value passed to the app.
    #[serde(default)]
    pub value: String,
    /// Label shown to the user.
    #[serde(default)]
    pub display: String,
}

/// A group of parameters filled in together.
///
/// Values for a group arrive nested under the group id: one map of member
/// values, or a list of such maps when `allow_multiple` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParamGroupSpec {
    /// Group id.
    #[serde(default)]
    pub id: String,
    /// Member parameter ids.
    #[serde(default)]
    pub parameter_ids: Vec<String>,
    /// Display name.
    #[serde(default)]
    pub ui_name: String,
    /// One-line hint.
    #[serde(default)]
    pub short_hint: String,
    /// Whether the group may be omitted.
    #[serde(default, deserialize_with = "flag")]
    pub optional: bool,
    /// Whether the group accepts a list of member maps.
    #[serde(default, deserialize_with = "flag")]
    pub allow_multiple: bool,
    /// Renames member ids when passed to the service.
    #[serde(default)]
    pub id_mapping: Option<BTreeMap<String, String>>,
}

// ============================================================================
// SECTION: Behavior
// ============================================================================

/// Backing service description.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Behavior {
    /// Service module name.
    #[serde(default)]
    pub kb_service_name: Option<String>,
    /// Service method.
    #[serde(default)]
    pub kb_service_method: Option<String>,
    /// Service version.
    #[serde(default)]
    pub kb_service_version: Option<String>,
    /// How app inputs become service arguments.
    #[serde(default)]
    pub kb_service_input_mapping: Vec<InputMapping>,
}

/// One input mapping rule.
///
/// Exactly one value source is expected; when several are present the first
/// of `constant_value`, `narrative_system_variable`, `input_parameter`,
/// `generated_value` wins.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct InputMapping {
    /// App parameter or group id.
    #[serde(default)]
    pub input_parameter: Option<String>,
    /// Literal value. An explicit `null` is kept as `Some(Value::Null)`.
    #[serde(default, deserialize_with = "present_value", skip_serializing_if = "Option::is_none")]
    pub constant_value: Option<Value>,
    /// Narrative system variable name.
    #[serde(default)]
    pub narrative_system_variable: Option<String>,
    /// Random string generator options.
    #[serde(default)]
    pub generated_value: Option<serde_json::Map<String, Value>>,
    /// Positional argument index.
    #[serde(default)]
    pub target_argument_position: Option<usize>,
    /// Property of the positional argument to set.
    #[serde(default)]
    pub target_property: Option<String>,
    /// Value transform applied before placement.
    #[serde(default)]
    pub target_type_transform: Option<String>,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Deserializes a flag encoded as a boolean, `0`/`1`, or null.
///
/// # Errors
///
/// Returns a deserialization error for any other JSON value.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(value) => Ok(value),
        Value::Number(number) => Ok(number.as_f64().is_some_and(|value| value.abs() > f64::EPSILON)),
        other => Err(serde::de::Error::custom(format!("expected a 0/1 flag, found {other}"))),
    }
}

/// Deserializes a field that is present in the input, `null` included.
///
/// Paired with `#[serde(default)]` so only an absent field becomes `None`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
