// crates/narrative-app/src/mapping.rs
// ============================================================================
// Module: Service Input Mapping
// Description: Build positional service arguments from app inputs.
// Purpose: Apply an app spec's `kb_service_input_mapping` to a parameter set.
// Dependencies: narrative-kbase, serde_json
// ============================================================================

//! ## Overview
//! Each mapping rule takes one value (a constant, a system variable, an app
//! parameter or group, or a generated string), optionally transforms it, and
//! writes it into the positional argument list: either as the whole argument
//! or as one property of an argument object.
//!
//! Input objects are resolved to UPAs when the rule has no transform of its
//! own; with a transform, the transform decides (`resolved-ref` resolves,
//! `ref` only qualifies). Group members are always resolved and renamed by
//! the group's `id_mapping`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use narrative_kbase::WorkspaceAccess;
use serde_json::Map;
use serde_json::Value;

use crate::error::AppError;
use crate::generate::generate_input;
use crate::params::ProcessedParam;
use crate::params::get_processed_app_spec_params;
use crate::params::group_entries;
use crate::resolve::resolve_ref_if_typed;
use crate::spec::AppSpec;
use crate::spec::InputMapping;
use crate::spec::ParamGroupSpec;
use crate::sysvar::system_variable;
use crate::transform::transform_param_value;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Highest accepted `target_argument_position`.
pub const MAX_ARGUMENT_POSITION: usize = 255;

// ============================================================================
// SECTION: Context
// ============================================================================

/// Shared inputs for one mapping pass.
struct MappingContext<'a, W: ?Sized> {
    /// App spec being mapped.
    spec: &'a AppSpec,
    /// Processed parameters keyed by id.
    processed: BTreeMap<String, ProcessedParam>,
    /// User-supplied values.
    params: &'a Map<String, Value>,
    /// Current workspace id.
    ws_id: u64,
    /// Workspace used for resolution and lookups.
    ws: &'a W,
    /// Authenticated user, if known.
    user: Option<&'a str>,
}

// ============================================================================
// SECTION: Mapping
// ============================================================================

/// Builds the positional argument list for the app's backing service.
///
/// Unset positions below the highest used one are null.
///
/// # Errors
///
/// Returns [`AppError::Value`] for rules without a value source, unknown
/// parameters, invalid positions, or failed transforms, and
/// [`AppError::Service`] when a Workspace lookup fails.
pub fn build_service_inputs<W>(
    spec: &AppSpec,
    params: &Map<String, Value>,
    ws_id: u64,
    ws: &W,
    user: Option<&str>,
) -> Result<Vec<Value>, AppError>
where
    W: WorkspaceAccess + ?Sized,
{
    let context = MappingContext {
        spec,
        processed: get_processed_app_spec_params(spec),
        params,
        ws_id,
        ws,
        user,
    };
    let mut args = Vec::new();
    for rule in &spec.behavior.kb_service_input_mapping {
        let (value, spec_param) = context.source_value(rule)?;
        let value = transform_param_value(
            rule.target_type_transform.as_deref(),
            &value,
            spec_param,
            ws_id,
            ws,
        )?;
        place_argument(
            &mut args,
            rule.target_argument_position.unwrap_or(0),
            rule.target_property.as_deref(),
            value,
        )?;
    }
    Ok(args)
}

impl<W> MappingContext<'_, W>
where
    W: WorkspaceAccess + ?Sized,
{
    /// Produces the untransformed value of a rule and the parameter it came from.
    fn source_value(&self, rule: &InputMapping) -> Result<(Value, Option<&ProcessedParam>), AppError> {
        if let Some(constant) = &rule.constant_value {
            return Ok((constant.clone(), None));
        }
        if let Some(name) = &rule.narrative_system_variable {
            let value = system_variable(name, self.ws_id, self.ws, self.user)?;
            return Ok((value.unwrap_or(Value::Null), None));
        }
        if let Some(id) = &rule.input_parameter {
            if let Some(param) = self.processed.get(id) {
                let value =
                    self.params.get(id).cloned().unwrap_or_else(|| param.default_value.clone());
                let value = if rule.target_type_transform.is_none() {
                    resolve_ref_if_typed(&value, param, self.ws_id, self.ws)?
                } else {
                    value
                };
                return Ok((value, Some(param)));
            }
            if let Some(group) = self.spec.parameter_group(id) {
                return Ok((self.group_value(group)?, None));
            }
            return Err(AppError::Value(format!("input mapping names unknown parameter {id}")));
        }
        if let Some(generator) = &rule.generated_value {
            return Ok((Value::String(generate_input(Some(generator))?), None));
        }
        Err(AppError::Value("input mapping has no value source".to_string()))
    }

    /// Resolves and renames the members of a parameter group value.
    fn group_value(&self, group: &ParamGroupSpec) -> Result<Value, AppError> {
        let Some(value) = self.params.get(&group.id) else {
            return Ok(Value::Null);
        };
        let entries = group_entries(value)
            .into_iter()
            .map(|members| self.group_entry(group, members))
            .collect::<Result<Vec<_>, _>>()?;
        if value.is_array() {
            Ok(Value::Array(entries))
        } else {
            Ok(entries.into_iter().next().unwrap_or(Value::Null))
        }
    }

    /// Maps one set of group member values.
    fn group_entry(
        &self,
        group: &ParamGroupSpec,
        members: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        let mut mapped = Map::new();
        for (member, value) in members {
            let value = match self.processed.get(member) {
                Some(param) => resolve_ref_if_typed(value, param, self.ws_id, self.ws)?,
                None => value.clone(),
            };
            let key = group
                .id_mapping
                .as_ref()
                .and_then(|mapping| mapping.get(member))
                .unwrap_or(member);
            mapped.insert(key.clone(), value);
        }
        Ok(Value::Object(mapped))
    }
}

/// Writes `value` at `position`, as a property of that argument when given.
fn place_argument(
    args: &mut Vec<Value>,
    position: usize,
    property: Option<&str>,
    value: Value,
) -> Result<(), AppError> {
    if position > MAX_ARGUMENT_POSITION {
        return Err(AppError::Value(format!(
            "target_argument_position {position} exceeds {MAX_ARGUMENT_POSITION}"
        )));
    }
    if args.len() <= position {
        args.resize(position + 1, Value::Null);
    }
    let slot = &mut args[position];
    let Some(property) = property else {
        *slot = value;
        return Ok(());
    };
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => {
            map.insert(property.to_string(), value);
            Ok(())
        }
        _ => Err(AppError::Value(format!(
            "argument {position} is not an object; cannot set {property}"
        ))),
    }
}
