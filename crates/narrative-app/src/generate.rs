// crates/narrative-app/src/generate.rs
// ============================================================================
// Module: Generated Inputs
// Description: Random string values for generated app inputs.
// Purpose: Fill `generated_value` mappings with unique-ish names.
// Dependencies: rand, serde_json
// ============================================================================

//! ## Overview
//! A generator is a small JSON map: `symbols` (number of random alphanumeric
//! characters, default 8, at most [`MAX_SYMBOLS`]), plus optional `prefix`
//! and `suffix` strings.

use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use serde_json::Map;
use serde_json::Value;

use crate::error::AppError;

/// Random characters produced when a generator does not say.
pub const DEFAULT_SYMBOLS: usize = 8;

/// Largest `symbols` count a generator may request.
pub const MAX_SYMBOLS: usize = 1024;

/// Generates `prefix` + random alphanumerics + `suffix`.
///
/// # Errors
///
/// Returns [`AppError::Value`] when `symbols` is not a positive integer no
/// larger than [`MAX_SYMBOLS`] or `prefix`/`suffix` are not strings.
pub fn generate_input(generator: Option<&Map<String, Value>>) -> Result<String, AppError> {
    let empty = Map::new();
    let generator = generator.unwrap_or(&empty);
    let symbols = match generator.get("symbols") {
        None | Some(Value::Null) => DEFAULT_SYMBOLS,
        Some(value) => value
            .as_u64()
            .filter(|count| *count > 0)
            .and_then(|count| usize::try_from(count).ok())
            .ok_or_else(|| {
                AppError::Value(format!(
                    "Can't generate input: symbols must be a positive integer, got {value}"
                ))
            })
            .and_then(|count| {
                if count > MAX_SYMBOLS {
                    Err(AppError::Value(format!(
                        "Can't generate input: symbols must be at most {MAX_SYMBOLS}, got {count}"
                    )))
                } else {
                    Ok(count)
                }
            })?,
    };
    let prefix = affix(generator, "prefix")?;
    let suffix = affix(generator, "suffix")?;
    let random: String = OsRng.sample_iter(&Alphanumeric).take(symbols).map(char::from).collect();
    Ok(format!("{prefix}{random}{suffix}"))
}

/// Reads an optional string field.
fn affix<'a>(generator: &'a Map<String, Value>, key: &str) -> Result<&'a str, AppError> {
    match generator.get(key) {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(text)) => Ok(text),
        Some(other) => {
            Err(AppError::Value(format!("Can't generate input: {key} must be a string, got {other}")))
        }
    }
}
