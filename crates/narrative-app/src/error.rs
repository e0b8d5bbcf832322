// crates/narrative-app/src/error.rs
// ============================================================================
// Module: App Helper Errors
// Description: Errors raised while validating, resolving, and mapping app inputs.
// Purpose: Keep malformed input distinct from remote service failures.
// Dependencies: narrative-kbase, thiserror
// ============================================================================

//! ## Overview
//! [`AppError::Value`] covers inputs the helpers cannot interpret (bad
//! references, unsupported transforms, malformed generators). Everything a
//! KBase service reports, including references that do not resolve, arrives
//! as [`AppError::Service`].

use narrative_kbase::ServiceError;
use thiserror::Error;

/// App helper errors.
///
/// # Invariants
/// - `Value` messages are user-facing and name the offending input.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or unsupported input value.
    #[error("{0}")]
    Value(String),
    /// Failure reported by a KBase service or its transport.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl AppError {
    /// Returns true when a KBase service reported the failure.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Service(err) => err.is_server_error(),
            Self::Value(_) => false,
        }
    }
}

/// Reference parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefError {
    /// The input is not a `ws/obj/ver` triple of numeric ids.
    #[error("'{0}' is not a valid UPA (expected ws_id/obj_id/version)")]
    InvalidUpa(String),
}

impl From<RefError> for AppError {
    fn from(error: RefError) -> Self {
        Self::Value(error.to_string())
    }
}
