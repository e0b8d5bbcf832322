// crates/narrative-app/src/lib.rs
// ============================================================================
// Module: Narrative App Helpers
// Description: Reference handling and parameter processing for KBase apps.
// Purpose: Translate declarative app specs into concrete service arguments.
// Dependencies: narrative-kbase, rand, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Pure helpers around KBase app specs. Validation is syntactic; anything
//! that needs the Workspace is written against
//! [`narrative_kbase::WorkspaceAccess`] so tests can supply an in-memory
//! store.
//! Invariants:
//! - Resolved references are always UPAs reported by the Workspace.
//! - Malformed input surfaces as [`AppError::Value`]; remote failures as
//!   [`AppError::Service`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod generate;
pub mod mapping;
pub mod params;
pub mod resolve;
pub mod spec;
pub mod sysvar;
pub mod transform;
pub mod upa;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::AppError;
pub use error::RefError;
pub use generate::generate_input;
pub use mapping::build_service_inputs;
pub use params::ProcessedParam;
pub use params::get_processed_app_spec_params;
pub use params::get_ws_object_refs;
pub use params::process_param_type;
pub use resolve::resolve_ref;
pub use resolve::resolve_ref_if_typed;
pub use resolve::resolve_single_ref;
pub use spec::AppSpec;
pub use spec::ParamSpec;
pub use sysvar::system_variable;
pub use transform::transform_param_value;
pub use upa::Upa;
pub use upa::is_valid_ref;
pub use upa::is_valid_upa;
pub use upa::json_is_ref;
pub use upa::json_is_upa;
