// crates/narrative-config/src/lib.rs
// ============================================================================
// Module: Narrative Config Library
// Description: Canonical config model and validation for the KBase client.
// Purpose: Single source of truth for narrative-agent.toml semantics.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `narrative-config` defines the configuration model shared by the KBase
//! service clients and the `narrative-agent` CLI. It provides strict,
//! fail-closed validation of endpoints, client limits, token lookup, and
//! audit destinations.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
