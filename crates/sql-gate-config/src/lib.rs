// crates/sql-gate-config/src/lib.rs
// ============================================================================
// Module: SQL Gate Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for sql-gate.toml semantics.
// Dependencies: sql-gate-core, sql-gate-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `sql-gate-config` defines the configuration model for SQL Gate: transport
//! settings, gateway pipeline knobs, audit sinks, per-environment profile
//! overrides, review rule options, and the execution collaborator. Validation
//! is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
