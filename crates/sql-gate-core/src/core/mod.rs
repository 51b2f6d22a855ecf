// crates/sql-gate-core/src/core/mod.rs
// ============================================================================
// Module: SQL Gate Core Types
// Description: Canonical request, profile, review, and envelope structures.
// Purpose: Provide stable, serializable types shared by every SQL Gate crate.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types define what a query request looks like, the limits applied to
//! each environment, the analyzer's review output, and the envelope returned
//! to callers. These types are the source of truth for the tool surface.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod envelope;
pub mod environment;
pub mod identifiers;
pub mod request;
pub mod review;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use envelope::CostDiagnostics;
pub use envelope::EnvelopeWarning;
pub use envelope::ErrorCategory;
pub use envelope::PageInfo;
pub use envelope::ResultEnvelope;
pub use envelope::TruncationFlags;
pub use envelope::WarningCode;
pub use environment::Environment;
pub use environment::EnvironmentProfile;
pub use environment::ProfileTable;
pub use environment::ResourceHints;
pub use environment::UnknownEnvironment;
pub use identifiers::CallerId;
pub use identifiers::DEFAULT_CALLER;
pub use identifiers::RequestId;
pub use identifiers::RuleId;
pub use request::QueryRequest;
pub use review::Finding;
pub use review::MAX_RISK_SCORE;
pub use review::ReviewResult;
pub use review::ReviewStatus;
pub use review::RuleCategory;
pub use review::Severity;
