// crates/sql-gate-core/src/core/environment.rs
// ============================================================================
// Module: SQL Gate Environments
// Description: Deployment environments and their resource profiles.
// Purpose: Provide the closed environment set and per-environment limits.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every query targets exactly one [`Environment`]. Each environment carries an
//! [`EnvironmentProfile`] with the limits the gateway enforces: concurrency,
//! query length, row and payload caps, the cost threshold, the command timeout,
//! and the resource hints attached to admitted queries.
//!
//! [`ProfileTable`] holds one profile per environment and is total by
//! construction, so lookups never fail.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default total concurrent queries per environment.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;
/// Default concurrent queries per caller within an environment.
pub const DEFAULT_MAX_CONCURRENCY_PER_CALLER: usize = 2;
/// Default maximum query length in characters.
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 10_000;
/// Default maximum rows returned per query.
pub const DEFAULT_MAX_RESULT_ROWS: usize = 1_000;
/// Default maximum serialized payload size in bytes.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;
/// Default maximum text field size in bytes.
pub const DEFAULT_MAX_FIELD_BYTES: usize = 1_000;
/// Default parallelism cap.
pub const DEFAULT_MAX_DOP: u16 = 1;
/// Default memory grant percent.
pub const DEFAULT_MAX_GRANT_PERCENT: u8 = 10;

// ============================================================================
// SECTION: Environment
// ============================================================================

/// Deployment environment targeted by a query.
///
/// # Invariants
/// - The set is closed; string forms are `Int`, `Stg`, and `Prd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Environment {
    /// Integration environment.
    #[serde(alias = "int", alias = "INT")]
    Int,
    /// Staging environment.
    #[serde(alias = "stg", alias = "STG")]
    Stg,
    /// Production environment.
    #[serde(alias = "prd", alias = "PRD")]
    Prd,
}

impl Environment {
    /// All environments in declaration order.
    pub const ALL: [Self; 3] = [Self::Int, Self::Stg, Self::Prd];

    /// Returns the stable label for the environment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int => "Int",
            Self::Stg => "Stg",
            Self::Prd => "Prd",
        }
    }

    /// Returns true for the production environment.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Prd)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown environment label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown environment: {0}")]
pub struct UnknownEnvironment(pub String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownEnvironment(value.to_string()))
    }
}

// ============================================================================
// SECTION: Profiles
// ============================================================================

/// Engine resource hints attached to admitted queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHints {
    /// Maximum degree of parallelism.
    pub max_dop: u16,
    /// Maximum memory grant as a percentage of the pool.
    pub max_grant_percent: u8,
    /// Read without taking shared locks.
    pub read_uncommitted: bool,
}

/// Limits enforced for one environment.
///
/// # Invariants
/// - Read-only after configuration load.
/// - `read_uncommitted` in `hints` is only honored for [`Environment::Prd`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentProfile {
    /// Environment this profile applies to.
    pub environment: Environment,
    /// Total concurrent queries allowed.
    pub max_concurrency: usize,
    /// Concurrent queries allowed per caller.
    pub max_concurrency_per_caller: usize,
    /// Maximum query length in characters.
    pub max_query_length: usize,
    /// Maximum rows returned.
    pub max_result_rows: usize,
    /// Maximum serialized payload size in bytes.
    pub max_payload_bytes: usize,
    /// Maximum size of a single text field in bytes.
    pub max_field_bytes: usize,
    /// Maximum admitted plan cost.
    pub cost_threshold: f64,
    /// Execution timeout.
    #[serde(with = "duration_ms")]
    pub command_timeout: Duration,
    /// Resource hints for admitted queries.
    pub hints: ResourceHints,
}

impl EnvironmentProfile {
    /// Returns the built-in profile for an environment.
    #[must_use]
    pub const fn baseline(environment: Environment) -> Self {
        let (cost_threshold, timeout_secs, read_uncommitted) = match environment {
            Environment::Int => (50.0, 60, false),
            Environment::Stg => (25.0, 60, false),
            Environment::Prd => (10.0, 30, true),
        };
        Self {
            environment,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_concurrency_per_caller: DEFAULT_MAX_CONCURRENCY_PER_CALLER,
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
            max_result_rows: DEFAULT_MAX_RESULT_ROWS,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_field_bytes: DEFAULT_MAX_FIELD_BYTES,
            cost_threshold,
            command_timeout: Duration::from_secs(timeout_secs),
            hints: ResourceHints {
                max_dop: DEFAULT_MAX_DOP,
                max_grant_percent: DEFAULT_MAX_GRANT_PERCENT,
                read_uncommitted,
            },
        }
    }

    /// Returns the hints to apply, dropping read-uncommitted outside production.
    #[must_use]
    pub const fn effective_hints(&self) -> ResourceHints {
        ResourceHints {
            max_dop: self.hints.max_dop,
            max_grant_percent: self.hints.max_grant_percent,
            read_uncommitted: self.hints.read_uncommitted && self.environment.is_production(),
        }
    }
}

/// One profile per environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileTable {
    /// Integration profile.
    int: EnvironmentProfile,
    /// Staging profile.
    stg: EnvironmentProfile,
    /// Production profile.
    prd: EnvironmentProfile,
}

impl ProfileTable {
    /// Builds a table from explicit profiles.
    ///
    /// Each profile's `environment` field is overwritten with its slot so the
    /// table stays consistent.
    #[must_use]
    pub fn new(
        mut int: EnvironmentProfile,
        mut stg: EnvironmentProfile,
        mut prd: EnvironmentProfile,
    ) -> Self {
        int.environment = Environment::Int;
        stg.environment = Environment::Stg;
        prd.environment = Environment::Prd;
        Self {
            int,
            stg,
            prd,
        }
    }

    /// Returns the profile for an environment.
    #[must_use]
    pub const fn get(&self, environment: Environment) -> &EnvironmentProfile {
        match environment {
            Environment::Int => &self.int,
            Environment::Stg => &self.stg,
            Environment::Prd => &self.prd,
        }
    }

    /// Returns a mutable profile for an environment.
    pub const fn get_mut(&mut self, environment: Environment) -> &mut EnvironmentProfile {
        match environment {
            Environment::Int => &mut self.int,
            Environment::Stg => &mut self.stg,
            Environment::Prd => &mut self.prd,
        }
    }

    /// Iterates profiles in environment order.
    pub fn iter(&self) -> impl Iterator<Item = &EnvironmentProfile> {
        [&self.int, &self.stg, &self.prd].into_iter()
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::new(
            EnvironmentProfile::baseline(Environment::Int),
            EnvironmentProfile::baseline(Environment::Stg),
            EnvironmentProfile::baseline(Environment::Prd),
        )
    }
}

/// Serializes durations as integer milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    /// Serializes a duration as milliseconds.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::Environment;
    use super::EnvironmentProfile;
    use super::ProfileTable;

    #[test]
    fn environment_parses_case_insensitively() {
        assert_eq!("prd".parse::<Environment>(), Ok(Environment::Prd));
        assert_eq!(" Stg ".parse::<Environment>(), Ok(Environment::Stg));
        assert!("dev".parse::<Environment>().is_err());
    }

    #[test]
    fn read_uncommitted_only_applies_in_production() {
        let mut stg = EnvironmentProfile::baseline(Environment::Stg);
        stg.hints.read_uncommitted = true;
        assert!(!stg.effective_hints().read_uncommitted);
        let prd = EnvironmentProfile::baseline(Environment::Prd);
        assert!(prd.effective_hints().read_uncommitted);
    }

    #[test]
    fn profile_table_pins_environment_slots() {
        let table = ProfileTable::new(
            EnvironmentProfile::baseline(Environment::Prd),
            EnvironmentProfile::baseline(Environment::Prd),
            EnvironmentProfile::baseline(Environment::Prd),
        );
        for env in Environment::ALL {
            assert_eq!(table.get(env).environment, env);
        }
    }
}
