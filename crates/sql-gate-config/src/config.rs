// crates/sql-gate-config/src/config.rs
// ============================================================================
// Module: SQL Gate Configuration
// Description: Configuration loading and validation for SQL Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: sql-gate-core, sql-gate-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Environment sections override the built-in profiles field by field; every
//! resulting profile is range-checked. Missing or invalid configuration fails
//! closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use sql_gate_core::DatabasePolicy;
use sql_gate_core::Environment;
use sql_gate_core::EnvironmentProfile;
use sql_gate_core::HintDialect;
use sql_gate_core::ProfileTable;
use sql_gate_core::QuoteStyle;
use sql_gate_core::RuleRegistry;
use sql_gate_core::Severity;
use sql_gate_core::sql::DEFAULT_MAX_IDENTIFIER_LENGTH;
use sql_gate_sqlite::SqliteExecutorConfig;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "sql-gate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "SQL_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum request body size accepted by the HTTP transport.
pub(crate) const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
/// Maximum allow-listed databases.
pub(crate) const MAX_ALLOWED_DATABASES: usize = 256;
/// Maximum identifier length accepted by configuration.
pub(crate) const MAX_IDENTIFIER_LENGTH: usize = 1_024;
/// Maximum throttle queue wait in milliseconds.
pub(crate) const MAX_QUEUE_WAIT_MS: u64 = 60_000;
/// Minimum cost check timeout in milliseconds.
pub(crate) const MIN_COST_CHECK_TIMEOUT_MS: u64 = 100;
/// Maximum cost check timeout in milliseconds.
pub(crate) const MAX_COST_CHECK_TIMEOUT_MS: u64 = 60_000;
/// Maximum rows requested from the executor per batch.
pub(crate) const MAX_FETCH_BATCH_SIZE: usize = 10_000;
/// Maximum audited query or detail length in characters.
pub(crate) const MAX_AUDIT_TEXT_CHARS: usize = 65_536;
/// Maximum concurrent queries per environment.
pub(crate) const MAX_CONCURRENCY: usize = 1_024;
/// Maximum query length in characters.
pub(crate) const MAX_QUERY_LENGTH: usize = 1_000_000;
/// Maximum rows returned per query.
pub(crate) const MAX_RESULT_ROWS: usize = 100_000;
/// Minimum payload cap in bytes.
pub(crate) const MIN_PAYLOAD_BYTES: usize = 1_024;
/// Maximum payload cap in bytes.
pub(crate) const MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;
/// Minimum per-field cap in bytes.
pub(crate) const MIN_FIELD_BYTES: usize = 16;
/// Minimum command timeout in milliseconds.
pub(crate) const MIN_COMMAND_TIMEOUT_MS: u64 = 1_000;
/// Maximum command timeout in milliseconds.
pub(crate) const MAX_COMMAND_TIMEOUT_MS: u64 = 600_000;
/// Maximum degree of parallelism hint.
pub(crate) const MAX_DOP: u16 = 64;
/// Maximum busy timeout for executor connections.
pub(crate) const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// SQL Gate configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SqlGateConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Gateway pipeline configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Audit log configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Per-environment profile overrides.
    #[serde(default)]
    pub environments: EnvironmentsConfig,
    /// Review rule configuration.
    #[serde(default)]
    pub rules: RulesConfig,
    /// Execution collaborator configuration.
    #[serde(default)]
    pub executor: ExecutorConfig,
}

impl SqlGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.gateway.validate()?;
        self.audit.validate()?;
        for profile in self.profiles().iter() {
            validate_profile(profile)?;
        }
        self.rule_registry()?;
        self.executor.validate()?;
        if self.executor.executor_type == ExecutorType::Sqlite
            && self.gateway.hint_dialect == HintDialect::Tsql
        {
            return Err(ConfigError::Invalid(
                "gateway.hint_dialect tsql is not supported by the sqlite executor".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the effective profile table: built-in baselines with overrides.
    #[must_use]
    pub fn profiles(&self) -> ProfileTable {
        let mut table = ProfileTable::default();
        for environment in Environment::ALL {
            if let Some(overrides) = self.environments.get(environment) {
                overrides.apply(table.get_mut(environment));
            }
        }
        table
    }

    /// Builds the review rule registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a rule id is unknown.
    pub fn rule_registry(&self) -> Result<RuleRegistry, ConfigError> {
        RuleRegistry::configured(&self.rules.disabled, &self.rules.severity_overrides)
            .map_err(|err| ConfigError::Invalid(format!("rules: {err}")))
    }

    /// Returns the database allow-list policy.
    #[must_use]
    pub fn database_policy(&self) -> DatabasePolicy {
        DatabasePolicy::new(&self.gateway.allowed_databases)
    }
}

/// Server transport types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// JSON-RPC over stdin/stdout with Content-Length framing.
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST.
    Http,
}

/// Server configuration for tool transports.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Transport type.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for the HTTP transport.
    #[serde(default)]
    pub bind: Option<String>,
    /// Allow binding to non-loopback addresses (explicit opt-in).
    #[serde(default)]
    pub allow_non_loopback: bool,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: None,
            allow_non_loopback: false,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES}"
            )));
        }
        match self.transport {
            ServerTransport::Http => {
                let addr = self.bind_addr()?;
                if !addr.ip().is_loopback() && !self.allow_non_loopback {
                    return Err(ConfigError::Invalid(
                        "non-loopback bind disallowed without allow_non_loopback".to_string(),
                    ));
                }
            }
            ServerTransport::Stdio => {
                if self.bind.is_some() {
                    return Err(ConfigError::Invalid(
                        "stdio transport does not use a bind address".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Parses the HTTP bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the address is missing or malformed.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let bind = self.bind.as_deref().unwrap_or_default().trim();
        if bind.is_empty() {
            return Err(ConfigError::Invalid("http transport requires bind address".to_string()));
        }
        bind.parse().map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }
}

/// Behavior when no concurrency slot is free.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleMode {
    /// Fail immediately.
    #[default]
    Reject,
    /// Wait up to `queue_wait_ms` for a slot.
    Queue,
}

/// Gateway pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Dialect used to render resource hints into query text.
    #[serde(default)]
    pub hint_dialect: HintDialect,
    /// Throttle behavior when saturated.
    #[serde(default)]
    pub throttle_mode: ThrottleMode,
    /// Maximum wait for a slot in queue mode.
    #[serde(default = "default_queue_wait_ms")]
    pub queue_wait_ms: u64,
    /// Deadline for the plan-cost estimate.
    #[serde(default = "default_cost_check_timeout_ms")]
    pub cost_check_timeout_ms: u64,
    /// Rows requested from the executor per batch.
    #[serde(default = "default_fetch_batch_size")]
    pub fetch_batch_size: usize,
    /// Databases callers may target; empty allows any.
    #[serde(default)]
    pub allowed_databases: Vec<String>,
    /// Quoting applied to database identifiers.
    #[serde(default = "default_identifier_quote")]
    pub identifier_quote: QuoteStyle,
    /// Maximum identifier length.
    #[serde(default = "default_max_identifier_length")]
    pub max_identifier_length: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            hint_dialect: HintDialect::default(),
            throttle_mode: ThrottleMode::default(),
            queue_wait_ms: default_queue_wait_ms(),
            cost_check_timeout_ms: default_cost_check_timeout_ms(),
            fetch_batch_size: default_fetch_batch_size(),
            allowed_databases: Vec::new(),
            identifier_quote: default_identifier_quote(),
            max_identifier_length: default_max_identifier_length(),
        }
    }
}

impl GatewayConfig {
    /// Validates gateway configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_wait_ms == 0 || self.queue_wait_ms > MAX_QUEUE_WAIT_MS {
            return Err(ConfigError::Invalid(format!(
                "gateway.queue_wait_ms must be between 1 and {MAX_QUEUE_WAIT_MS}"
            )));
        }
        if !(MIN_COST_CHECK_TIMEOUT_MS..=MAX_COST_CHECK_TIMEOUT_MS)
            .contains(&self.cost_check_timeout_ms)
        {
            return Err(ConfigError::Invalid(format!(
                "gateway.cost_check_timeout_ms must be between {MIN_COST_CHECK_TIMEOUT_MS} and \
                 {MAX_COST_CHECK_TIMEOUT_MS}"
            )));
        }
        if self.fetch_batch_size == 0 || self.fetch_batch_size > MAX_FETCH_BATCH_SIZE {
            return Err(ConfigError::Invalid(format!(
                "gateway.fetch_batch_size must be between 1 and {MAX_FETCH_BATCH_SIZE}"
            )));
        }
        if self.max_identifier_length == 0 || self.max_identifier_length > MAX_IDENTIFIER_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "gateway.max_identifier_length must be between 1 and {MAX_IDENTIFIER_LENGTH}"
            )));
        }
        if self.allowed_databases.len() > MAX_ALLOWED_DATABASES {
            return Err(ConfigError::Invalid(format!(
                "gateway.allowed_databases exceeds {MAX_ALLOWED_DATABASES} entries"
            )));
        }
        for name in &self.allowed_databases {
            let valid = !name.is_empty()
                && name.len() <= self.max_identifier_length
                && name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
            if !valid {
                return Err(ConfigError::Invalid(format!(
                    "gateway.allowed_databases entry is not a plain identifier: {name}"
                )));
            }
        }
        Ok(())
    }

    /// Returns the queue wait as a duration.
    #[must_use]
    pub const fn queue_wait(&self) -> Duration {
        Duration::from_millis(self.queue_wait_ms)
    }

    /// Returns the cost check timeout as a duration.
    #[must_use]
    pub const fn cost_check_timeout(&self) -> Duration {
        Duration::from_millis(self.cost_check_timeout_ms)
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Daily JSON lines files under `directory`.
    #[default]
    File,
    /// JSON lines on stderr.
    Stderr,
    /// Discard records.
    None,
}

/// Audit log configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Sink receiving audit records.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Directory for daily audit files.
    #[serde(default = "default_audit_directory")]
    pub directory: PathBuf,
    /// Maximum redacted query length in characters.
    #[serde(default = "default_audit_max_query_chars")]
    pub max_query_chars: usize,
    /// Maximum redacted error detail length in characters.
    #[serde(default = "default_audit_max_detail_chars")]
    pub max_detail_chars: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            sink: AuditSinkKind::default(),
            directory: default_audit_directory(),
            max_query_chars: default_audit_max_query_chars(),
            max_detail_chars: default_audit_max_detail_chars(),
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.sink == AuditSinkKind::File {
            validate_path_string("audit.directory", &self.directory.to_string_lossy())?;
        }
        for (field, value) in [
            ("audit.max_query_chars", self.max_query_chars),
            ("audit.max_detail_chars", self.max_detail_chars),
        ] {
            if value == 0 || value > MAX_AUDIT_TEXT_CHARS {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be between 1 and {MAX_AUDIT_TEXT_CHARS}"
                )));
            }
        }
        Ok(())
    }
}

/// Per-environment overrides keyed by environment label.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentsConfig {
    /// Integration overrides.
    #[serde(default, rename = "Int", alias = "int")]
    pub int: Option<EnvironmentOverrides>,
    /// Staging overrides.
    #[serde(default, rename = "Stg", alias = "stg")]
    pub stg: Option<EnvironmentOverrides>,
    /// Production overrides.
    #[serde(default, rename = "Prd", alias = "prd")]
    pub prd: Option<EnvironmentOverrides>,
}

impl EnvironmentsConfig {
    /// Returns the overrides for an environment.
    #[must_use]
    pub const fn get(&self, environment: Environment) -> Option<&EnvironmentOverrides> {
        match environment {
            Environment::Int => self.int.as_ref(),
            Environment::Stg => self.stg.as_ref(),
            Environment::Prd => self.prd.as_ref(),
        }
    }
}

/// Field-by-field overrides of a built-in environment profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentOverrides {
    /// Total concurrent queries.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    /// Concurrent queries per caller.
    #[serde(default)]
    pub max_concurrency_per_caller: Option<usize>,
    /// Maximum query length in characters.
    #[serde(default)]
    pub max_query_length: Option<usize>,
    /// Maximum rows returned.
    #[serde(default)]
    pub max_result_rows: Option<usize>,
    /// Maximum payload size in bytes.
    #[serde(default)]
    pub max_payload_bytes: Option<usize>,
    /// Maximum text field size in bytes.
    #[serde(default)]
    pub max_field_bytes: Option<usize>,
    /// Maximum admitted plan cost.
    #[serde(default)]
    pub cost_threshold: Option<f64>,
    /// Execution timeout in milliseconds.
    #[serde(default)]
    pub command_timeout_ms: Option<u64>,
    /// Maximum degree of parallelism.
    #[serde(default)]
    pub max_dop: Option<u16>,
    /// Maximum memory grant percent.
    #[serde(default)]
    pub max_grant_percent: Option<u8>,
    /// Read without shared locks (production only).
    #[serde(default)]
    pub read_uncommitted: Option<bool>,
}

impl EnvironmentOverrides {
    /// Applies the overrides to a profile.
    pub fn apply(&self, profile: &mut EnvironmentProfile) {
        if let Some(value) = self.max_concurrency {
            profile.max_concurrency = value;
        }
        if let Some(value) = self.max_concurrency_per_caller {
            profile.max_concurrency_per_caller = value;
        }
        if let Some(value) = self.max_query_length {
            profile.max_query_length = value;
        }
        if let Some(value) = self.max_result_rows {
            profile.max_result_rows = value;
        }
        if let Some(value) = self.max_payload_bytes {
            profile.max_payload_bytes = value;
        }
        if let Some(value) = self.max_field_bytes {
            profile.max_field_bytes = value;
        }
        if let Some(value) = self.cost_threshold {
            profile.cost_threshold = value;
        }
        if let Some(value) = self.command_timeout_ms {
            profile.command_timeout = Duration::from_millis(value);
        }
        if let Some(value) = self.max_dop {
            profile.hints.max_dop = value;
        }
        if let Some(value) = self.max_grant_percent {
            profile.hints.max_grant_percent = value;
        }
        if let Some(value) = self.read_uncommitted {
            profile.hints.read_uncommitted = value;
        }
    }
}

/// Review rule configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesConfig {
    /// Rule ids removed from the registry.
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Severity overrides by rule id.
    #[serde(default)]
    pub severity_overrides: BTreeMap<String, Severity>,
}

/// Execution collaborator types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorType {
    /// No executor; query execution reports the collaborator as unavailable.
    #[default]
    None,
    /// Read-only `SQLite` database files.
    Sqlite,
}

/// Execution collaborator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Executor backend type.
    #[serde(rename = "type", default)]
    pub executor_type: ExecutorType,
    /// Database file per environment for the sqlite backend.
    #[serde(default)]
    pub databases: BTreeMap<Environment, PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            executor_type: ExecutorType::default(),
            databases: BTreeMap::new(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl ExecutorConfig {
    /// Validates executor configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.executor_type {
            ExecutorType::None => {
                if !self.databases.is_empty() {
                    return Err(ConfigError::Invalid(
                        "executor.databases requires executor type sqlite".to_string(),
                    ));
                }
            }
            ExecutorType::Sqlite => {
                if self.databases.is_empty() {
                    return Err(ConfigError::Invalid(
                        "sqlite executor requires at least one database".to_string(),
                    ));
                }
                for (environment, path) in &self.databases {
                    validate_path_string(
                        &format!("executor.databases.{environment}"),
                        &path.to_string_lossy(),
                    )?;
                }
                if self.busy_timeout_ms == 0 || self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
                    return Err(ConfigError::Invalid(format!(
                        "executor.busy_timeout_ms must be between 1 and {MAX_BUSY_TIMEOUT_MS}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the `SQLite` executor configuration.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteExecutorConfig {
        SqliteExecutorConfig {
            databases: self.databases.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI input, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Range-checks an effective environment profile.
fn validate_profile(profile: &EnvironmentProfile) -> Result<(), ConfigError> {
    let env = profile.environment;
    let invalid = |message: String| Err(ConfigError::Invalid(format!("environments.{env}.{message}")));
    if profile.max_concurrency == 0 || profile.max_concurrency > MAX_CONCURRENCY {
        return invalid(format!("max_concurrency must be between 1 and {MAX_CONCURRENCY}"));
    }
    if profile.max_concurrency_per_caller == 0
        || profile.max_concurrency_per_caller > profile.max_concurrency
    {
        return invalid(
            "max_concurrency_per_caller must be between 1 and max_concurrency".to_string(),
        );
    }
    if profile.max_query_length == 0 || profile.max_query_length > MAX_QUERY_LENGTH {
        return invalid(format!("max_query_length must be between 1 and {MAX_QUERY_LENGTH}"));
    }
    if profile.max_result_rows == 0 || profile.max_result_rows > MAX_RESULT_ROWS {
        return invalid(format!("max_result_rows must be between 1 and {MAX_RESULT_ROWS}"));
    }
    if !(MIN_PAYLOAD_BYTES..=MAX_PAYLOAD_BYTES).contains(&profile.max_payload_bytes) {
        return invalid(format!(
            "max_payload_bytes must be between {MIN_PAYLOAD_BYTES} and {MAX_PAYLOAD_BYTES}"
        ));
    }
    if profile.max_field_bytes < MIN_FIELD_BYTES
        || profile.max_field_bytes > profile.max_payload_bytes
    {
        return invalid(format!(
            "max_field_bytes must be between {MIN_FIELD_BYTES} and max_payload_bytes"
        ));
    }
    if !profile.cost_threshold.is_finite() || profile.cost_threshold <= 0.0 {
        return invalid("cost_threshold must be a positive number".to_string());
    }
    let timeout_ms = u64::try_from(profile.command_timeout.as_millis()).unwrap_or(u64::MAX);
    if !(MIN_COMMAND_TIMEOUT_MS..=MAX_COMMAND_TIMEOUT_MS).contains(&timeout_ms) {
        return invalid(format!(
            "command_timeout_ms must be between {MIN_COMMAND_TIMEOUT_MS} and \
             {MAX_COMMAND_TIMEOUT_MS}"
        ));
    }
    if profile.hints.max_dop == 0 || profile.hints.max_dop > MAX_DOP {
        return invalid(format!("max_dop must be between 1 and {MAX_DOP}"));
    }
    if profile.hints.max_grant_percent == 0 || profile.hints.max_grant_percent > 100 {
        return invalid("max_grant_percent must be between 1 and 100".to_string());
    }
    if profile.hints.read_uncommitted && !env.is_production() {
        return invalid("read_uncommitted is only supported for Prd".to_string());
    }
    Ok(())
}

/// Default max request body size in bytes.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default throttle queue wait in milliseconds.
pub(crate) const fn default_queue_wait_ms() -> u64 {
    2_000
}

/// Default cost check timeout in milliseconds.
pub(crate) const fn default_cost_check_timeout_ms() -> u64 {
    5_000
}

/// Default executor fetch batch size.
pub(crate) const fn default_fetch_batch_size() -> usize {
    100
}

/// Default identifier quoting style.
pub(crate) const fn default_identifier_quote() -> QuoteStyle {
    QuoteStyle::Bracket
}

/// Default maximum identifier length.
pub(crate) const fn default_max_identifier_length() -> usize {
    DEFAULT_MAX_IDENTIFIER_LENGTH
}

/// Default audit directory.
pub(crate) fn default_audit_directory() -> PathBuf {
    PathBuf::from("audit")
}

/// Default maximum audited query length.
pub(crate) const fn default_audit_max_query_chars() -> usize {
    4_000
}

/// Default maximum audited detail length.
pub(crate) const fn default_audit_max_detail_chars() -> usize {
    1_000
}

/// Default executor busy timeout in milliseconds.
pub(crate) const fn default_busy_timeout_ms() -> u64 {
    5_000
}
