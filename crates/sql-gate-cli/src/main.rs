// crates/sql-gate-cli/src/main.rs
// ============================================================================
// Module: SQL Gate CLI Entry Point
// Description: Command dispatcher for the SQL Gate server and offline checks.
// Purpose: Start the gateway server, review queries, and manage configuration.
// Dependencies: clap, sql-gate-config, sql-gate-core, sql-gate-mcp, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! `sql-gate` starts the MCP server (`serve`), reviews a query offline without
//! touching a database (`check`), and validates or prints configuration
//! (`config`). Operational logs go to stderr so the stdio transport keeps
//! stdout for protocol frames. Security posture: query files and config paths
//! are untrusted; reads are size-limited.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use sql_gate_config::SqlGateConfig;
use sql_gate_config::config_toml_example;
use sql_gate_core::Environment;
use sql_gate_core::ReviewStatus;
use sql_gate_mcp::Gateway;
use sql_gate_mcp::McpServer;
use sql_gate_mcp::NoopAuditSink;
use sql_gate_mcp::QueryReview;
use sql_gate_mcp::UnconfiguredExecutor;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum query file size accepted by `check`.
const MAX_QUERY_FILE_BYTES: usize = 1024 * 1024;
/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "sql-gate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the SQL Gate MCP server.
    Serve(ServeCommand),
    /// Validate and review a query without executing it.
    Check(CheckCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to sql-gate.toml or `SQL_GATE_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Allow binding the HTTP transport to non-loopback addresses.
    #[arg(long, action = ArgAction::SetTrue)]
    allow_non_loopback: bool,
}

/// Configuration for the `check` command.
#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("input").required(true).args(["query", "file"]))]
struct CheckCommand {
    /// Query text to review.
    #[arg(long, value_name = "SQL")]
    query: Option<String>,
    /// File containing the query to review.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// Environment whose limits apply.
    #[arg(long, short = 'e', value_name = "ENV", default_value = "Int")]
    environment: Environment,
    /// Target database checked against the allow-list.
    #[arg(long, value_name = "NAME")]
    database: Option<String>,
    /// Optional config file path; built-in defaults apply when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Output formats for `check`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a SQL Gate configuration file.
    Validate(ConfigValidateCommand),
    /// Print an annotated example configuration.
    Example,
}

/// Configuration for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to sql-gate.toml or `SQL_GATE_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors raised while reading bounded input files.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        write_stdout_line(&format!("sql-gate {}", env!("CARGO_PKG_VERSION")))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        write_stdout_line("usage: sql-gate <serve|check|config> [options]; see --help")?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Check(command) => command_check(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

/// Installs the stderr log subscriber.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .try_init();
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    init_tracing();
    let mut config = SqlGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    if command.allow_non_loopback {
        config.server.allow_non_loopback = true;
    }
    tracing::info!(
        transport = ?config.server.transport,
        executor = ?config.executor.executor_type,
        "sql-gate starting"
    );
    let server = tokio::task::spawn_blocking(move || McpServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Check Command
// ============================================================================

/// Executes the `check` command.
fn command_check(command: &CheckCommand) -> CliResult<ExitCode> {
    let config = match command.config.as_deref() {
        Some(path) => SqlGateConfig::load(Some(path))
            .map_err(|err| CliError::new(format!("failed to load config: {err}")))?,
        None => SqlGateConfig::default(),
    };
    let query = check_input(command)?;
    let gateway = Gateway::from_config(&config, Arc::new(UnconfiguredExecutor), Box::new(NoopAuditSink))
        .map_err(|err| CliError::new(format!("failed to build gateway: {err}")))?;
    let review = gateway.review(&query, command.environment, command.database.as_deref());

    match command.format {
        OutputFormat::Json => {
            let rendered = serde_json::to_string_pretty(&review)
                .map_err(|err| CliError::new(format!("failed to render review: {err}")))?;
            write_stdout_line(&rendered)?;
        }
        OutputFormat::Text => write_stdout_line(&render_review(&review))?,
    }
    Ok(check_exit_code(&review))
}

/// Returns the query text from `--query` or `--file`.
fn check_input(command: &CheckCommand) -> CliResult<String> {
    if let Some(query) = &command.query {
        return Ok(query.clone());
    }
    let Some(path) = command.file.as_deref() else {
        return Err(CliError::new("either --query or --file is required".to_string()));
    };
    let bytes = read_bytes_with_limit(path, MAX_QUERY_FILE_BYTES).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{} is too large ({size} bytes, limit {limit})",
            path.display()
        )),
    })?;
    String::from_utf8(bytes)
        .map_err(|_| CliError::new(format!("{} is not valid utf-8", path.display())))
}

/// Exit status for a review: success only when accepted and not blocked.
fn check_exit_code(review: &QueryReview) -> ExitCode {
    let blocked = review.review.as_ref().is_some_and(|result| result.is_blocked());
    if review.accepted && !blocked { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

/// Renders a review as text lines.
fn render_review(review: &QueryReview) -> String {
    let mut lines = Vec::new();
    if review.accepted {
        lines.push("validation: accepted".to_string());
    } else {
        let codes: Vec<&str> = review.violations.iter().map(|code| code.as_str()).collect();
        lines.push(format!("validation: rejected ({})", codes.join(", ")));
    }
    if let Some(result) = &review.review {
        let status = match result.status {
            ReviewStatus::Pass => "pass",
            ReviewStatus::Warn => "warn",
            ReviewStatus::Block => "block",
        };
        lines.push(format!("review: {status} (risk {})", result.risk_score));
        for finding in &result.findings {
            lines.push(format!(
                "  {} [{}] {}: {}",
                finding.rule_id.as_str(),
                finding.severity.as_str(),
                finding.title,
                finding.recommendation
            ));
        }
    }
    if let Some(text) = &review.prepared_text {
        lines.push("prepared:".to_string());
        lines.extend(text.lines().map(|line| format!("  {line}")));
    }
    lines.join("\n")
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
        ConfigCommand::Example => {
            write_stdout_line(config_toml_example().trim_end())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = SqlGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line("config ok")?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
