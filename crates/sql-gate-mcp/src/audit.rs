// crates/sql-gate-mcp/src/audit.rs
// ============================================================================
// Module: Query Audit Logging
// Description: Redacted audit records and their sinks.
// Purpose: Persist one redacted record per query request.
// Dependencies: sql-gate-core, serde, serde_json, time
// ============================================================================

//! ## Overview
//! Every query request produces exactly one [`AuditRecord`]. Query text and
//! error detail pass through the core [`Redactor`] before a record is built,
//! so sinks only ever see masked values.
//!
//! The file sink writes JSON lines to `audit_YYYYMMDD.jsonl`, one file per UTC
//! day keyed by the record timestamp. Appends are serialized behind a mutex.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Deserialize;
use serde::Serialize;
use sql_gate_core::CallerId;
use sql_gate_core::Environment;
use sql_gate_core::ErrorCategory;
use sql_gate_core::Redactor;
use sql_gate_core::RequestId;
use thiserror::Error;
use time::Date;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Final outcome of a query request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Rows were returned.
    Executed,
    /// A gate refused the query.
    Rejected,
    /// A collaborator failed.
    Error,
    /// A deadline elapsed.
    Timeout,
}

impl AuditOutcome {
    /// Returns the stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Executed => "executed",
            Self::Rejected => "rejected",
            Self::Error => "error",
            Self::Timeout => "timeout",
        }
    }
}

/// Persisted audit record.
///
/// # Invariants
/// - `query` and `detail` are redacted and bounded before construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Record time (UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Gateway-assigned request identifier.
    pub request_id: RequestId,
    /// Caller identity.
    pub caller: CallerId,
    /// Target environment.
    pub environment: Environment,
    /// Target database when supplied.
    #[serde(default)]
    pub database: Option<String>,
    /// Redacted query text.
    pub query: String,
    /// Final outcome.
    pub outcome: AuditOutcome,
    /// Rows returned to the caller.
    pub row_count: usize,
    /// Wall time spent in the gateway.
    pub execution_time_ms: u64,
    /// Failure category.
    #[serde(default)]
    pub error_category: Option<ErrorCategory>,
    /// Violation codes or blocking rule ids.
    #[serde(default)]
    pub violation_codes: Vec<String>,
    /// Review risk score when the analyzer ran.
    #[serde(default)]
    pub risk_score: Option<u8>,
    /// Redacted failure detail.
    #[serde(default)]
    pub detail: Option<String>,
}

/// Unredacted facts about a finished request.
#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    /// Gateway-assigned request identifier.
    pub request_id: RequestId,
    /// Caller identity.
    pub caller: &'a CallerId,
    /// Target environment.
    pub environment: Environment,
    /// Target database when supplied.
    pub database: Option<&'a str>,
    /// Raw query text.
    pub query: &'a str,
    /// Final outcome.
    pub outcome: AuditOutcome,
    /// Rows returned to the caller.
    pub row_count: usize,
    /// Wall time spent in the gateway.
    pub execution_time_ms: u64,
    /// Failure category.
    pub error_category: Option<ErrorCategory>,
    /// Violation codes or blocking rule ids.
    pub violation_codes: Vec<String>,
    /// Review risk score when the analyzer ran.
    pub risk_score: Option<u8>,
    /// Raw failure detail.
    pub detail: Option<String>,
}

/// Audit write failures.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Record serialization failed.
    #[error("audit serialization failed: {0}")]
    Serialization(String),
    /// The sink could not be written.
    #[error("audit io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Audit Logger
// ============================================================================

/// Redacts entries and forwards them to a sink.
pub struct AuditLogger {
    /// Destination sink.
    sink: Box<dyn AuditSink>,
    /// Compiled redaction patterns.
    redactor: Redactor,
    /// Maximum characters of query text kept.
    max_query_chars: usize,
    /// Maximum characters of detail text kept.
    max_detail_chars: usize,
}

impl AuditLogger {
    /// Builds a logger over a sink.
    #[must_use]
    pub fn new(
        sink: Box<dyn AuditSink>,
        redactor: Redactor,
        max_query_chars: usize,
        max_detail_chars: usize,
    ) -> Self {
        Self {
            sink,
            redactor,
            max_query_chars,
            max_detail_chars,
        }
    }

    /// Redacts an entry into a record stamped with the current time.
    #[must_use]
    pub fn build(&self, entry: AuditEntry<'_>) -> AuditRecord {
        AuditRecord {
            timestamp: OffsetDateTime::now_utc(),
            request_id: entry.request_id,
            caller: entry.caller.clone(),
            environment: entry.environment,
            database: entry
                .database
                .map(|database| self.redactor.redact_detail(database, self.max_detail_chars)),
            query: self.redactor.redact_query(entry.query, self.max_query_chars),
            outcome: entry.outcome,
            row_count: entry.row_count,
            execution_time_ms: entry.execution_time_ms,
            error_category: entry.error_category,
            violation_codes: entry.violation_codes,
            risk_score: entry.risk_score,
            detail: entry
                .detail
                .map(|detail| self.redactor.redact_detail(&detail, self.max_detail_chars)),
        }
    }

    /// Redacts and writes an entry.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the sink fails.
    pub fn record(&self, entry: AuditEntry<'_>) -> Result<(), AuditError> {
        self.sink.record(&self.build(entry))
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for redacted records.
pub trait AuditSink: Send + Sync {
    /// Persists one record.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the record cannot be written.
    fn record(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Serializes a record as one JSON line.
fn to_line(record: &AuditRecord) -> Result<String, AuditError> {
    serde_json::to_string(record).map_err(|err| AuditError::Serialization(err.to_string()))
}

/// Audit sink writing JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let line = to_line(record)?;
        writeln!(io::stderr(), "{line}").map_err(|err| AuditError::Io(err.to_string()))
    }
}

/// Audit sink discarding all records.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Audit sink keeping records in memory.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Records in write order.
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    /// Builds an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the records written so far.
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).push(record.clone());
        Ok(())
    }
}

impl<T: AuditSink + ?Sized> AuditSink for std::sync::Arc<T> {
    fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        (**self).record(record)
    }
}

/// Open file for the current UTC day.
struct DayFile {
    /// Day the file belongs to.
    day: Date,
    /// Append handle.
    file: File,
}

/// Audit sink appending JSON lines to one file per UTC day.
pub struct DailyFileAuditSink {
    /// Directory holding the daily files.
    directory: PathBuf,
    /// Handle for the most recent day.
    current: Mutex<Option<DayFile>>,
}

impl DailyFileAuditSink {
    /// Creates the sink, creating `directory` when missing.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] when the directory cannot be created.
    pub fn new(directory: &Path) -> Result<Self, AuditError> {
        fs::create_dir_all(directory).map_err(|err| AuditError::Io(err.to_string()))?;
        Ok(Self {
            directory: directory.to_path_buf(),
            current: Mutex::new(None),
        })
    }

    /// Returns the file path for a UTC day.
    #[must_use]
    pub fn path_for(&self, day: Date) -> PathBuf {
        self.directory.join(file_name(day))
    }
}

impl AuditSink for DailyFileAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let line = to_line(record)?;
        let day = record.timestamp.to_offset(time::UtcOffset::UTC).date();
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let open = match current.take() {
            Some(open) if open.day == day => open,
            _ => DayFile {
                day,
                file: OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(self.path_for(day))
                    .map_err(|err| AuditError::Io(err.to_string()))?,
            },
        };
        let DayFile {
            file,
            ..
        } = current.insert(open);
        writeln!(file, "{line}").map_err(|err| AuditError::Io(err.to_string()))?;
        file.flush().map_err(|err| AuditError::Io(err.to_string()))
    }
}

/// Returns the daily file name, `audit_YYYYMMDD.jsonl`.
fn file_name(day: Date) -> String {
    format!("audit_{:04}{:02}{:02}.jsonl", day.year(), u8::from(day.month()), day.day())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, reason = "Test-only audit assertions.")]

    use std::fs;

    use sql_gate_core::CallerId;
    use sql_gate_core::Environment;
    use sql_gate_core::Redactor;
    use sql_gate_core::RequestId;
    use tempfile::TempDir;
    use time::Month;
    use time::OffsetDateTime;
    use time::macros::datetime;

    use super::AuditEntry;
    use super::AuditLogger;
    use super::AuditOutcome;
    use super::AuditRecord;
    use super::AuditSink;
    use super::DailyFileAuditSink;
    use super::MemoryAuditSink;

    fn record_at(timestamp: OffsetDateTime, id: u64) -> AuditRecord {
        AuditRecord {
            timestamp,
            request_id: RequestId::from_sequence(id),
            caller: CallerId::default(),
            environment: Environment::Int,
            database: None,
            query: "SELECT 1".to_string(),
            outcome: AuditOutcome::Executed,
            row_count: 1,
            execution_time_ms: 3,
            error_category: None,
            violation_codes: Vec::new(),
            risk_score: Some(0),
            detail: None,
        }
    }

    #[test]
    fn file_sink_rolls_over_at_utc_midnight() {
        let dir = TempDir::new().unwrap();
        let sink = DailyFileAuditSink::new(&dir.path().join("audit")).unwrap();
        sink.record(&record_at(datetime!(2026-03-01 23:59:59 UTC), 1)).unwrap();
        sink.record(&record_at(datetime!(2026-03-02 00:00:01 UTC), 2)).unwrap();
        sink.record(&record_at(datetime!(2026-03-02 01:30:00 +05:00), 3)).unwrap();

        let first = fs::read_to_string(dir.path().join("audit/audit_20260301.jsonl")).unwrap();
        let second = fs::read_to_string(dir.path().join("audit/audit_20260302.jsonl")).unwrap();
        assert_eq!(first.lines().count(), 2);
        assert_eq!(second.lines().count(), 1);
        let parsed: AuditRecord = serde_json::from_str(second.lines().next().unwrap()).unwrap();
        assert_eq!(parsed.request_id, RequestId::from_sequence(2));
        assert_eq!(parsed.timestamp.month(), Month::March);
    }

    #[test]
    fn logger_redacts_before_the_sink_sees_anything() {
        let sink = std::sync::Arc::new(MemoryAuditSink::new());
        let logger = AuditLogger::new(Box::new(sink.clone()), Redactor::new().unwrap(), 4_000, 1_000);
        let caller = CallerId::new("analyst");
        logger
            .record(AuditEntry {
                request_id: RequestId::from_sequence(9),
                caller: &caller,
                environment: Environment::Prd,
                database: Some("Sales"),
                query: "SELECT id FROM dbo.c WHERE email = 'ann@example.com'",
                outcome: AuditOutcome::Error,
                row_count: 0,
                execution_time_ms: 12,
                error_category: None,
                violation_codes: Vec::new(),
                risk_score: None,
                detail: Some("Server=db01;Password=hunter2; failed".to_string()),
            })
            .unwrap();
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].query.contains("ann@"));
        assert!(!records[0].detail.as_deref().unwrap().contains("hunter2"));
        assert_eq!(records[0].caller, caller);
        assert_eq!(records[0].database.as_deref(), Some("Sales"));
    }

    fn entry_for<'a>(caller: &'a CallerId, database: &'a str) -> AuditEntry<'a> {
        AuditEntry {
            request_id: RequestId::from_sequence(1),
            caller,
            environment: Environment::Int,
            database: Some(database),
            query: "SELECT 1",
            outcome: AuditOutcome::Rejected,
            row_count: 0,
            execution_time_ms: 0,
            error_category: None,
            violation_codes: Vec::new(),
            risk_score: None,
            detail: None,
        }
    }

    #[test]
    fn caller_supplied_database_names_are_redacted_and_bounded() {
        let logger =
            AuditLogger::new(Box::new(MemoryAuditSink::new()), Redactor::new().unwrap(), 4_000, 32);
        let caller = CallerId::default();
        let secret = logger.build(entry_for(&caller, "Server=db01;Password=hunter2"));
        assert!(!secret.database.as_deref().unwrap().contains("hunter2"));
        let email = logger.build(entry_for(&caller, "ann@example.com"));
        assert!(!email.database.as_deref().unwrap().contains("ann@"));
        let long = "x".repeat(200);
        let bounded = logger.build(entry_for(&caller, &long));
        assert!(bounded.database.as_deref().unwrap().len() < 64);
    }
}
