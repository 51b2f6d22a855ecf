// crates/sql-gate-mcp/src/gateway.rs
// ============================================================================
// Module: Gateway Orchestrator
// Description: Request pipeline from raw query text to result envelope.
// Purpose: Sequence every gate, execute admitted queries, and audit each request.
// Dependencies: sql-gate-core, sql-gate-config, tokio, tracing
// ============================================================================

//! ## Overview
//! [`Gateway::handle`] runs one request through the pipeline:
//! structural validation, cost admission, throttle acquisition, review,
//! execution, shaping, release, and audit. Each stage either passes its
//! output on or stops the pipeline with a [`GatewayError`]; either way the
//! caller receives a well-formed [`ResultEnvelope`] and exactly one audit
//! record is written.
//!
//! Configuration is threaded in at construction; the gateway holds no ambient
//! state beyond the throttle counters and the request sequence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Instant;

use serde::Serialize;
use sql_gate_config::SqlGateConfig;
use sql_gate_config::ThrottleMode;
use sql_gate_core::Analyzer;
use sql_gate_core::CostDiagnostics;
use sql_gate_core::EnvelopeWarning;
use sql_gate_core::Environment;
use sql_gate_core::EnvironmentProfile;
use sql_gate_core::ExecutorError;
use sql_gate_core::HintDialect;
use sql_gate_core::PreparedQuery;
use sql_gate_core::ProfileTable;
use sql_gate_core::QueryExecutor;
use sql_gate_core::QueryRequest;
use sql_gate_core::QuoteStyle;
use sql_gate_core::Redactor;
use sql_gate_core::RequestId;
use sql_gate_core::ResultEnvelope;
use sql_gate_core::ReviewResult;
use sql_gate_core::ReviewStatus;
use sql_gate_core::StructuralValidator;
use sql_gate_core::ViolationCode;
use sql_gate_core::WarningCode;
use sql_gate_core::sql::DANGEROUS_PATTERNS;
use sql_gate_core::sql::quote_identifier;

use crate::audit::AuditEntry;
use crate::audit::AuditLogger;
use crate::audit::AuditOutcome;
use crate::audit::AuditSink;
use crate::cost::CostGate;
use crate::cost::prepare;
use crate::error::GatewayError;
use crate::error::GatewayInitError;
use crate::error::TimeoutPhase;
use crate::shaping::CappedRows;
use crate::shaping::PageRequest;
use crate::shaping::ShapeLimits;
use crate::shaping::fetch_capped;
use crate::shaping::paginate;
use crate::shaping::resolve_page;
use crate::shaping::shape_page;
use crate::telemetry::DecisionEvent;
use crate::telemetry::GatewayMetrics;
use crate::telemetry::NoopMetrics;
use crate::throttle::Throttle;
use crate::throttle::ThrottleError;
use crate::throttle::WaitPolicy;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Pipeline settings taken from configuration.
#[derive(Debug, Clone, Copy)]
struct GatewaySettings {
    /// Dialect used to render hints.
    hint_dialect: HintDialect,
    /// Rows requested per cursor batch.
    fetch_batch_size: usize,
    /// Quoting applied to database names.
    identifier_quote: QuoteStyle,
    /// Maximum database name length.
    max_identifier_length: usize,
}

/// Facts gathered while the pipeline runs, kept for failure envelopes.
#[derive(Debug, Default)]
struct RunTrail {
    /// Review result once the analyzer ran.
    review: Option<ReviewResult>,
    /// Cost diagnostics once the threshold is known.
    cost: Option<CostDiagnostics>,
}

/// Offline review of a query: validation and analysis without execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryReview {
    /// True when structural validation accepted the query.
    pub accepted: bool,
    /// Violation codes when validation rejected the query.
    pub violations: Vec<ViolationCode>,
    /// Analyzer result for accepted queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewResult>,
    /// Query text as it would be sent to the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepared_text: Option<String>,
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Query safety gateway.
pub struct Gateway {
    /// Environment profiles.
    profiles: ProfileTable,
    /// Structural validator.
    validator: StructuralValidator,
    /// Best-practices analyzer.
    analyzer: Analyzer,
    /// Plan-cost gatekeeper.
    cost: CostGate,
    /// Concurrency throttle.
    throttle: Throttle,
    /// Execution collaborator.
    executor: Arc<dyn QueryExecutor>,
    /// Audit logger.
    audit: AuditLogger,
    /// Metrics sink.
    metrics: Arc<dyn GatewayMetrics>,
    /// Pipeline settings.
    settings: GatewaySettings,
    /// Last assigned request sequence number.
    sequence: AtomicU64,
}

impl Gateway {
    /// Builds a gateway from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayInitError`] when configuration or redaction setup fails.
    pub fn from_config(
        config: &SqlGateConfig,
        executor: Arc<dyn QueryExecutor>,
        sink: Box<dyn AuditSink>,
    ) -> Result<Self, GatewayInitError> {
        config.validate().map_err(|err| GatewayInitError::Config(err.to_string()))?;
        let registry =
            config.rule_registry().map_err(|err| GatewayInitError::Config(err.to_string()))?;
        let redactor = Redactor::new().map_err(|err| GatewayInitError::Redaction(err.to_string()))?;
        let profiles = config.profiles();
        let policy = match config.gateway.throttle_mode {
            ThrottleMode::Reject => WaitPolicy::Reject,
            ThrottleMode::Queue => WaitPolicy::Queue(config.gateway.queue_wait()),
        };
        Ok(Self {
            throttle: Throttle::new(&profiles, policy),
            profiles,
            validator: StructuralValidator::new(config.database_policy(), DANGEROUS_PATTERNS),
            analyzer: Analyzer::new(Arc::new(registry)),
            cost: CostGate::new(Arc::clone(&executor), config.gateway.cost_check_timeout()),
            executor,
            audit: AuditLogger::new(
                sink,
                redactor,
                config.audit.max_query_chars,
                config.audit.max_detail_chars,
            ),
            metrics: Arc::new(NoopMetrics),
            settings: GatewaySettings {
                hint_dialect: config.gateway.hint_dialect,
                fetch_batch_size: config.gateway.fetch_batch_size,
                identifier_quote: config.gateway.identifier_quote,
                max_identifier_length: config.gateway.max_identifier_length,
            },
            sequence: AtomicU64::new(0),
        })
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn GatewayMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Returns the environment profiles.
    #[must_use]
    pub const fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }

    /// Returns the best-practices analyzer.
    #[must_use]
    pub const fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Returns the concurrency throttle.
    #[must_use]
    pub const fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// Handles one query request.
    pub async fn handle(&self, request: &QueryRequest) -> ResultEnvelope {
        let started = Instant::now();
        let request_id = self.next_request_id();
        let mut trail = RunTrail::default();
        let result = self.run(request, &mut trail).await;
        let elapsed = started.elapsed();
        let execution_time_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        let (envelope, outcome, detail, risk_score) = match result {
            Ok(mut envelope) => {
                envelope.execution_time_ms = execution_time_ms;
                let risk_score = envelope.review_summary.as_ref().map(|review| review.risk_score);
                tracing::info!(
                    request_id = request_id.as_str(),
                    environment = request.environment().as_str(),
                    caller = request.caller().as_str(),
                    row_count = envelope.row_count,
                    execution_time_ms,
                    "query_executed"
                );
                (envelope, AuditOutcome::Executed, None, risk_score)
            }
            Err(error) => {
                tracing::warn!(
                    request_id = request_id.as_str(),
                    environment = request.environment().as_str(),
                    caller = request.caller().as_str(),
                    category = error.category().as_str(),
                    "query_rejected"
                );
                let risk_score = trail.review.as_ref().map(|review| review.risk_score);
                let detail = error.to_string();
                let outcome = error.outcome();
                (failure_envelope(&error, trail, execution_time_ms), outcome, Some(detail), risk_score)
            }
        };

        let entry = AuditEntry {
            request_id: request_id.clone(),
            caller: request.caller(),
            environment: request.environment(),
            database: request.database(),
            query: request.query(),
            outcome,
            row_count: envelope.row_count,
            execution_time_ms,
            error_category: envelope.error,
            violation_codes: envelope.blocking_violations.clone(),
            risk_score,
            detail,
        };
        if let Err(err) = self.audit.record(entry) {
            tracing::warn!(request_id = request_id.as_str(), error = %err, "audit_write_failed");
        }

        let event = DecisionEvent {
            environment: request.environment(),
            outcome,
            error: envelope.error,
        };
        self.metrics.record_decision(event);
        self.metrics.record_latency(event, elapsed);
        envelope
    }

    /// Validates and reviews a query without executing it or writing audit.
    #[must_use]
    pub fn review(&self, query: &str, environment: Environment, database: Option<&str>) -> QueryReview {
        let profile = self.profiles.get(environment);
        match self.validator.check(query, database, profile.max_query_length) {
            Ok(validated) => QueryReview {
                accepted: true,
                violations: Vec::new(),
                review: Some(self.analyzer.review(validated.tokens())),
                prepared_text: Some(
                    prepare(&validated, profile, self.settings.hint_dialect, None).text,
                ),
            },
            Err(error) => QueryReview {
                accepted: false,
                violations: error.codes,
                review: None,
                prepared_text: None,
            },
        }
    }

    /// Runs the pipeline stages.
    async fn run(
        &self,
        request: &QueryRequest,
        trail: &mut RunTrail,
    ) -> Result<ResultEnvelope, GatewayError> {
        let environment = request.environment();
        let profile = self.profiles.get(environment);

        let validated = self
            .validator
            .check(request.query(), request.database(), profile.max_query_length)
            .map_err(|err| GatewayError::Validation(err.codes))?;
        let page = resolve_page(request.page(), request.page_size(), profile.max_result_rows)
            .map_err(|code| GatewayError::Validation(vec![code]))?;
        let database = request
            .database()
            .map(|name| {
                quote_identifier(
                    name,
                    self.settings.identifier_quote,
                    self.settings.max_identifier_length,
                )
            })
            .transpose()
            .map_err(|err| GatewayError::Validation(err.codes))?;
        let prepared = prepare(&validated, profile, self.settings.hint_dialect, database);

        trail.cost = Some(CostDiagnostics {
            estimate: None,
            threshold: profile.cost_threshold,
        });
        let admission = match self.cost.admit(&prepared, profile).await {
            Ok(admission) => admission,
            Err(error) => {
                if let GatewayError::CostExceeded {
                    estimate,
                    threshold,
                } = &error
                {
                    trail.cost = Some(CostDiagnostics {
                        estimate: Some(*estimate),
                        threshold: *threshold,
                    });
                }
                return Err(error);
            }
        };
        trail.cost = Some(admission.diagnostics());

        let mut permit =
            self.throttle.acquire(environment, request.caller()).await.map_err(|err| match err {
                ThrottleError::Exhausted(environment) => {
                    GatewayError::ConcurrencyExhausted(environment)
                }
                ThrottleError::WaitTimeout(_) => GatewayError::Timeout(TimeoutPhase::ThrottleWait),
            })?;

        let review = self.analyzer.review(validated.tokens());
        trail.review = Some(review.clone());
        if review.is_blocked() {
            return Err(GatewayError::BlockingFindings(review.blocking_rules()));
        }

        let capped = tokio::time::timeout(admission.timeout, self.fetch(&prepared, profile))
            .await
            .map_err(|_| GatewayError::Timeout(TimeoutPhase::Execution))??;
        let envelope = shape_envelope(capped, page, profile, review, admission.diagnostics());
        permit.release();
        Ok(envelope)
    }

    /// Opens a cursor and fetches rows up to the profile row cap.
    async fn fetch(
        &self,
        prepared: &PreparedQuery,
        profile: &EnvironmentProfile,
    ) -> Result<CappedRows, GatewayError> {
        let mut cursor = self.executor.open(prepared).await.map_err(execution_error)?;
        fetch_capped(cursor.as_mut(), profile.max_result_rows, self.settings.fetch_batch_size)
            .await
            .map_err(execution_error)
    }

    /// Assigns the next request identifier.
    fn next_request_id(&self) -> RequestId {
        RequestId::from_sequence(self.sequence.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

// ============================================================================
// SECTION: Envelope Helpers
// ============================================================================

/// Maps executor failures onto the pipeline error.
fn execution_error(error: ExecutorError) -> GatewayError {
    GatewayError::Execution(error.to_string())
}

/// Builds the success envelope for fetched rows.
fn shape_envelope(
    capped: CappedRows,
    page: PageRequest,
    profile: &EnvironmentProfile,
    review: ReviewResult,
    cost: CostDiagnostics,
) -> ResultEnvelope {
    let (window, page_info) = paginate(capped.rows, page);
    let shaped = shape_page(
        window,
        ShapeLimits {
            max_field_bytes: profile.max_field_bytes,
            max_payload_bytes: profile.max_payload_bytes,
        },
    );
    let mut warnings = Vec::new();
    if capped.limit_exceeded {
        warnings.push(EnvelopeWarning {
            code: WarningCode::RowLimitExceeded,
            message: format!("result truncated to {} rows", profile.max_result_rows),
        });
    }
    if shaped.fields_truncated {
        warnings.push(EnvelopeWarning {
            code: WarningCode::FieldTruncated,
            message: format!("text values longer than {} bytes were truncated", profile.max_field_bytes),
        });
    }
    if shaped.payload_limit_exceeded {
        warnings.push(EnvelopeWarning {
            code: WarningCode::PayloadLimitExceeded,
            message: format!(
                "payload exceeded {} bytes; later text values were replaced",
                profile.max_payload_bytes
            ),
        });
    }
    if review.status == ReviewStatus::Warn {
        warnings.push(EnvelopeWarning {
            code: WarningCode::ReviewFindings,
            message: format!("review reported {} finding(s)", review.findings.len()),
        });
    }

    let mut envelope = ResultEnvelope::success(shaped.rows, 0);
    envelope.warnings = warnings;
    envelope.review_summary = Some(review);
    envelope.truncated_fields = shaped.truncated_fields;
    envelope.truncation.row_limit_exceeded = capped.limit_exceeded;
    envelope.truncation.fields_truncated = shaped.fields_truncated;
    envelope.truncation.payload_limit_exceeded = shaped.payload_limit_exceeded;
    envelope.pagination = Some(page_info);
    envelope.cost = Some(cost);
    envelope
}

/// Builds the failure envelope for a stage error.
fn failure_envelope(error: &GatewayError, trail: RunTrail, execution_time_ms: u64) -> ResultEnvelope {
    let mut envelope = ResultEnvelope::failure(error.category(), execution_time_ms);
    envelope.blocking_violations = error.violation_codes();
    envelope.review_summary = trail.review;
    envelope.cost = trail.cost;
    envelope
}
