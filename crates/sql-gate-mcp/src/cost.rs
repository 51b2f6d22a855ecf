// crates/sql-gate-mcp/src/cost.rs
// ============================================================================
// Module: Cost Gatekeeper
// Description: Plan-cost admission and resource hint preparation.
// Purpose: Refuse expensive plans before they consume a concurrency slot.
// Dependencies: sql-gate-core, tokio, tracing
// ============================================================================

//! ## Overview
//! [`prepare`] turns a validated query into the [`PreparedQuery`] sent to the
//! executor: effective resource hints, the optional rendered hint clause, the
//! quoted database, and the command timeout. [`CostGate::admit`] then asks the
//! executor for a plan-cost estimate under a bounded timeout. The gate fails
//! closed: a missing estimate never admits a query.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use sql_gate_core::CostDiagnostics;
use sql_gate_core::EnvironmentProfile;
use sql_gate_core::HintDialect;
use sql_gate_core::PreparedQuery;
use sql_gate_core::QueryExecutor;
use sql_gate_core::ValidatedQuery;
use sql_gate_core::sql::render_hints;

use crate::error::GatewayError;

// ============================================================================
// SECTION: Preparation
// ============================================================================

/// Builds the prepared query for a validated request.
#[must_use]
pub fn prepare(
    query: &ValidatedQuery<'_>,
    profile: &EnvironmentProfile,
    dialect: HintDialect,
    database: Option<String>,
) -> PreparedQuery {
    let hints = profile.effective_hints();
    PreparedQuery {
        text: render_hints(query, &hints, dialect),
        environment: profile.environment,
        database,
        hints,
        timeout: profile.command_timeout,
    }
}

// ============================================================================
// SECTION: Cost Gate
// ============================================================================

/// Admitted query metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Admission {
    /// Estimate returned by the executor.
    pub estimate: f64,
    /// Threshold the estimate was compared against.
    pub threshold: f64,
    /// Execution deadline.
    pub timeout: Duration,
}

impl Admission {
    /// Returns envelope diagnostics for the admission.
    #[must_use]
    pub const fn diagnostics(&self) -> CostDiagnostics {
        CostDiagnostics {
            estimate: Some(self.estimate),
            threshold: self.threshold,
        }
    }
}

/// Plan-cost gatekeeper.
#[derive(Clone)]
pub struct CostGate {
    /// Executor providing estimates.
    executor: Arc<dyn QueryExecutor>,
    /// Deadline for one estimate.
    check_timeout: Duration,
}

impl CostGate {
    /// Builds a gate over an executor.
    #[must_use]
    pub fn new(executor: Arc<dyn QueryExecutor>, check_timeout: Duration) -> Self {
        Self {
            executor,
            check_timeout,
        }
    }

    /// Admits the query when its estimate is within the profile threshold.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::CostExceeded`] when the estimate is above the
    /// threshold and [`GatewayError::CostCheckUnavailable`] when no usable
    /// estimate arrives in time.
    pub async fn admit(
        &self,
        query: &PreparedQuery,
        profile: &EnvironmentProfile,
    ) -> Result<Admission, GatewayError> {
        let estimate =
            match tokio::time::timeout(self.check_timeout, self.executor.estimate_cost(query)).await
            {
                Ok(Ok(estimate)) => estimate,
                Ok(Err(err)) => return Err(GatewayError::CostCheckUnavailable(err.to_string())),
                Err(_) => {
                    return Err(GatewayError::CostCheckUnavailable(
                        "cost estimate timed out".to_string(),
                    ));
                }
            };
        if !estimate.is_finite() || estimate < 0.0 {
            return Err(GatewayError::CostCheckUnavailable(format!(
                "invalid cost estimate: {estimate}"
            )));
        }
        let threshold = profile.cost_threshold;
        if estimate > threshold {
            tracing::warn!(
                environment = profile.environment.as_str(),
                estimate,
                threshold,
                "query_cost_exceeded"
            );
            return Err(GatewayError::CostExceeded {
                estimate,
                threshold,
            });
        }
        Ok(Admission {
            estimate,
            threshold,
            timeout: query.timeout,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only admission assertions.")]

    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use sql_gate_core::DatabasePolicy;
    use sql_gate_core::Environment;
    use sql_gate_core::EnvironmentProfile;
    use sql_gate_core::ExecutorError;
    use sql_gate_core::HintDialect;
    use sql_gate_core::PreparedQuery;
    use sql_gate_core::QueryExecutor;
    use sql_gate_core::RowCursor;
    use sql_gate_core::StructuralValidator;
    use sql_gate_core::sql::DANGEROUS_PATTERNS;

    use super::CostGate;
    use super::prepare;
    use crate::error::GatewayError;

    /// Executor returning a fixed estimate after an optional delay.
    struct FixedCost {
        /// Estimate or failure to return.
        estimate: Result<f64, ExecutorError>,
        /// Delay before answering.
        delay: Duration,
    }

    #[async_trait]
    impl QueryExecutor for FixedCost {
        async fn estimate_cost(&self, _query: &PreparedQuery) -> Result<f64, ExecutorError> {
            tokio::time::sleep(self.delay).await;
            self.estimate.clone()
        }

        async fn open(&self, _query: &PreparedQuery) -> Result<Box<dyn RowCursor>, ExecutorError> {
            Err(ExecutorError::Unavailable("cost-only executor".to_string()))
        }
    }

    fn gate(estimate: Result<f64, ExecutorError>, delay: Duration) -> CostGate {
        CostGate::new(
            Arc::new(FixedCost {
                estimate,
                delay,
            }),
            Duration::from_millis(50),
        )
    }

    fn prepared(environment: Environment) -> PreparedQuery {
        let validator = StructuralValidator::new(DatabasePolicy::default(), DANGEROUS_PATTERNS);
        let query = validator.check("SELECT id FROM dbo.t", None, 10_000).expect("valid");
        prepare(&query, &EnvironmentProfile::baseline(environment), HintDialect::None, None)
    }

    #[tokio::test]
    async fn estimate_at_threshold_is_admitted() {
        let admission = gate(Ok(10.0), Duration::ZERO)
            .admit(&prepared(Environment::Prd), &EnvironmentProfile::baseline(Environment::Prd))
            .await
            .expect("admitted");
        assert_eq!(admission.diagnostics().estimate, Some(10.0));
        assert_eq!(admission.timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn estimate_above_threshold_is_refused() {
        let result = gate(Ok(12.5), Duration::ZERO)
            .admit(&prepared(Environment::Prd), &EnvironmentProfile::baseline(Environment::Prd))
            .await;
        assert_eq!(
            result.err(),
            Some(GatewayError::CostExceeded {
                estimate: 12.5,
                threshold: 10.0,
            })
        );
    }

    #[tokio::test]
    async fn failed_or_slow_estimates_fail_closed() {
        let profile = EnvironmentProfile::baseline(Environment::Int);
        let failed = gate(Err(ExecutorError::Unavailable("down".to_string())), Duration::ZERO)
            .admit(&prepared(Environment::Int), &profile)
            .await;
        assert!(matches!(failed, Err(GatewayError::CostCheckUnavailable(_))));

        let slow = gate(Ok(1.0), Duration::from_secs(5)).admit(&prepared(Environment::Int), &profile).await;
        assert!(matches!(slow, Err(GatewayError::CostCheckUnavailable(_))));

        let nan = gate(Ok(f64::NAN), Duration::ZERO).admit(&prepared(Environment::Int), &profile).await;
        assert!(matches!(nan, Err(GatewayError::CostCheckUnavailable(_))));
    }

    #[test]
    fn read_uncommitted_is_only_prepared_for_production() {
        let mut stg = EnvironmentProfile::baseline(Environment::Stg);
        stg.hints.read_uncommitted = true;
        let validator = StructuralValidator::new(DatabasePolicy::default(), DANGEROUS_PATTERNS);
        let query = validator.check("SELECT id FROM dbo.t", None, 10_000).expect("valid");
        assert!(!prepare(&query, &stg, HintDialect::Tsql, None).hints.read_uncommitted);
        let prd = EnvironmentProfile::baseline(Environment::Prd);
        let prepared = prepare(&query, &prd, HintDialect::Tsql, None);
        assert!(prepared.hints.read_uncommitted);
        assert!(prepared.text.contains("WITH (NOLOCK)"));
        assert!(prepared.text.contains("MAXDOP 1"));
    }
}
