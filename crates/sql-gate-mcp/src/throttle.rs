// crates/sql-gate-mcp/src/throttle.rs
// ============================================================================
// Module: Concurrency Throttle
// Description: Per-environment and per-caller execution slots.
// Purpose: Bound concurrent executions and release slots on every exit path.
// Dependencies: sql-gate-core, tokio, tracing
// ============================================================================

//! ## Overview
//! Each environment owns a lane with an in-flight counter, a per-caller count
//! map, and a wake-up channel. A slot is granted only when both the lane and
//! the caller have headroom. Counters change together under the lane's map
//! lock, which is never held across an await point.
//!
//! A granted [`ThrottlePermit`] returns its slot on drop, so cancellation and
//! early returns cannot leak capacity. `release()` may also be called
//! explicitly and is idempotent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use sql_gate_core::CallerId;
use sql_gate_core::Environment;
use sql_gate_core::ProfileTable;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Behavior when no slot is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Fail immediately.
    Reject,
    /// Wait up to the given duration for a release.
    Queue(Duration),
}

/// Slot acquisition failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ThrottleError {
    /// No slot was free and the policy rejects.
    #[error("no execution slot available in {0}")]
    Exhausted(Environment),
    /// No slot freed up within the queue wait.
    #[error("timed out waiting for an execution slot in {0}")]
    WaitTimeout(Environment),
}

/// Snapshot of throttle counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleStats {
    /// Permits granted since startup.
    pub acquired_total: u64,
    /// Permits returned since startup.
    pub released_total: u64,
    /// Slots currently held, per environment in declaration order.
    pub in_flight: [usize; 3],
}

/// Per-environment slot bookkeeping.
#[derive(Debug)]
struct Lane {
    /// Maximum concurrent executions.
    limit: usize,
    /// Maximum concurrent executions per caller.
    per_caller_limit: usize,
    /// Slots currently held.
    in_flight: AtomicUsize,
    /// Slots held per caller; entries are removed at zero.
    callers: Mutex<HashMap<CallerId, usize>>,
    /// Wakes queued waiters after a release.
    released: Notify,
}

impl Lane {
    /// Builds an empty lane.
    fn new(limit: usize, per_caller_limit: usize) -> Self {
        Self {
            limit,
            per_caller_limit,
            in_flight: AtomicUsize::new(0),
            callers: Mutex::new(HashMap::new()),
            released: Notify::new(),
        }
    }

    /// Claims a slot when both the lane and the caller have headroom.
    fn try_claim(&self, caller: &CallerId) -> bool {
        let mut callers = self.callers.lock().unwrap_or_else(PoisonError::into_inner);
        let held = callers.get(caller).copied().unwrap_or(0);
        if self.in_flight.load(Ordering::Acquire) >= self.limit || held >= self.per_caller_limit {
            return false;
        }
        callers.insert(caller.clone(), held + 1);
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Returns a slot held by `caller`.
    fn give_back(&self, caller: &CallerId) {
        {
            let mut callers = self.callers.lock().unwrap_or_else(PoisonError::into_inner);
            match callers.get(caller).copied() {
                Some(held) if held > 1 => {
                    callers.insert(caller.clone(), held - 1);
                }
                Some(_) => {
                    callers.remove(caller);
                }
                None => return,
            }
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
        }
        self.released.notify_waiters();
    }

    /// Returns the slots held by `caller`.
    fn held_by(&self, caller: &CallerId) -> usize {
        self.callers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(caller)
            .copied()
            .unwrap_or(0)
    }
}

/// Shared throttle state.
#[derive(Debug)]
struct ThrottleState {
    /// Lanes in environment declaration order.
    lanes: [Lane; 3],
    /// Behavior when no slot is free.
    policy: WaitPolicy,
    /// Permits granted since startup.
    acquired_total: AtomicU64,
    /// Permits returned since startup.
    released_total: AtomicU64,
}

impl ThrottleState {
    /// Returns the lane for an environment.
    const fn lane(&self, environment: Environment) -> &Lane {
        &self.lanes[lane_index(environment)]
    }

    /// Returns a permit's slot.
    fn release(&self, environment: Environment, caller: &CallerId) {
        self.lane(environment).give_back(caller);
        self.released_total.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(
            environment = environment.as_str(),
            caller = caller.as_str(),
            "query_slot_released"
        );
    }
}

// ============================================================================
// SECTION: Throttle
// ============================================================================

/// Concurrency throttle shared by all requests.
#[derive(Debug, Clone)]
pub struct Throttle {
    /// Shared state.
    state: Arc<ThrottleState>,
}

impl Throttle {
    /// Builds a throttle sized from the profile table.
    #[must_use]
    pub fn new(profiles: &ProfileTable, policy: WaitPolicy) -> Self {
        let lane = |environment: Environment| {
            let profile = profiles.get(environment);
            Lane::new(profile.max_concurrency, profile.max_concurrency_per_caller)
        };
        Self {
            state: Arc::new(ThrottleState {
                lanes: [lane(Environment::Int), lane(Environment::Stg), lane(Environment::Prd)],
                policy,
                acquired_total: AtomicU64::new(0),
                released_total: AtomicU64::new(0),
            }),
        }
    }

    /// Acquires an execution slot for `caller` in `environment`.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::Exhausted`] in reject mode when no slot is
    /// free, or [`ThrottleError::WaitTimeout`] when the queue wait elapses.
    pub async fn acquire(
        &self,
        environment: Environment,
        caller: &CallerId,
    ) -> Result<ThrottlePermit, ThrottleError> {
        let wait = match self.state.policy {
            WaitPolicy::Reject => {
                return self.try_acquire(environment, caller).ok_or(ThrottleError::Exhausted(environment));
            }
            WaitPolicy::Queue(wait) => wait,
        };
        let deadline = Instant::now() + wait;
        let lane = self.state.lane(environment);
        loop {
            let mut released = std::pin::pin!(lane.released.notified());
            released.as_mut().enable();
            if let Some(permit) = self.try_acquire(environment, caller) {
                return Ok(permit);
            }
            if tokio::time::timeout_at(deadline, released).await.is_err() {
                return self
                    .try_acquire(environment, caller)
                    .ok_or(ThrottleError::WaitTimeout(environment));
            }
        }
    }

    /// Acquires a slot without waiting.
    #[must_use]
    pub fn try_acquire(&self, environment: Environment, caller: &CallerId) -> Option<ThrottlePermit> {
        let lane = self.state.lane(environment);
        if !lane.try_claim(caller) {
            return None;
        }
        self.state.acquired_total.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(
            environment = environment.as_str(),
            caller = caller.as_str(),
            in_flight = lane.in_flight.load(Ordering::Acquire),
            "query_slot_acquired"
        );
        Some(ThrottlePermit {
            state: Arc::clone(&self.state),
            environment,
            caller: caller.clone(),
            released: false,
        })
    }

    /// Returns the slots currently held in `environment`.
    #[must_use]
    pub fn in_flight(&self, environment: Environment) -> usize {
        self.state.lane(environment).in_flight.load(Ordering::Acquire)
    }

    /// Returns the slots currently held by `caller` in `environment`.
    #[must_use]
    pub fn caller_in_flight(&self, environment: Environment, caller: &CallerId) -> usize {
        self.state.lane(environment).held_by(caller)
    }

    /// Returns a counter snapshot.
    #[must_use]
    pub fn stats(&self) -> ThrottleStats {
        ThrottleStats {
            acquired_total: self.state.acquired_total.load(Ordering::Acquire),
            released_total: self.state.released_total.load(Ordering::Acquire),
            in_flight: Environment::ALL.map(|environment| self.in_flight(environment)),
        }
    }
}

/// Lane slot for an environment.
const fn lane_index(environment: Environment) -> usize {
    match environment {
        Environment::Int => 0,
        Environment::Stg => 1,
        Environment::Prd => 2,
    }
}

// ============================================================================
// SECTION: Permit
// ============================================================================

/// Held execution slot.
///
/// # Invariants
/// - The slot is returned exactly once, by `release()` or on drop.
#[derive(Debug)]
pub struct ThrottlePermit {
    /// Shared state the slot belongs to.
    state: Arc<ThrottleState>,
    /// Environment of the slot.
    environment: Environment,
    /// Caller holding the slot.
    caller: CallerId,
    /// Whether the slot has been returned.
    released: bool,
}

impl ThrottlePermit {
    /// Returns the slot's environment.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns the slot; later calls do nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.state.release(self.environment, &self.caller);
    }
}

impl Drop for ThrottlePermit {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only permit assertions.")]

    use std::time::Duration;

    use sql_gate_core::CallerId;
    use sql_gate_core::Environment;
    use sql_gate_core::ProfileTable;

    use super::Throttle;
    use super::ThrottleError;
    use super::WaitPolicy;

    fn throttle(limit: usize, per_caller: usize, policy: WaitPolicy) -> Throttle {
        let mut profiles = ProfileTable::default();
        let profile = profiles.get_mut(Environment::Int);
        profile.max_concurrency = limit;
        profile.max_concurrency_per_caller = per_caller;
        Throttle::new(&profiles, policy)
    }

    #[tokio::test]
    async fn reject_mode_fails_when_lane_is_full() {
        let throttle = throttle(1, 1, WaitPolicy::Reject);
        let alice = CallerId::new("alice");
        let bob = CallerId::new("bob");
        let _held = throttle.acquire(Environment::Int, &alice).await.expect("first slot");
        assert_eq!(
            throttle.acquire(Environment::Int, &bob).await.err(),
            Some(ThrottleError::Exhausted(Environment::Int))
        );
        assert!(throttle.acquire(Environment::Stg, &bob).await.is_ok());
    }

    #[tokio::test]
    async fn per_caller_limit_applies_before_lane_limit() {
        let throttle = throttle(5, 1, WaitPolicy::Reject);
        let alice = CallerId::new("alice");
        let _held = throttle.acquire(Environment::Int, &alice).await.expect("first slot");
        assert!(throttle.try_acquire(Environment::Int, &alice).is_none());
        assert!(throttle.try_acquire(Environment::Int, &CallerId::new("bob")).is_some());
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let throttle = throttle(2, 2, WaitPolicy::Reject);
        let alice = CallerId::new("alice");
        let mut first = throttle.acquire(Environment::Int, &alice).await.expect("first");
        let _second = throttle.acquire(Environment::Int, &alice).await.expect("second");
        first.release();
        first.release();
        drop(first);
        assert_eq!(throttle.in_flight(Environment::Int), 1);
        assert_eq!(throttle.caller_in_flight(Environment::Int, &alice), 1);
        let stats = throttle.stats();
        assert_eq!(stats.acquired_total, 2);
        assert_eq!(stats.released_total, 1);
    }

    #[tokio::test]
    async fn queued_waiter_takes_a_released_slot() {
        let throttle = throttle(1, 1, WaitPolicy::Queue(Duration::from_secs(5)));
        let held = throttle.acquire(Environment::Int, &CallerId::new("alice")).await.expect("held");
        let waiter = {
            let throttle = throttle.clone();
            tokio::spawn(async move { throttle.acquire(Environment::Int, &CallerId::new("bob")).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);
        let permit = waiter.await.expect("join").expect("queued slot");
        assert_eq!(permit.environment(), Environment::Int);
    }

    #[tokio::test]
    async fn queue_wait_times_out() {
        let throttle = throttle(1, 1, WaitPolicy::Queue(Duration::from_millis(30)));
        let _held = throttle.acquire(Environment::Int, &CallerId::new("alice")).await.expect("held");
        assert_eq!(
            throttle.acquire(Environment::Int, &CallerId::new("bob")).await.err(),
            Some(ThrottleError::WaitTimeout(Environment::Int))
        );
    }
}
