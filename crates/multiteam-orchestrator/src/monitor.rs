use crate::types::{ActorMetrics, ActorState, ActorStatus};
use multiteam_core::ActorRole;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Tracks invocation counts and timings per actor role across runs.
///
/// Observability only: nothing in the engine reads these numbers back to
/// make decisions.
pub struct RunMonitor {
    states: Arc<RwLock<HashMap<ActorRole, ActorState>>>,
}

impl RunMonitor {
    /// A monitor with every role idle.
    pub fn new() -> Self {
        let states = ActorRole::ALL
            .iter()
            .map(|role| {
                (
                    *role,
                    ActorState {
                        role: *role,
                        in_flight: 0,
                        status: ActorStatus::Idle,
                        metrics: ActorMetrics::default(),
                    },
                )
            })
            .collect();
        Self {
            states: Arc::new(RwLock::new(states)),
        }
    }

    /// Start one invocation of `role`. The returned guard records the finish
    /// when dropped, even if the invocation's future is dropped mid-flight.
    pub fn track(&self, role: ActorRole) -> InvocationGuard<'_> {
        self.start_invocation(role);
        InvocationGuard {
            monitor: self,
            role,
            start: Instant::now(),
            failed: false,
        }
    }

    /// Mark one invocation of `role` as started.
    pub fn start_invocation(&self, role: ActorRole) {
        let mut states = self.states.write();
        if let Some(state) = states.get_mut(&role) {
            state.in_flight += 1;
            state.metrics.invocations += 1;
            state.status = ActorStatus::Working;
        }
    }

    /// Mark one invocation of `role` as finished.
    pub fn finish_invocation(&self, role: ActorRole, duration_ms: u64, failed: bool) {
        let mut states = self.states.write();
        if let Some(state) = states.get_mut(&role) {
            state.in_flight = state.in_flight.saturating_sub(1);
            state.metrics.duration_ms += duration_ms;
            if failed {
                state.metrics.failures += 1;
                state.status = ActorStatus::Error;
            } else if state.in_flight == 0 {
                state.status = ActorStatus::Idle;
            }
        }
    }

    /// Snapshot of every role, in pipeline order.
    pub fn snapshot(&self) -> Vec<ActorState> {
        let states = self.states.read();
        ActorRole::ALL
            .iter()
            .filter_map(|role| states.get(role).cloned())
            .collect()
    }

    /// Current state of one role.
    pub fn get_state(&self, role: ActorRole) -> Option<ActorState> {
        self.states.read().get(&role).cloned()
    }

    /// Sum of metrics across all roles.
    pub fn aggregate_metrics(&self) -> ActorMetrics {
        let states = self.states.read();
        let mut total = ActorMetrics::default();
        for state in states.values() {
            total.invocations += state.metrics.invocations;
            total.failures += state.metrics.failures;
            total.duration_ms += state.metrics.duration_ms;
        }
        total
    }

    /// Per-role states plus the aggregate, as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "roles": self.snapshot(),
            "aggregate": self.aggregate_metrics(),
        })
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// One in-flight invocation; see [`RunMonitor::track`].
pub struct InvocationGuard<'a> {
    monitor: &'a RunMonitor,
    role: ActorRole,
    start: Instant,
    failed: bool,
}

impl InvocationGuard<'_> {
    /// Count this invocation as failed when it finishes.
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }
}

impl Drop for InvocationGuard<'_> {
    fn drop(&mut self) {
        self.monitor.finish_invocation(
            self.role,
            self.start.elapsed().as_millis() as u64,
            self.failed,
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let monitor = RunMonitor::new();
        let states = monitor.snapshot();
        assert_eq!(states.len(), 5);
        assert_eq!(states[0].role, ActorRole::Planner);
        for state in &states {
            assert_eq!(state.status, ActorStatus::Idle);
            assert_eq!(state.in_flight, 0);
        }
    }

    #[test]
    fn test_overlapping_invocations() {
        let monitor = RunMonitor::new();
        monitor.start_invocation(ActorRole::Worker);
        monitor.start_invocation(ActorRole::Worker);

        monitor.finish_invocation(ActorRole::Worker, 10, false);
        let state = monitor.get_state(ActorRole::Worker).unwrap();
        assert_eq!(state.in_flight, 1);
        assert_eq!(state.status, ActorStatus::Working);

        monitor.finish_invocation(ActorRole::Worker, 15, false);
        let state = monitor.get_state(ActorRole::Worker).unwrap();
        assert_eq!(state.status, ActorStatus::Idle);
        assert_eq!(state.metrics.invocations, 2);
        assert_eq!(state.metrics.duration_ms, 25);
    }

    #[test]
    fn test_record_failure() {
        let monitor = RunMonitor::new();
        monitor.start_invocation(ActorRole::Reviewer);
        monitor.finish_invocation(ActorRole::Reviewer, 3, true);
        let state = monitor.get_state(ActorRole::Reviewer).unwrap();
        assert_eq!(state.metrics.failures, 1);
        assert_eq!(state.status, ActorStatus::Error);
    }

    #[test]
    fn test_aggregate_and_json() {
        let monitor = RunMonitor::new();
        monitor.start_invocation(ActorRole::Planner);
        monitor.finish_invocation(ActorRole::Planner, 5, false);
        monitor.start_invocation(ActorRole::Manager);
        monitor.finish_invocation(ActorRole::Manager, 7, true);

        let agg = monitor.aggregate_metrics();
        assert_eq!(agg.invocations, 2);
        assert_eq!(agg.failures, 1);
        assert_eq!(agg.duration_ms, 12);

        let json = monitor.to_json();
        assert!(json["roles"].is_array());
        assert_eq!(json["aggregate"]["invocations"], 2);
    }

    #[test]
    fn test_guard_finishes_on_drop() {
        let monitor = RunMonitor::new();
        {
            let _guard = monitor.track(ActorRole::Planner);
            let state = monitor.get_state(ActorRole::Planner).unwrap();
            assert_eq!(state.in_flight, 1);
            assert_eq!(state.status, ActorStatus::Working);
        }
        let state = monitor.get_state(ActorRole::Planner).unwrap();
        assert_eq!(state.in_flight, 0);
        assert_eq!(state.status, ActorStatus::Idle);
        assert_eq!(state.metrics.failures, 0);
    }

    #[test]
    fn test_guard_marked_failed() {
        let monitor = RunMonitor::new();
        let mut guard = monitor.track(ActorRole::Worker);
        guard.mark_failed();
        drop(guard);
        let state = monitor.get_state(ActorRole::Worker).unwrap();
        assert_eq!(state.metrics.failures, 1);
        assert_eq!(state.status, ActorStatus::Error);
    }
}
