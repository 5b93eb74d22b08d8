use crate::review::{ReviewReport, ReviewStatus};
use multiteam_core::{ActOutcome, ActorRole, ExecutionLog, MultiteamError, MultiteamResult};
use serde::{Deserialize, Serialize};

/// Result of one worker slot in a team execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerSlot {
    /// The worker produced a result (possibly after review).
    Completed {
        /// The worker's (last) outcome.
        outcome: ActOutcome,
        /// Present when the team runs its workers through a review loop.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        review: Option<ReviewReport>,
    },
    /// The worker failed; siblings were unaffected.
    Failed {
        /// Name of the failed worker.
        worker: String,
        /// Display form of the worker's error.
        error: String,
    },
}

impl WorkerSlot {
    /// Name of the worker that owns this slot.
    pub fn worker(&self) -> &str {
        match self {
            WorkerSlot::Completed { outcome, .. } => &outcome.actor,
            WorkerSlot::Failed { worker, .. } => worker,
        }
    }

    /// Output text, if the worker completed.
    pub fn output(&self) -> Option<&str> {
        match self {
            WorkerSlot::Completed { outcome, .. } => Some(&outcome.output),
            WorkerSlot::Failed { .. } => None,
        }
    }

    /// Whether the worker failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, WorkerSlot::Failed { .. })
    }

    /// Whether the slot completed with less than a clean approval:
    /// review exhausted, or accepted on unparseable reviewer output.
    pub fn is_degraded(&self) -> bool {
        match self {
            WorkerSlot::Completed {
                review: Some(report),
                ..
            } => report.status != ReviewStatus::Accepted,
            _ => false,
        }
    }

    /// Convert the slot into its outcome, surfacing failures as
    /// [`MultiteamError::WorkerFailed`].
    pub fn into_result(self) -> MultiteamResult<ActOutcome> {
        match self {
            WorkerSlot::Completed { outcome, .. } => Ok(outcome),
            WorkerSlot::Failed { worker, error } => Err(MultiteamError::WorkerFailed {
                worker,
                reason: error,
            }),
        }
    }
}

/// Everything one `Team::execute` call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamResult {
    /// Name of the team.
    pub team: String,
    /// Plan, task breakdown, then one entry per worker.
    pub log: ExecutionLog,
    /// One slot per worker, in worker declaration order.
    pub final_outputs: Vec<WorkerSlot>,
}

impl TeamResult {
    /// The planner's outcome.
    pub fn plan(&self) -> Option<&ActOutcome> {
        self.log.entries().first()
    }

    /// The manager's outcome.
    pub fn tasks(&self) -> Option<&ActOutcome> {
        self.log.entries().get(1)
    }

    /// Output texts of completed slots, in declaration order.
    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.final_outputs.iter().filter_map(WorkerSlot::output)
    }

    /// Names of workers whose slot failed.
    pub fn failed_workers(&self) -> Vec<&str> {
        self.final_outputs
            .iter()
            .filter(|slot| slot.is_failed())
            .map(WorkerSlot::worker)
            .collect()
    }

    /// Whether every worker completed.
    pub fn is_complete(&self) -> bool {
        self.final_outputs.iter().all(|slot| !slot.is_failed())
    }
}

/// Outcome of the global consolidation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Consolidation {
    /// Flat mode: there is no global actor to consolidate.
    Skipped,
    /// The global actor's consolidated summary.
    Completed {
        /// Outcome of the consolidation call.
        summary: ActOutcome,
    },
    /// The global actor failed; team results are still present.
    Failed {
        /// Display form of the global actor's error.
        reason: String,
    },
}

/// Top-level artifact of one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectResult {
    /// The decomposition, absent in flat mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_plan: Option<ActOutcome>,
    /// One entry per team, in team declaration order.
    pub teams: Vec<TeamResult>,
    /// How the consolidation step ended.
    pub consolidation: Consolidation,
}

impl ProjectResult {
    /// The consolidated summary, when the global actor produced one.
    pub fn summary(&self) -> Option<&ActOutcome> {
        match &self.consolidation {
            Consolidation::Completed { summary } => Some(summary),
            _ => None,
        }
    }

    /// The summary as a result: [`Consolidation::Failed`] surfaces as
    /// [`MultiteamError::ConsolidationFailed`], a skipped step as `Ok(None)`.
    pub fn summary_result(&self) -> MultiteamResult<Option<&ActOutcome>> {
        match &self.consolidation {
            Consolidation::Skipped => Ok(None),
            Consolidation::Completed { summary } => Ok(Some(summary)),
            Consolidation::Failed { reason } => {
                Err(MultiteamError::ConsolidationFailed(reason.clone()))
            }
        }
    }

    /// Whether the global actor failed to consolidate.
    pub fn consolidation_failed(&self) -> bool {
        matches!(self.consolidation, Consolidation::Failed { .. })
    }

    /// Result of the named team.
    pub fn team(&self, name: &str) -> Option<&TeamResult> {
        self.teams.iter().find(|t| t.team == name)
    }
}

/// Counters tracked per actor role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorMetrics {
    /// Invocations started.
    pub invocations: u32,
    /// Invocations that ended in a non-cancellation error.
    pub failures: u32,
    /// Wall time summed over finished invocations.
    pub duration_ms: u64,
}

/// Real-time snapshot of one role's activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorState {
    /// The role these numbers belong to.
    pub role: ActorRole,
    /// Invocations currently in flight.
    pub in_flight: u32,
    /// Coarse activity status.
    pub status: ActorStatus,
    /// Counters since the monitor was created.
    pub metrics: ActorMetrics,
}

/// Coarse activity status of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorStatus {
    /// Nothing in flight.
    Idle,
    /// At least one invocation in flight.
    Working,
    /// The last finished invocation failed.
    Error,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use multiteam_core::Completion;

    fn outcome(actor: &str, role: ActorRole, output: &str) -> ActOutcome {
        ActOutcome::new(actor, role, "instr", Completion::text(output), Utc::now())
    }

    fn sample_team() -> TeamResult {
        let mut log = ExecutionLog::new();
        log.push(outcome("p", ActorRole::Planner, "plan"));
        log.push(outcome("m", ActorRole::Manager, "tasks"));
        log.push(outcome("w1", ActorRole::Worker, "one"));
        TeamResult {
            team: "alpha".into(),
            log,
            final_outputs: vec![
                WorkerSlot::Completed {
                    outcome: outcome("w1", ActorRole::Worker, "one"),
                    review: None,
                },
                WorkerSlot::Failed {
                    worker: "w2".into(),
                    error: "provider down".into(),
                },
            ],
        }
    }

    #[test]
    fn test_team_result_accessors() {
        let team = sample_team();
        assert_eq!(team.plan().unwrap().output, "plan");
        assert_eq!(team.tasks().unwrap().output, "tasks");
        assert_eq!(team.outputs().collect::<Vec<_>>(), vec!["one"]);
        assert_eq!(team.failed_workers(), vec!["w2"]);
        assert!(!team.is_complete());
    }

    #[test]
    fn test_failed_slot_into_result() {
        let slot = WorkerSlot::Failed {
            worker: "w2".into(),
            error: "provider down".into(),
        };
        assert_eq!(slot.worker(), "w2");
        assert!(slot.output().is_none());
        let err = slot.into_result().unwrap_err();
        assert!(matches!(err, MultiteamError::WorkerFailed { ref worker, .. } if worker == "w2"));
    }

    #[test]
    fn test_slot_serialization_is_tagged() {
        let json = serde_json::to_value(&sample_team().final_outputs).unwrap();
        assert_eq!(json[0]["status"], "completed");
        assert!(json[0].get("review").is_none());
        assert_eq!(json[1]["status"], "failed");
        assert_eq!(json[1]["error"], "provider down");
    }

    #[test]
    fn test_project_result_roundtrip() {
        let result = ProjectResult {
            global_plan: Some(outcome("meta", ActorRole::Meta, "split")),
            teams: vec![sample_team()],
            consolidation: Consolidation::Failed {
                reason: "meta offline".into(),
            },
        };
        let json = serde_json::to_string(&result).unwrap();
        let parsed: ProjectResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
        assert!(parsed.consolidation_failed());
        assert!(parsed.summary().is_none());
        assert!(parsed.team("alpha").is_some());
    }

    #[test]
    fn test_summary_result_by_consolidation() {
        let mut result = ProjectResult {
            global_plan: None,
            teams: vec![],
            consolidation: Consolidation::Skipped,
        };
        assert!(result.summary_result().unwrap().is_none());

        result.consolidation = Consolidation::Completed {
            summary: outcome("meta", ActorRole::Meta, "all done"),
        };
        assert_eq!(result.summary_result().unwrap().unwrap().output, "all done");

        result.consolidation = Consolidation::Failed {
            reason: "meta offline".into(),
        };
        let err = result.summary_result().unwrap_err();
        assert!(matches!(err, MultiteamError::ConsolidationFailed(ref reason) if reason == "meta offline"));
        assert_eq!(err.to_string(), "consolidation failed: meta offline");
    }

    #[test]
    fn test_skipped_consolidation_serialization() {
        let json = serde_json::to_value(Consolidation::Skipped).unwrap();
        assert_eq!(json["status"], "skipped");
    }
}
