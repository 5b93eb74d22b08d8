use crate::context::{dispatch, RunContext};
use crate::prompts::InstructionTemplates;
use crate::review::{ReviewConfig, ReviewLoop, ReviewReport};
use crate::types::{TeamResult, WorkerSlot};
use chrono::Utc;
use futures_util::future::join_all;
use multiteam_agent::Actor;
use multiteam_core::{ActOutcome, ExecutionLog, MultiteamResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// How a team runs its workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerMode {
    /// All workers at once; results still follow declaration order.
    #[default]
    Concurrent,
    /// One worker after another, in declaration order.
    Sequential,
}

/// Execution options of a team.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamOptions {
    /// How workers are scheduled.
    pub worker_mode: WorkerMode,
    /// Used only when the team has a reviewer.
    pub review: ReviewConfig,
    /// Instruction wording for every pipeline step.
    pub templates: InstructionTemplates,
}

/// A fixed pipeline of one planner, one manager and N workers.
///
/// Configuration is immutable after construction; every `execute` call is
/// independent of the previous ones.
#[derive(Clone)]
pub struct Team {
    name: String,
    planner: Arc<dyn Actor>,
    manager: Arc<dyn Actor>,
    workers: Vec<Arc<dyn Actor>>,
    reviewer: Option<Arc<dyn Actor>>,
    options: TeamOptions,
}

type WorkerRun = MultiteamResult<(ActOutcome, Option<ReviewReport>)>;

impl Team {
    /// A team with default options and no reviewer.
    pub fn new(
        name: impl Into<String>,
        planner: Arc<dyn Actor>,
        manager: Arc<dyn Actor>,
        workers: Vec<Arc<dyn Actor>>,
    ) -> Self {
        Self {
            name: name.into(),
            planner,
            manager,
            workers,
            reviewer: None,
            options: TeamOptions::default(),
        }
    }

    /// Wrap every worker call in a review loop judged by `reviewer`.
    pub fn with_reviewer(mut self, reviewer: Arc<dyn Actor>, config: ReviewConfig) -> Self {
        self.reviewer = Some(reviewer);
        self.options.review = config;
        self
    }

    /// Run workers concurrently or one after another.
    pub fn with_worker_mode(mut self, mode: WorkerMode) -> Self {
        self.options.worker_mode = mode;
        self
    }

    /// Replace the instruction wording.
    pub fn with_templates(mut self, templates: InstructionTemplates) -> Self {
        self.options.templates = templates;
        self
    }

    /// Team name, as reported in [`TeamResult::team`].
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The planning actor.
    pub fn planner(&self) -> &Arc<dyn Actor> {
        &self.planner
    }

    /// The task breakdown actor.
    pub fn manager(&self) -> &Arc<dyn Actor> {
        &self.manager
    }

    /// Workers in declaration order.
    pub fn workers(&self) -> &[Arc<dyn Actor>] {
        &self.workers
    }

    /// The reviewer, if worker output is reviewed.
    pub fn reviewer(&self) -> Option<&Arc<dyn Actor>> {
        self.reviewer.as_ref()
    }

    /// Execution options.
    pub fn options(&self) -> &TeamOptions {
        &self.options
    }

    /// Run the pipeline with a fresh, uncancellable context.
    pub async fn execute(&self, context: &str) -> MultiteamResult<TeamResult> {
        self.execute_with(context, &RunContext::new()).await
    }

    /// Run plan → breakdown → workers for one context.
    ///
    /// Planner and manager failures abort and propagate. Worker failures are
    /// recorded in their slot. Cancellation aborts with
    /// [`MultiteamError::Cancelled`](multiteam_core::MultiteamError::Cancelled).
    pub async fn execute_with(&self, context: &str, ctx: &RunContext) -> MultiteamResult<TeamResult> {
        let templates = &self.options.templates;
        info!(team = %self.name, workers = self.workers.len(), "Team: starting execution");

        let mut log = ExecutionLog::new();

        let plan = dispatch(self.planner.as_ref(), &templates.plan(context), ctx)
            .await
            .inspect_err(|e| error!(team = %self.name, error = %e, "Team: planning failed"))?;
        log.push(plan.clone());

        let tasks = dispatch(self.manager.as_ref(), &templates.breakdown(&plan.output), ctx)
            .await
            .inspect_err(|e| error!(team = %self.name, error = %e, "Team: task breakdown failed"))?;
        log.push(tasks.clone());

        let instruction = templates.execute(&tasks.output);
        let runs: Vec<(chrono::DateTime<Utc>, WorkerRun)> = match self.options.worker_mode {
            WorkerMode::Concurrent => {
                join_all(
                    self.workers
                        .iter()
                        .map(|worker| self.run_worker(worker, &instruction, ctx)),
                )
                .await
            }
            WorkerMode::Sequential => {
                let mut runs = Vec::with_capacity(self.workers.len());
                for worker in &self.workers {
                    let run = self.run_worker(worker, &instruction, ctx).await;
                    let cancelled = matches!(&run.1, Err(e) if e.is_cancelled());
                    runs.push(run);
                    if cancelled {
                        break;
                    }
                }
                runs
            }
        };

        let mut final_outputs = Vec::with_capacity(self.workers.len());
        for (worker, (started_at, run)) in self.workers.iter().zip(runs) {
            match run {
                Ok((outcome, review)) => {
                    log.push(outcome.clone());
                    final_outputs.push(WorkerSlot::Completed { outcome, review });
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(team = %self.name, worker = %worker.name(), error = %e, "Team: worker failed");
                    let reason = e.to_string();
                    log.push(ActOutcome::failed(
                        worker.name(),
                        worker.role(),
                        instruction.as_str(),
                        reason.as_str(),
                        started_at,
                    ));
                    final_outputs.push(WorkerSlot::Failed {
                        worker: worker.name().to_string(),
                        error: reason,
                    });
                }
            }
        }
        ctx.check()?;

        info!(
            team = %self.name,
            completed = final_outputs.iter().filter(|s| !s.is_failed()).count(),
            failed = final_outputs.iter().filter(|s| s.is_failed()).count(),
            "Team: execution complete"
        );

        Ok(TeamResult {
            team: self.name.clone(),
            log,
            final_outputs,
        })
    }

    async fn run_worker(
        &self,
        worker: &Arc<dyn Actor>,
        instruction: &str,
        ctx: &RunContext,
    ) -> (chrono::DateTime<Utc>, WorkerRun) {
        let started_at = Utc::now();
        let run = match &self.reviewer {
            None => dispatch(worker.as_ref(), instruction, ctx)
                .await
                .map(|outcome| (outcome, None)),
            Some(reviewer) => ReviewLoop::new(worker.clone(), reviewer.clone(), self.options.review.clone())
                .with_templates(self.options.templates.clone())
                .run(instruction, ctx)
                .await
                .map(|reviewed| (reviewed.outcome, Some(reviewed.report))),
        };
        (started_at, run)
    }
}

impl std::fmt::Debug for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Team")
            .field("name", &self.name)
            .field("planner", &self.planner.name())
            .field("manager", &self.manager.name())
            .field(
                "workers",
                &self.workers.iter().map(|w| w.name()).collect::<Vec<_>>(),
            )
            .field("reviewer", &self.reviewer.as_ref().map(|r| r.name()))
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use multiteam_core::{ActorRole, Completion, MultiteamError};

    struct Stub {
        name: &'static str,
        role: ActorRole,
        fail: bool,
    }

    fn stub(name: &'static str, role: ActorRole) -> Arc<dyn Actor> {
        Arc::new(Stub {
            name,
            role,
            fail: false,
        })
    }

    fn failing(name: &'static str, role: ActorRole) -> Arc<dyn Actor> {
        Arc::new(Stub {
            name,
            role,
            fail: true,
        })
    }

    #[async_trait]
    impl Actor for Stub {
        fn name(&self) -> &str {
            self.name
        }

        fn role(&self) -> ActorRole {
            self.role
        }

        async fn act(&self, instruction: &str) -> MultiteamResult<ActOutcome> {
            if self.fail {
                return Err(MultiteamError::ActorExecutionFailed {
                    actor: self.name.to_string(),
                    reason: "stub failure".to_string(),
                });
            }
            Ok(ActOutcome::new(
                self.name,
                self.role,
                instruction,
                Completion::text(format!("{}: {instruction}", self.name)),
                Utc::now(),
            ))
        }
    }

    #[tokio::test]
    async fn test_zero_workers_two_entry_log() {
        let team = Team::new(
            "empty",
            stub("p", ActorRole::Planner),
            stub("m", ActorRole::Manager),
            vec![],
        );
        let result = team.execute("ship a blog").await.unwrap();
        assert!(result.final_outputs.is_empty());
        assert_eq!(result.log.len(), 2);
        assert_eq!(result.log.entries()[0].role, ActorRole::Planner);
        assert_eq!(result.log.entries()[1].role, ActorRole::Manager);
    }

    #[tokio::test]
    async fn test_stage_instructions_chain() {
        let team = Team::new(
            "chain",
            stub("p", ActorRole::Planner),
            stub("m", ActorRole::Manager),
            vec![stub("w", ActorRole::Worker)],
        );
        let result = team.execute("goal").await.unwrap();

        let plan = result.plan().unwrap();
        assert_eq!(plan.instruction, "produce a technical plan for: goal");
        let tasks = result.tasks().unwrap();
        assert_eq!(
            tasks.instruction,
            format!("break the following plan into concrete, assignable work items: {}", plan.output)
        );
        let work = result.final_outputs[0].clone().into_result().unwrap();
        assert_eq!(work.instruction, format!("execute: {}", tasks.output));
    }

    #[tokio::test]
    async fn test_planner_failure_aborts() {
        let team = Team::new(
            "broken",
            failing("p", ActorRole::Planner),
            stub("m", ActorRole::Manager),
            vec![stub("w", ActorRole::Worker)],
        );
        let err = team.execute("goal").await.unwrap_err();
        assert!(matches!(err, MultiteamError::ActorExecutionFailed { ref actor, .. } if actor == "p"));
    }

    #[tokio::test]
    async fn test_manager_failure_aborts() {
        let team = Team::new(
            "broken",
            stub("p", ActorRole::Planner),
            failing("m", ActorRole::Manager),
            vec![stub("w", ActorRole::Worker)],
        );
        assert!(team.execute("goal").await.is_err());
    }

    #[tokio::test]
    async fn test_worker_failure_is_isolated() {
        for mode in [WorkerMode::Concurrent, WorkerMode::Sequential] {
            let team = Team::new(
                "mixed",
                stub("p", ActorRole::Planner),
                stub("m", ActorRole::Manager),
                vec![
                    stub("w0", ActorRole::Worker),
                    failing("w1", ActorRole::Worker),
                    stub("w2", ActorRole::Worker),
                ],
            )
            .with_worker_mode(mode);

            let result = team.execute("goal").await.unwrap();
            assert_eq!(result.final_outputs.len(), 3);
            assert!(!result.final_outputs[0].is_failed());
            assert!(result.final_outputs[1].is_failed());
            assert!(!result.final_outputs[2].is_failed());
            assert_eq!(result.failed_workers(), vec!["w1"]);

            // plan + tasks + one entry per worker
            assert_eq!(result.log.len(), 5);
            let failed_entry = &result.log.entries()[3];
            assert_eq!(failed_entry.actor, "w1");
            assert!(failed_entry.is_failure());
        }
    }

    #[tokio::test]
    async fn test_reviewed_workers_carry_report() {
        struct Approver;

        #[async_trait]
        impl Actor for Approver {
            fn name(&self) -> &str {
                "approver"
            }

            fn role(&self) -> ActorRole {
                ActorRole::Reviewer
            }

            async fn act(&self, instruction: &str) -> MultiteamResult<ActOutcome> {
                Ok(ActOutcome::new(
                    "approver",
                    ActorRole::Reviewer,
                    instruction,
                    Completion::text(r#"{"approved": true}"#),
                    Utc::now(),
                ))
            }
        }

        let team = Team::new(
            "reviewed",
            stub("p", ActorRole::Planner),
            stub("m", ActorRole::Manager),
            vec![stub("w0", ActorRole::Worker), stub("w1", ActorRole::Worker)],
        )
        .with_reviewer(Arc::new(Approver), ReviewConfig::new(2));

        let result = team.execute("goal").await.unwrap();
        assert_eq!(result.log.len(), 4);
        for slot in &result.final_outputs {
            match slot {
                WorkerSlot::Completed {
                    review: Some(report),
                    ..
                } => assert_eq!(report.attempt_count(), 1),
                other => panic!("Expected reviewed slot, got {other:?}"),
            }
            assert!(!slot.is_degraded());
        }
    }

    #[tokio::test]
    async fn test_cancelled_team_returns_cancelled() {
        let team = Team::new(
            "t",
            stub("p", ActorRole::Planner),
            stub("m", ActorRole::Manager),
            vec![stub("w", ActorRole::Worker)],
        );
        let ctx = RunContext::new();
        ctx.cancel_token().cancel();
        let err = team.execute_with("goal", &ctx).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
