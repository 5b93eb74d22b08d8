use crate::context::{dispatch, RunContext};
use crate::monitor::RunMonitor;
use crate::prompts::InstructionTemplates;
use crate::routing::{BroadcastRouter, InstructionRouter};
use crate::team::Team;
use crate::types::{Consolidation, ProjectResult, TeamResult, WorkerSlot};
use futures_util::future::try_join_all;
use multiteam_agent::Actor;
use multiteam_core::{MultiteamError, MultiteamResult};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Runs a project goal across a set of teams.
/// Implements the decompose → fan out → consolidate pattern.
///
/// Without a global actor the goal goes verbatim to every team and the run
/// ends with [`Consolidation::Skipped`]. Teams are added through `&mut self`
/// and runs borrow `&self`, so the team list cannot change mid-run.
pub struct Orchestrator {
    teams: Vec<Team>,
    global: Option<Arc<dyn Actor>>,
    router: Arc<dyn InstructionRouter>,
    templates: InstructionTemplates,
    monitor: Arc<RunMonitor>,
}

impl Orchestrator {
    /// An orchestrator in flat mode with no teams.
    pub fn new() -> Self {
        Self {
            teams: Vec::new(),
            global: None,
            router: Arc::new(BroadcastRouter),
            templates: InstructionTemplates::default(),
            monitor: Arc::new(RunMonitor::new()),
        }
    }

    /// Decompose goals and consolidate results with `actor`.
    pub fn with_global(mut self, actor: Arc<dyn Actor>) -> Self {
        self.global = Some(actor);
        self
    }

    /// Choose how the global plan becomes per-team context.
    pub fn with_router(mut self, router: Arc<dyn InstructionRouter>) -> Self {
        self.router = router;
        self
    }

    /// Replace the decompose and consolidate wording.
    pub fn with_templates(mut self, templates: InstructionTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Append a team; teams run and report in the order they were added.
    pub fn add_team(&mut self, team: Team) {
        info!(team = %team.name(), "Orchestrator: team added");
        self.teams.push(team);
    }

    /// Teams in the order they were added.
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// The global actor, if any.
    pub fn global(&self) -> Option<&Arc<dyn Actor>> {
        self.global.as_ref()
    }

    /// Get a reference to the monitor.
    pub fn monitor(&self) -> &Arc<RunMonitor> {
        &self.monitor
    }

    /// Run a goal to completion. The run cannot be cancelled from outside;
    /// use [`run_project_with`](Self::run_project_with) for that.
    pub async fn run_project(&self, goal: &str) -> MultiteamResult<ProjectResult> {
        self.run_project_with(goal, &CancellationToken::new()).await
    }

    /// Run a goal, aborting with [`MultiteamError::Cancelled`] once `cancel`
    /// fires.
    pub async fn run_project_with(
        &self,
        goal: &str,
        cancel: &CancellationToken,
    ) -> MultiteamResult<ProjectResult> {
        let start = Instant::now();
        let ctx = RunContext::with_parts(cancel.clone(), self.monitor.clone());
        info!(
            goal = %goal,
            teams = self.teams.len(),
            global = self.global.is_some(),
            "Orchestrator: starting project"
        );

        let result = match &self.global {
            None => {
                let contexts = vec![goal.to_string(); self.teams.len()];
                let teams = self.run_teams(contexts, &ctx).await?;
                ProjectResult {
                    global_plan: None,
                    teams,
                    consolidation: Consolidation::Skipped,
                }
            }
            Some(global) => self.run_global(global.as_ref(), goal, &ctx).await?,
        };
        ctx.check()?;

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            teams = result.teams.len(),
            consolidation_failed = result.consolidation_failed(),
            "Orchestrator: project complete"
        );
        Ok(result)
    }

    async fn run_global(
        &self,
        global: &dyn Actor,
        goal: &str,
        ctx: &RunContext,
    ) -> MultiteamResult<ProjectResult> {
        info!("Orchestrator: decomposing goal");
        let plan = match dispatch(global, &self.templates.decompose(goal), ctx).await {
            Ok(plan) => plan,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                error!(actor = %global.name(), error = %e, "Orchestrator: global planning failed");
                return Err(MultiteamError::GlobalPlanningFailed(Box::new(e)));
            }
        };

        let contexts = self
            .teams
            .iter()
            .enumerate()
            .map(|(index, team)| self.router.route(team, index, &plan))
            .collect();
        let teams = self.run_teams(contexts, ctx).await?;

        info!("Orchestrator: consolidating team results");
        let digest = team_digest(&teams).to_string();
        let consolidation = match dispatch(global, &self.templates.consolidate(&digest), ctx).await {
            Ok(summary) => Consolidation::Completed { summary },
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!(actor = %global.name(), error = %e, "Orchestrator: consolidation failed, keeping team results");
                Consolidation::Failed {
                    reason: e.to_string(),
                }
            }
        };

        Ok(ProjectResult {
            global_plan: Some(plan),
            teams,
            consolidation,
        })
    }

    /// Execute every team concurrently; the first fatal team error drops the rest.
    async fn run_teams(
        &self,
        contexts: Vec<String>,
        ctx: &RunContext,
    ) -> MultiteamResult<Vec<TeamResult>> {
        try_join_all(
            self.teams
                .iter()
                .zip(contexts)
                .map(|(team, context)| async move { team.execute_with(&context, ctx).await }),
        )
        .await
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("teams", &self.teams)
            .field("global", &self.global.as_ref().map(|g| g.name()))
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

/// JSON summary of team outputs handed to the consolidation step.
fn team_digest(teams: &[TeamResult]) -> Value {
    Value::Array(
        teams
            .iter()
            .map(|team| {
                let workers: Vec<Value> = team
                    .final_outputs
                    .iter()
                    .map(|slot| match slot {
                        WorkerSlot::Completed { outcome, .. } => {
                            json!({ "worker": outcome.actor, "output": outcome.output })
                        }
                        WorkerSlot::Failed { worker, error } => {
                            json!({ "worker": worker, "error": error })
                        }
                    })
                    .collect();
                json!({
                    "team": team.team,
                    "plan": team.plan().map(|p| p.output.as_str()),
                    "workers": workers,
                })
            })
            .collect(),
    )
}
