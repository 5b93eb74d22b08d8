use crate::record::{ActorRecord, ProjectRecord, TeamRecord};
use multiteam_agent::{Actor, ProviderActor, ProviderResolver};
use multiteam_core::{ActorRole, MultiteamResult};
use multiteam_orchestrator::{Orchestrator, Team};
use std::sync::Arc;
use tracing::info;

fn build_actor(
    record: &ActorRecord,
    role: ActorRole,
    resolver: &Arc<dyn ProviderResolver>,
) -> Arc<dyn Actor> {
    Arc::new(ProviderActor::new(
        record.name.as_str(),
        role,
        record.provider.clone(),
        resolver.clone(),
    ))
}

/// Construct a team from its record. Providers are resolved lazily, on each
/// actor's first invocation.
pub fn build_team(record: &TeamRecord, resolver: Arc<dyn ProviderResolver>) -> MultiteamResult<Team> {
    record.review.to_config().validate()?;

    let workers = record
        .workers
        .iter()
        .map(|w| build_actor(w, ActorRole::Worker, &resolver))
        .collect();
    let mut team = Team::new(
        record.name.as_str(),
        build_actor(&record.planner, ActorRole::Planner, &resolver),
        build_actor(&record.manager, ActorRole::Manager, &resolver),
        workers,
    )
    .with_worker_mode(record.worker_mode());

    if let Some(reviewer) = &record.reviewer {
        team = team.with_reviewer(
            build_actor(reviewer, ActorRole::Reviewer, &resolver),
            record.review.to_config(),
        );
    }
    Ok(team)
}

/// Construct an orchestrator with every team of the project, in record order.
pub fn build_orchestrator(
    record: &ProjectRecord,
    resolver: Arc<dyn ProviderResolver>,
) -> MultiteamResult<Orchestrator> {
    record.validate()?;

    let mut orchestrator = Orchestrator::new();
    if let Some(global) = &record.global {
        orchestrator = orchestrator.with_global(build_actor(global, ActorRole::Meta, &resolver));
    }
    for team in &record.teams {
        orchestrator.add_team(build_team(team, resolver.clone())?);
    }
    info!(project = %record.id, teams = record.teams.len(), "Registry: orchestrator built");
    Ok(orchestrator)
}
