//! How a global plan becomes per-team context.

use crate::team::Team;
use crate::verdict::extract_json_object;
use multiteam_core::ActOutcome;
use serde_json::Value;

/// Derives the context a team receives from the global plan.
pub trait InstructionRouter: Send + Sync {
    /// Context for the team at `index` in declaration order.
    fn route(&self, team: &Team, index: usize, plan: &ActOutcome) -> String;
}

/// Sends every team the whole plan, prefixed with the team's name.
#[derive(Debug, Clone, Copy, Default)]
pub struct BroadcastRouter;

impl InstructionRouter for BroadcastRouter {
    fn route(&self, team: &Team, _index: usize, plan: &ActOutcome) -> String {
        format!("{}: {}", team.name(), plan.output)
    }
}

/// Reads a JSON object keyed by team name out of the plan and hands each
/// team its own entry. Teams without an entry get the broadcast context.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredRouter;

impl StructuredRouter {
    fn entry_for(team: &str, plan: &str) -> Option<String> {
        let raw = extract_json_object(plan)?;
        let Value::Object(map) = serde_json::from_str::<Value>(raw).ok()? else {
            return None;
        };
        match map.get(team)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl InstructionRouter for StructuredRouter {
    fn route(&self, team: &Team, index: usize, plan: &ActOutcome) -> String {
        match Self::entry_for(team.name(), &plan.output) {
            Some(context) => context,
            None => BroadcastRouter.route(team, index, plan),
        }
    }
}
