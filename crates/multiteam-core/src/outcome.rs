use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role label applied to an actor.
///
/// Roles are descriptive metadata used for logging and metrics; the engine
/// never branches on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    /// Produces a technical plan from a goal.
    Planner,
    /// Breaks a plan into assignable work items.
    Manager,
    /// Executes work items.
    Worker,
    /// Judges worker output and may request corrections.
    Reviewer,
    /// Project-level actor that decomposes goals across teams and consolidates.
    Meta,
}

impl ActorRole {
    /// All roles, in pipeline order.
    pub const ALL: [ActorRole; 5] = [
        ActorRole::Planner,
        ActorRole::Manager,
        ActorRole::Worker,
        ActorRole::Reviewer,
        ActorRole::Meta,
    ];
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActorRole::Planner => write!(f, "planner"),
            ActorRole::Manager => write!(f, "manager"),
            ActorRole::Worker => write!(f, "worker"),
            ActorRole::Reviewer => write!(f, "reviewer"),
            ActorRole::Meta => write!(f, "meta"),
        }
    }
}

/// The answer a completion provider gives for one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// The produced text.
    pub output: String,
    /// Optional free-form rationale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
}

impl Completion {
    /// A completion with output only.
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            thought: None,
        }
    }

    /// Attach a rationale.
    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }
}

/// One immutable record of a single actor invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActOutcome {
    /// When the invocation started.
    pub timestamp: DateTime<Utc>,
    /// Name of the actor that was invoked.
    pub actor: String,
    /// Role label of the actor.
    pub role: ActorRole,
    /// The instruction the actor received.
    pub instruction: String,
    /// Optional rationale returned alongside the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    /// The produced text. Empty for failure records.
    pub output: String,
    /// Error text when this record stands for a failed invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl ActOutcome {
    /// Build the record of a successful invocation.
    pub fn new(
        actor: impl Into<String>,
        role: ActorRole,
        instruction: impl Into<String>,
        completion: Completion,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp: started_at,
            actor: actor.into(),
            role,
            instruction: instruction.into(),
            thought: completion.thought,
            output: completion.output,
            failure: None,
        }
    }

    /// Build the record of a failed invocation.
    pub fn failed(
        actor: impl Into<String>,
        role: ActorRole,
        instruction: impl Into<String>,
        reason: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp: started_at,
            actor: actor.into(),
            role,
            instruction: instruction.into(),
            thought: None,
            output: String::new(),
            failure: Some(reason.into()),
        }
    }

    /// Whether this record stands for a failed invocation.
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Append-only sequence of [`ActOutcome`]s in invocation order.
///
/// Timestamps never decrease along the log: an entry older than its
/// predecessor is clamped to the predecessor's timestamp on append.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionLog {
    entries: Vec<ActOutcome>,
}

impl ExecutionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome.
    pub fn push(&mut self, mut outcome: ActOutcome) {
        if let Some(last) = self.entries.last() {
            if outcome.timestamp < last.timestamp {
                outcome.timestamp = last.timestamp;
            }
        }
        self.entries.push(outcome);
    }

    /// All entries in append order.
    pub fn entries(&self) -> &[ActOutcome] {
        &self.entries
    }

    /// Iterate over entries in append order.
    pub fn iter(&self) -> std::slice::Iter<'_, ActOutcome> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recently appended entry.
    pub fn last(&self) -> Option<&ActOutcome> {
        self.entries.last()
    }

    /// Consume the log, returning its entries.
    pub fn into_entries(self) -> Vec<ActOutcome> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a ExecutionLog {
    type Item = &'a ActOutcome;
    type IntoIter = std::slice::Iter<'a, ActOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn outcome_at(actor: &str, at: DateTime<Utc>) -> ActOutcome {
        ActOutcome::new(actor, ActorRole::Worker, "do it", Completion::text("done"), at)
    }

    #[test]
    fn test_role_display() {
        assert_eq!(ActorRole::Planner.to_string(), "planner");
        assert_eq!(ActorRole::Meta.to_string(), "meta");
        let json = serde_json::to_string(&ActorRole::Reviewer).unwrap();
        assert_eq!(json, "\"reviewer\"");
    }

    #[test]
    fn test_outcome_carries_completion() {
        let completion = Completion::text("plan ready").with_thought("short goal");
        let outcome = ActOutcome::new("p", ActorRole::Planner, "plan", completion, Utc::now());
        assert_eq!(outcome.output, "plan ready");
        assert_eq!(outcome.thought.as_deref(), Some("short goal"));
        assert!(!outcome.is_failure());
    }

    #[test]
    fn test_failed_outcome_omits_optional_fields_when_absent() {
        let ok = outcome_at("w", Utc::now());
        let json = serde_json::to_value(&ok).unwrap();
        assert!(json.get("failure").is_none());
        assert!(json.get("thought").is_none());

        let failed = ActOutcome::failed("w", ActorRole::Worker, "do it", "timeout", Utc::now());
        assert!(failed.is_failure());
        assert!(failed.output.is_empty());
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["failure"], "timeout");
    }

    #[test]
    fn test_log_clamps_out_of_order_timestamps() {
        let now = Utc::now();
        let mut log = ExecutionLog::new();
        log.push(outcome_at("a", now));
        log.push(outcome_at("b", now - Duration::seconds(5)));
        log.push(outcome_at("c", now + Duration::seconds(1)));

        assert_eq!(log.len(), 3);
        let stamps: Vec<_> = log.iter().map(|o| o.timestamp).collect();
        assert_eq!(stamps[1], now);
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(log.entries()[1].actor, "b");
    }

    #[test]
    fn test_log_serializes_as_array() {
        let mut log = ExecutionLog::new();
        log.push(outcome_at("a", Utc::now()));
        let json = serde_json::to_value(&log).unwrap();
        assert!(json.is_array());
        let parsed: ExecutionLog = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, log);
    }
}
