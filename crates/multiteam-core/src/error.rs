use crate::outcome::ActOutcome;

/// A convenience `Result` alias using [`MultiteamError`].
pub type MultiteamResult<T> = Result<T, MultiteamError>;

/// Top-level error type for the orchestration engine.
///
/// Run-fatal conditions (planner/manager failures, global planning failures,
/// cancellation) surface as `Err` values. Worker failures, review exhaustion
/// and consolidation failures are normally recorded inside results instead;
/// their variants exist so callers can convert those markers into errors.
#[derive(Debug, thiserror::Error)]
pub enum MultiteamError {
    /// The actor's completion provider could not be resolved.
    #[error("actor '{actor}' unavailable: {reason}")]
    ActorUnavailable {
        /// Name of the actor.
        actor: String,
        /// Why the provider could not be resolved.
        reason: String,
    },

    /// The completion provider failed while generating.
    #[error("actor '{actor}' failed: {reason}")]
    ActorExecutionFailed {
        /// Name of the actor.
        actor: String,
        /// Provider error text.
        reason: String,
    },

    /// A worker slot ended in failure.
    #[error("worker '{worker}' failed: {reason}")]
    WorkerFailed {
        /// Name of the worker actor.
        worker: String,
        /// Error text recorded in the slot.
        reason: String,
    },

    /// The review loop hit its attempt cap without approval.
    #[error("review budget exceeded after {attempts} attempts")]
    ReviewBudgetExceeded {
        /// Number of worker dispatches made.
        attempts: u32,
        /// The last attempted result.
        last: Box<ActOutcome>,
    },

    /// The run was cancelled by the caller.
    #[error("run cancelled")]
    Cancelled,

    /// The global actor failed to decompose the goal.
    #[error("global planning failed: {0}")]
    GlobalPlanningFailed(#[source] Box<MultiteamError>),

    /// The global actor failed to consolidate team results.
    #[error("consolidation failed: {0}")]
    ConsolidationFailed(String),

    /// Invalid configuration record or option.
    #[error("config error: {0}")]
    Config(String),

    /// Project registry lookup or persistence failure.
    #[error("registry error: {0}")]
    Registry(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MultiteamError {
    /// Whether this error is a cancellation, which must never be recorded
    /// as a per-slot failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MultiteamError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MultiteamError::ActorUnavailable {
            actor: "planner-1".to_string(),
            reason: "unknown provider 'gpt'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "actor 'planner-1' unavailable: unknown provider 'gpt'"
        );
    }

    #[test]
    fn test_global_planning_wraps_source() {
        let inner = MultiteamError::ActorExecutionFailed {
            actor: "meta".to_string(),
            reason: "boom".to_string(),
        };
        let err = MultiteamError::GlobalPlanningFailed(Box::new(inner));
        assert!(err.to_string().contains("boom"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_is_cancelled() {
        assert!(MultiteamError::Cancelled.is_cancelled());
        assert!(!MultiteamError::Config("x".into()).is_cancelled());
    }
}
