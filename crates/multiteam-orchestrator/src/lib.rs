//! Team pipelines, bounded review loops and multi-team project orchestration.
//!
//! A [`Team`] runs plan → task breakdown → workers for one context. An
//! [`Orchestrator`] runs many teams concurrently, optionally decomposing the
//! goal and consolidating the results through a global actor.
//!
//! # Main types
//!
//! - [`Orchestrator`] — Runs a goal across teams and returns a [`ProjectResult`].
//! - [`Team`] — Fixed planner/manager/workers pipeline.
//! - [`ReviewLoop`] — Generate-review-regenerate cycle with an attempt cap.
//! - [`InstructionRouter`] — Turns the global plan into per-team context.
//! - [`RunMonitor`] — Per-role invocation metrics.

/// Per-run cancellation and the actor dispatch point.
pub mod context;
/// Orchestrator engine.
pub mod engine;
/// Per-role metrics monitoring.
pub mod monitor;
/// Instruction wording for every pipeline step.
pub mod prompts;
/// Bounded review loop.
pub mod review;
/// Global plan → team context routing.
pub mod routing;
/// Team pipeline.
pub mod team;
/// Shared result types (TeamResult, ProjectResult, WorkerSlot, etc.).
pub mod types;
/// Reviewer output parsing.
pub mod verdict;

pub use context::{dispatch, RunContext};
pub use engine::Orchestrator;
pub use monitor::{InvocationGuard, RunMonitor};
pub use prompts::InstructionTemplates;
pub use review::{ReviewAttempt, ReviewConfig, ReviewLoop, ReviewOutcome, ReviewReport, ReviewStatus};
pub use routing::{BroadcastRouter, InstructionRouter, StructuredRouter};
pub use team::{Team, TeamOptions, WorkerMode};
pub use types::{
    ActorMetrics, ActorState, ActorStatus, Consolidation, ProjectResult, TeamResult, WorkerSlot,
};
pub use verdict::{parse_verdict, ReviewVerdict, UnparseablePolicy, VerdictParseError};
pub use tokio_util::sync::CancellationToken;
