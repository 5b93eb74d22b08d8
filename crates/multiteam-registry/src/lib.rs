//! Project definitions and their persistence.
//!
//! Records here are plain serde data with no engine types inside; the
//! builders turn them into a live [`Orchestrator`](multiteam_orchestrator::Orchestrator).

pub mod builder;
pub mod record;
pub mod store;

pub use builder::{build_orchestrator, build_team};
pub use record::{ActorRecord, ProjectRecord, ProjectSummary, ReviewRecord, TeamRecord};
pub use store::{FileProjectRegistry, InMemoryProjectRegistry, ProjectRegistry};
