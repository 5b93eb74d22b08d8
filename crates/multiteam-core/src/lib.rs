//! Core types and error definitions for the multiteam orchestration engine.
//!
//! This crate provides the foundational types shared across all multiteam
//! crates: the error taxonomy, actor role labels, and the immutable record
//! produced by every actor invocation.
//!
//! # Main types
//!
//! - [`MultiteamError`] — Unified error enum for every orchestration layer.
//! - [`MultiteamResult`] — Convenience alias for `Result<T, MultiteamError>`.
//! - [`ActorRole`] — Descriptive role label (planner, manager, worker, ...).
//! - [`Completion`] — What a completion provider returns for one instruction.
//! - [`ActOutcome`] — One immutable record of a single actor invocation.
//! - [`ExecutionLog`] — Append-only, timestamp-ordered sequence of outcomes.

/// Error taxonomy.
pub mod error;
/// Actor invocation records.
pub mod outcome;

pub use error::{MultiteamError, MultiteamResult};
pub use outcome::{ActOutcome, ActorRole, Completion, ExecutionLog};
