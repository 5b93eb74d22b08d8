//! Actor contract and completion-provider plumbing.
//!
//! An [`Actor`] turns an instruction into an [`ActOutcome`](multiteam_core::ActOutcome).
//! [`ProviderActor`] is the standard implementation: it resolves a
//! [`CompletionProvider`] lazily through a [`ProviderResolver`] and memoizes
//! the handle for its lifetime.

pub mod actor;
pub mod config;
pub mod provider;

pub use actor::{Actor, ProviderActor};
pub use config::ProviderConfig;
pub use provider::{CompletionProvider, EchoProvider, ProviderFactory, ProviderRegistry, ProviderResolver};
