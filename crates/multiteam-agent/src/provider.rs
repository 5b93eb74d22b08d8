use crate::config::ProviderConfig;
use async_trait::async_trait;
use multiteam_core::{Completion, MultiteamError, MultiteamResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for the external capability that actually produces text.
///
/// Model inference, HTTP clients and the like live behind this trait; the
/// orchestration engine only ever sees instructions going in and
/// [`Completion`]s coming out.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Produce a completion for one instruction.
    async fn complete(&self, instruction: &str) -> MultiteamResult<Completion>;
}

/// Resolves a [`ProviderConfig`] into a live provider handle.
///
/// Resolution may be expensive (loading a model, checking credentials);
/// [`ProviderActor`](crate::ProviderActor) calls it at most once per actor
/// once it succeeds.
#[async_trait]
pub trait ProviderResolver: Send + Sync {
    /// Resolve the provider described by `config`.
    async fn resolve(&self, config: &ProviderConfig)
        -> MultiteamResult<Arc<dyn CompletionProvider>>;
}

/// Factory that builds a provider from its configuration.
pub type ProviderFactory =
    Arc<dyn Fn(&ProviderConfig) -> MultiteamResult<Arc<dyn CompletionProvider>> + Send + Sync>;

/// Name-keyed table of provider factories.
///
/// This is an owned object handed to whatever builds actors; there is no
/// process-wide provider table.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in providers (`echo`).
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            "echo",
            Arc::new(
                |config: &ProviderConfig| -> MultiteamResult<Arc<dyn CompletionProvider>> {
                    let label = config.model.clone().unwrap_or_else(|| "echo".to_string());
                    Ok(Arc::new(EchoProvider::new(label)))
                },
            ),
        );
        registry
    }

    /// Register (or replace) a factory under `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: ProviderFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Register a factory that always hands out the same provider instance.
    pub fn register_instance(&mut self, name: impl Into<String>, provider: Arc<dyn CompletionProvider>) {
        self.register(
            name,
            Arc::new(
                move |_: &ProviderConfig| -> MultiteamResult<Arc<dyn CompletionProvider>> {
                    Ok(provider.clone())
                },
            ),
        );
    }

    /// Whether a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

#[async_trait]
impl ProviderResolver for ProviderRegistry {
    async fn resolve(
        &self,
        config: &ProviderConfig,
    ) -> MultiteamResult<Arc<dyn CompletionProvider>> {
        let factory = self.factories.get(&config.provider).ok_or_else(|| {
            MultiteamError::Config(format!("unknown provider '{}'", config.provider))
        })?;
        factory(config)
    }
}

/// Provider that answers with `"<label> processed: <instruction>"`.
#[derive(Debug, Clone)]
pub struct EchoProvider {
    label: String,
}

impl EchoProvider {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for EchoProvider {
    async fn complete(&self, instruction: &str) -> MultiteamResult<Completion> {
        Ok(Completion::text(format!(
            "{} processed: {instruction}",
            self.label
        )))
    }
}
