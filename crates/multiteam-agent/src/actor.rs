use crate::config::ProviderConfig;
use crate::provider::{CompletionProvider, ProviderResolver};
use async_trait::async_trait;
use chrono::Utc;
use multiteam_core::{ActOutcome, ActorRole, MultiteamError, MultiteamResult};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// The minimal capability contract of the engine: given an instruction,
/// produce an [`ActOutcome`].
///
/// The role is descriptive metadata; the engine never branches on it.
/// Implementations must not retry internally.
#[async_trait]
pub trait Actor: Send + Sync {
    /// Identity used in logs and outcomes.
    fn name(&self) -> &str;

    /// Role label.
    fn role(&self) -> ActorRole;

    /// Perform one unit of work.
    async fn act(&self, instruction: &str) -> MultiteamResult<ActOutcome>;
}

/// Actor backed by a [`CompletionProvider`] that is resolved on first use.
///
/// A successful resolution is memoized for the actor's lifetime; a failed
/// one is not, so a later call resolves again.
pub struct ProviderActor {
    name: String,
    role: ActorRole,
    config: ProviderConfig,
    resolver: Arc<dyn ProviderResolver>,
    provider: OnceCell<Arc<dyn CompletionProvider>>,
}

impl ProviderActor {
    pub fn new(
        name: impl Into<String>,
        role: ActorRole,
        config: ProviderConfig,
        resolver: Arc<dyn ProviderResolver>,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            config,
            resolver,
            provider: OnceCell::new(),
        }
    }

    /// The provider configuration this actor was built from.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Whether the provider has been resolved yet.
    pub fn is_initialized(&self) -> bool {
        self.provider.initialized()
    }

    async fn provider(&self) -> MultiteamResult<&Arc<dyn CompletionProvider>> {
        self.provider
            .get_or_try_init(|| async {
                debug!(actor = %self.name, provider = %self.config.provider, "Resolving provider");
                self.resolver.resolve(&self.config).await
            })
            .await
            .map_err(|e| {
                warn!(actor = %self.name, error = %e, "Provider resolution failed");
                MultiteamError::ActorUnavailable {
                    actor: self.name.clone(),
                    reason: e.to_string(),
                }
            })
    }
}

impl std::fmt::Debug for ProviderActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderActor")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("provider", &self.config.provider)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[async_trait]
impl Actor for ProviderActor {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> ActorRole {
        self.role
    }

    async fn act(&self, instruction: &str) -> MultiteamResult<ActOutcome> {
        let started_at = Utc::now();
        let provider = self.provider().await?;

        let completion = provider.complete(instruction).await.map_err(|e| match e {
            MultiteamError::ActorUnavailable { .. } | MultiteamError::Cancelled => e,
            other => MultiteamError::ActorExecutionFailed {
                actor: self.name.clone(),
                reason: other.to_string(),
            },
        })?;

        Ok(ActOutcome::new(
            self.name.clone(),
            self.role,
            instruction,
            completion,
            started_at,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::provider::{EchoProvider, ProviderRegistry};
    use multiteam_core::Completion;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Resolver that counts resolutions and fails the first `fail_first` calls.
    struct CountingResolver {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl ProviderResolver for CountingResolver {
        async fn resolve(
            &self,
            _config: &ProviderConfig,
        ) -> MultiteamResult<Arc<dyn CompletionProvider>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(MultiteamError::Config("credentials rejected".into()));
            }
            Ok(Arc::new(EchoProvider::new("counted")))
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl CompletionProvider for FailingProvider {
        async fn complete(&self, _instruction: &str) -> MultiteamResult<Completion> {
            Err(MultiteamError::Config("generation blew up".into()))
        }
    }

    #[tokio::test]
    async fn test_act_produces_outcome() {
        let actor = ProviderActor::new(
            "scribe",
            ActorRole::Worker,
            ProviderConfig::echo(),
            Arc::new(ProviderRegistry::with_builtin()),
        );
        assert!(!actor.is_initialized());

        let outcome = actor.act("draft the intro").await.unwrap();
        assert_eq!(outcome.actor, "scribe");
        assert_eq!(outcome.role, ActorRole::Worker);
        assert_eq!(outcome.instruction, "draft the intro");
        assert_eq!(outcome.output, "echo processed: draft the intro");
        assert!(actor.is_initialized());
    }

    #[tokio::test]
    async fn test_provider_resolved_once() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicU32::new(0),
            fail_first: 0,
        });
        let actor = ProviderActor::new("w", ActorRole::Worker, ProviderConfig::echo(), resolver.clone());

        for _ in 0..3 {
            actor.act("again").await.unwrap();
        }
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolution_failure_is_unavailable_and_not_memoized() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicU32::new(0),
            fail_first: 1,
        });
        let actor = ProviderActor::new("p", ActorRole::Planner, ProviderConfig::echo(), resolver.clone());

        let err = actor.act("plan").await.unwrap_err();
        assert!(matches!(err, MultiteamError::ActorUnavailable { ref actor, .. } if actor == "p"));
        assert!(!actor.is_initialized());

        actor.act("plan").await.unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_generation_failure_is_execution_failed() {
        let mut registry = ProviderRegistry::new();
        registry.register_instance("broken", Arc::new(FailingProvider));
        let actor = ProviderActor::new(
            "m",
            ActorRole::Manager,
            ProviderConfig::new("broken"),
            Arc::new(registry),
        );

        let err = actor.act("split").await.unwrap_err();
        match err {
            MultiteamError::ActorExecutionFailed { actor, reason } => {
                assert_eq!(actor, "m");
                assert!(reason.contains("generation blew up"));
            }
            other => panic!("Expected ActorExecutionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_provider_is_unavailable() {
        let actor = ProviderActor::new(
            "ghost",
            ActorRole::Worker,
            ProviderConfig::new("nope"),
            Arc::new(ProviderRegistry::with_builtin()),
        );
        let err = actor.act("anything").await.unwrap_err();
        assert!(matches!(err, MultiteamError::ActorUnavailable { .. }));
    }
}
