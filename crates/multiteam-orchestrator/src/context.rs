use crate::monitor::RunMonitor;
use multiteam_agent::Actor;
use multiteam_core::{ActOutcome, MultiteamError, MultiteamResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-run state shared by every stage of one orchestration run.
#[derive(Clone)]
pub struct RunContext {
    cancel: CancellationToken,
    monitor: Arc<RunMonitor>,
}

impl RunContext {
    /// A fresh context with its own token and monitor.
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            monitor: Arc::new(RunMonitor::new()),
        }
    }

    /// A context observing `cancel` and reporting into `monitor`.
    pub fn with_parts(cancel: CancellationToken, monitor: Arc<RunMonitor>) -> Self {
        Self { cancel, monitor }
    }

    /// Token that cancels this run.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Monitor receiving this run's invocation metrics.
    pub fn monitor(&self) -> &Arc<RunMonitor> {
        &self.monitor
    }

    /// Whether the run has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with [`MultiteamError::Cancelled`] if the run was cancelled.
    pub fn check(&self) -> MultiteamResult<()> {
        if self.is_cancelled() {
            Err(MultiteamError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Invoke an actor, racing it against cancellation.
///
/// This is the only suspension point of the engine. A cancelled run resolves
/// every outstanding invocation to [`MultiteamError::Cancelled`] and drops
/// the actor's future. The monitor sees the invocation finish even when this
/// future is itself dropped by a failing sibling.
pub async fn dispatch(
    actor: &dyn Actor,
    instruction: &str,
    ctx: &RunContext,
) -> MultiteamResult<ActOutcome> {
    ctx.check()?;

    let role = actor.role();
    let mut invocation = ctx.monitor.track(role);

    let result = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => Err(MultiteamError::Cancelled),
        result = actor.act(instruction) => result,
    };

    if matches!(&result, Err(e) if !e.is_cancelled()) {
        invocation.mark_failed();
    }
    drop(invocation);
    debug!(actor = %actor.name(), role = %role, ok = result.is_ok(), "Dispatch finished");

    result
}
