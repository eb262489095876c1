//! Run-once startup tasks
//!
//! The host registers tasks with a [`StartupSequencer`] and either awaits the
//! sequence before continuing or spawns it next to the rest of the process.

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{FailurePolicy, StartupConfig};

/// Work executed once per process before (or alongside) normal operation
#[async_trait]
pub trait StartupTask: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Run the task. Implementations must return promptly once `cancel` fires.
    async fn execute(&self, cancel: CancellationToken) -> anyhow::Result<()>;
}

/// Result of a finished startup sequence
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StartupSummary {
    pub completed: Vec<&'static str>,
    /// Tasks that failed under [`FailurePolicy::Continue`]
    pub failed: Vec<&'static str>,
}

/// Runs registered startup tasks in registration order
pub struct StartupSequencer {
    tasks: Vec<Arc<dyn StartupTask>>,
    policy: FailurePolicy,
    timeout: Duration,
}

impl StartupSequencer {
    #[must_use]
    pub const fn new(policy: FailurePolicy, timeout: Duration) -> Self {
        Self {
            tasks: Vec::new(),
            policy,
            timeout,
        }
    }

    #[must_use]
    pub const fn from_config(config: &StartupConfig) -> Self {
        Self::new(config.policy, Duration::from_secs(config.timeout))
    }

    pub fn register(&mut self, task: Arc<dyn StartupTask>) -> &mut Self {
        self.tasks.push(task);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every task to completion.
    ///
    /// Under [`FailurePolicy::Abort`] the first failure is returned and later
    /// tasks do not run. Cancelling `cancel` stops the sequence.
    pub async fn run(&self, cancel: &CancellationToken) -> anyhow::Result<StartupSummary> {
        let mut summary = StartupSummary::default();

        for task in &self.tasks {
            let name = task.name();
            if cancel.is_cancelled() {
                return Err(anyhow!("Startup cancelled before task '{name}'"));
            }

            info!(task = name, "Running startup task");
            match self.run_task(task.as_ref(), cancel).await {
                Ok(()) => {
                    info!(task = name, "Startup task completed");
                    summary.completed.push(name);
                }
                Err(e) => match self.policy {
                    FailurePolicy::Abort => {
                        return Err(e).with_context(|| format!("Startup task '{name}' failed"));
                    }
                    FailurePolicy::Continue => {
                        error!(task = name, error = %format!("{e:#}"), "Startup task failed, continuing");
                        summary.failed.push(name);
                    }
                },
            }
        }

        Ok(summary)
    }

    /// Run the sequence in the background.
    ///
    /// The handle's readiness flag flips once the sequence has finished
    /// without an aborting failure.
    #[must_use]
    pub fn spawn(self, cancel: CancellationToken) -> StartupHandle {
        let (ready_tx, ready_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            let result = self.run(&cancel).await;
            if result.is_ok() {
                let _ = ready_tx.send(true);
            }
            result
        });

        StartupHandle {
            ready: ready_rx,
            join,
        }
    }

    /// Run one task under the per-task deadline.
    ///
    /// On expiry the task's token is cancelled and the task is awaited so it
    /// can report its own cancellation.
    async fn run_task(
        &self,
        task: &dyn StartupTask,
        parent: &CancellationToken,
    ) -> anyhow::Result<()> {
        let token = parent.child_token();
        let execution = task.execute(token.clone());
        tokio::pin!(execution);

        tokio::select! {
            result = &mut execution => result,
            () = tokio::time::sleep(self.timeout) => {
                warn!(
                    task = task.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Startup task exceeded its deadline, cancelling"
                );
                token.cancel();
                execution.await
            }
        }
    }
}

/// Handle to a startup sequence running in the background
pub struct StartupHandle {
    ready: watch::Receiver<bool>,
    join: JoinHandle<anyhow::Result<StartupSummary>>,
}

impl StartupHandle {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait until the sequence finishes. Returns `false` if it aborted.
    pub async fn wait_ready(&mut self) -> bool {
        self.ready.wait_for(|ready| *ready).await.is_ok()
    }

    /// Wait for the sequence and return its result
    pub async fn join(self) -> anyhow::Result<StartupSummary> {
        self.join.await.context("Startup sequence panicked")?
    }
}
