//! Submission evaluation engine.
//!
//! Submissions are admitted into a bounded FIFO queue and evaluated by a
//! fixed pool of worker tasks, one submission per worker at a time. The queue
//! and every submission record live behind a single lock; all state
//! transitions happen in [`Engine::submit`], [`Engine::cancel`], the worker
//! completion path or shutdown.

pub mod aggregator;
pub mod error;
mod record;
mod retention;
mod worker;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use common::event::{Event, SubmissionEvent};
use common::hook::{Hook, HookRegistry};
use common::{Catalog, EngineConfig, NewSubmission, Problem, Submission, SubmissionState};
use serde::Serialize;
use tokio::sync::{Notify, RwLock, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use ::worker::{HarnessSettings, SandboxRunner, TestHarness};

pub use aggregator::ResultAggregator;
pub use error::EngineError;

use record::{Record, Store};

/// Result of [`Engine::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub enum CancelOutcome {
    /// The submission is now `Cancelled`.
    Cancelled,
    /// The submission had already reached a terminal state; nothing changed.
    AlreadyTerminal,
    /// The sandbox did not stop within the teardown timeout; the submission
    /// was failed as `InternalError`.
    ForceFailed,
}

pub(crate) struct Inner {
    pub config: EngineConfig,
    pub catalog: Arc<dyn Catalog>,
    pub harness: TestHarness,
    pub store: Mutex<Store>,
    pub work_ready: Notify,
    pub hooks: RwLock<HookRegistry>,
    pub shutdown: CancellationToken,
}

impl Inner {
    pub fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver an event to registered hooks. Hook failures are logged only.
    pub async fn emit(&self, event: SubmissionEvent) {
        let hooks = self.hooks.read().await;
        if hooks.is_empty() {
            return;
        }
        if let Err(e) = hooks.trigger(&event).await {
            warn!(
                topic = event.topic(),
                submission_id = %event.submission_id(),
                error = %e,
                "Hook failed"
            );
        }
    }
}

/// Handle to a running engine. Cheap to clone.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Engine {
    /// Start the worker pool and the retention sweeper. Must be called
    /// inside a tokio runtime.
    pub fn start(
        config: EngineConfig,
        catalog: Arc<dyn Catalog>,
        sandbox: Arc<dyn SandboxRunner>,
    ) -> Self {
        let harness = TestHarness::new(sandbox, HarnessSettings::from(&config));
        // A pool without workers would admit submissions and never run them.
        let pool_size = config.pool_size.max(1);
        let inner = Arc::new(Inner {
            config,
            catalog,
            harness,
            store: Mutex::new(Store::default()),
            work_ready: Notify::new(),
            hooks: RwLock::new(HookRegistry::new()),
            shutdown: CancellationToken::new(),
        });

        let mut tasks = Vec::with_capacity(pool_size + 1);
        for index in 0..pool_size {
            tasks.push(tokio::spawn(worker::run(inner.clone(), index)));
        }
        tasks.push(tokio::spawn(retention::run(inner.clone())));

        info!(
            pool_size,
            queue_capacity = inner.config.queue_capacity,
            "Evaluation engine started"
        );

        Self {
            inner,
            tasks: Arc::new(Mutex::new(tasks)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Validate and enqueue a submission. Never waits for evaluation.
    #[instrument(skip(self, request), fields(problem_id = %request.problem_id, language = %request.language))]
    pub async fn submit(&self, request: NewSubmission) -> Result<Uuid, EngineError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(EngineError::Internal("engine is shutting down".into()));
        }

        let problem = self.inner.catalog.get_problem(&request.problem_id).await?;
        self.validate(&problem, &request)?;

        let submission = Submission::new(request);
        let id = submission.id;
        let problem_id = problem.id.clone();
        {
            let mut store = self.inner.store();
            let capacity = self.inner.config.queue_capacity;
            if store.queue.len() >= capacity {
                warn!(capacity, "Submission queue is full");
                return Err(EngineError::CapacityExceeded { capacity });
            }
            store.records.insert(id, Record::new(submission, problem));
            store.queue.push_back(id);
        }

        info!(submission_id = %id, "Submission queued");
        self.inner
            .emit(SubmissionEvent::Queued {
                submission_id: id,
                problem_id,
            })
            .await;
        self.inner.work_ready.notify_one();
        Ok(id)
    }

    fn validate(&self, problem: &Problem, request: &NewSubmission) -> Result<(), EngineError> {
        if !problem.supports_language(&request.language)
            || !self.inner.harness.sandbox().supports_language(&request.language)
        {
            return Err(EngineError::InvalidSubmission(format!(
                "Language '{}' is not supported for problem '{}'",
                request.language, problem.id
            )));
        }
        if request.source_code.trim().is_empty() {
            return Err(EngineError::InvalidSubmission(
                "Source code must not be empty".into(),
            ));
        }
        let max = self.inner.config.max_source_bytes;
        if request.source_code.len() > max {
            return Err(EngineError::InvalidSubmission(format!(
                "Source code exceeds the {max}-byte limit"
            )));
        }
        Ok(())
    }

    /// Number of submissions a worker is evaluating right now.
    pub fn in_flight(&self) -> usize {
        self.inner.store().running
    }

    /// Snapshot of a submission. Includes report and assessment once graded.
    pub fn status(&self, submission_id: Uuid) -> Result<Submission, EngineError> {
        self.inner
            .store()
            .records
            .get(&submission_id)
            .map(|record| record.submission.clone())
            .ok_or_else(|| not_found(submission_id))
    }

    /// Wait up to `max_wait` for the submission to reach a terminal state,
    /// then return its snapshot either way.
    pub async fn wait(&self, submission_id: Uuid, max_wait: Duration) -> Result<Submission, EngineError> {
        let mut rx = {
            let store = self.inner.store();
            let record = store
                .records
                .get(&submission_id)
                .ok_or_else(|| not_found(submission_id))?;
            if record.submission.is_terminal() {
                return Ok(record.submission.clone());
            }
            record.state_tx.subscribe()
        };

        let _ = tokio::time::timeout(max_wait, rx.wait_for(|state| state.is_terminal())).await;
        self.status(submission_id)
    }

    /// Cancel a submission.
    ///
    /// A queued submission is removed from the queue immediately. A running
    /// one has its sandbox torn down; if that takes longer than the teardown
    /// timeout the submission is force-failed.
    #[instrument(skip(self))]
    pub async fn cancel(&self, submission_id: Uuid) -> Result<CancelOutcome, EngineError> {
        let target = {
            let mut store = self.inner.store();
            let state = store
                .records
                .get(&submission_id)
                .map(|record| record.submission.state)
                .ok_or_else(|| not_found(submission_id))?;

            match state {
                SubmissionState::Queued => {
                    store.dequeue(&submission_id);
                    let snapshot = store.records.get_mut(&submission_id).map(|record| {
                        record.transition(SubmissionState::Cancelled);
                        record.submission.clone()
                    });
                    CancelTarget::Withdrawn(snapshot)
                }
                SubmissionState::Running => {
                    let record = store
                        .records
                        .get(&submission_id)
                        .ok_or_else(|| not_found(submission_id))?;
                    CancelTarget::Running(record.cancel.clone(), record.state_tx.subscribe())
                }
                _ => return Ok(CancelOutcome::AlreadyTerminal),
            }
        };

        let (token, mut rx) = match target {
            CancelTarget::Withdrawn(snapshot) => {
                info!("Queued submission cancelled");
                if let Some(submission) = snapshot {
                    self.inner
                        .emit(SubmissionEvent::Finished { submission })
                        .await;
                }
                return Ok(CancelOutcome::Cancelled);
            }
            CancelTarget::Running(token, rx) => (token, rx),
        };

        token.cancel();
        let teardown = self.inner.config.teardown_timeout();
        let settled = tokio::time::timeout(teardown, rx.wait_for(|state| state.is_terminal()))
            .await
            .map(|changed| changed.map(|state| *state));

        match settled {
            Ok(Ok(SubmissionState::Cancelled)) => {
                info!("Running submission cancelled");
                Ok(CancelOutcome::Cancelled)
            }
            Ok(Ok(_)) => Ok(CancelOutcome::AlreadyTerminal),
            Ok(Err(_)) => Err(not_found(submission_id)),
            Err(_) => self.force_fail(submission_id).await,
        }
    }

    async fn force_fail(&self, submission_id: Uuid) -> Result<CancelOutcome, EngineError> {
        let snapshot = {
            let mut store = self.inner.store();
            let record = store
                .records
                .get_mut(&submission_id)
                .ok_or_else(|| not_found(submission_id))?;
            if record.submission.is_terminal() {
                return Ok(match record.submission.state {
                    SubmissionState::Cancelled => CancelOutcome::Cancelled,
                    _ => CancelOutcome::AlreadyTerminal,
                });
            }
            record.transition(SubmissionState::InternalError);
            record.submission.clone()
        };

        error!(
            teardown_timeout_ms = self.inner.config.teardown_timeout_ms,
            "Sandbox teardown timed out, submission force-failed"
        );
        self.inner
            .emit(SubmissionEvent::Finished {
                submission: snapshot,
            })
            .await;
        Ok(CancelOutcome::ForceFailed)
    }

    /// Languages accepted for a problem: its declared set, restricted to
    /// the toolchains the sandbox can run.
    pub async fn list_supported_languages(
        &self,
        problem_id: &str,
    ) -> Result<BTreeSet<String>, EngineError> {
        let problem = self.inner.catalog.get_problem(problem_id).await?;
        let sandbox = self.inner.harness.sandbox();
        Ok(problem
            .supported_languages
            .iter()
            .filter(|language| sandbox.supports_language(language))
            .cloned()
            .collect())
    }

    /// Register a hook for submission lifecycle events.
    pub async fn add_hook<H>(&self, hook: H) -> anyhow::Result<()>
    where
        H: Hook<SubmissionEvent> + 'static,
    {
        self.inner
            .hooks
            .write()
            .await
            .add_hook::<SubmissionEvent, H>(hook)
            .await
    }

    pub async fn remove_hook(&self, hook_id: &str) -> anyhow::Result<()> {
        self.inner.hooks.write().await.remove_hook(hook_id).await
    }

    /// Stop accepting work, cancel everything in flight and wait for the
    /// worker pool to exit.
    pub async fn shutdown(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        self.inner.shutdown.cancel();

        let (withdrawn, interrupted) = {
            let mut store = self.inner.store();
            let queued: Vec<Uuid> = store.queue.drain(..).collect();
            for record in store.records.values() {
                if record.submission.state == SubmissionState::Running {
                    record.cancel.cancel();
                }
            }
            let mut withdrawn = Vec::new();
            for id in &queued {
                if let Some(record) = store.records.get_mut(id)
                    && record.submission.state == SubmissionState::Queued
                {
                    record.transition(SubmissionState::Cancelled);
                    withdrawn.push(record.submission.clone());
                }
            }
            (withdrawn, store.running)
        };
        info!(
            withdrawn = withdrawn.len(),
            interrupted, "Engine shutting down"
        );
        for submission in withdrawn {
            self.inner
                .emit(SubmissionEvent::Finished { submission })
                .await;
        }

        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Engine task panicked");
            }
        }
        info!("Evaluation engine stopped");
    }
}

enum CancelTarget {
    Withdrawn(Option<Submission>),
    Running(CancellationToken, watch::Receiver<SubmissionState>),
}

fn not_found(submission_id: Uuid) -> EngineError {
    EngineError::NotFound(format!("Submission '{submission_id}' not found"))
}
