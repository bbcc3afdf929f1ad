//! Optimization job orchestration
//!
//! [`JobOrchestrator`] owns the status of one job stream and drives each job
//! through submit → poll → fetch-results:
//!
//! ```text
//! Idle ──start──▶ Submitting ──ack──▶ Processing ──completed──▶ Completed ──▶ (result | result error)
//!                     │                  │    ▲
//!                     └──error──▶ Failed ◀┘    └── processing (sleep interval)
//! ```
//!
//! Every mutation is tagged with the generation of the job that produced it.
//! `start()` and `cancel()` bump the generation, so a response belonging to a
//! superseded job is discarded instead of corrupting the newer state.

mod poll;


use crate::client::JobClient;
use crate::error::OrchestrationFailure;
use crate::models::{JobParameters, JobResult, JobStatus};
use crate::observability::{JobLogger, OrchestratorMetrics};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Configuration for status polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Fixed delay between status checks (default: 2 seconds)
    pub interval: Duration,
    /// Give up after this many status checks (default: unbounded)
    pub max_polls: Option<u32>,
    /// Give up when no terminal status arrived within this time after
    /// submission (default: unbounded)
    pub deadline: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_polls: None,
            deadline: None,
        }
    }
}

/// Point-in-time view of the orchestrator state
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    /// Generation of the job this snapshot belongs to
    pub generation: u64,
    pub status: JobStatus,
    /// Latest human-readable message from the backend or the orchestrator
    pub message: Option<String>,
    /// Present only once a completed job's result was retrieved
    pub result: Option<Arc<JobResult>>,
    /// Why the job failed, or why a completed job has no result
    pub failure: Option<OrchestrationFailure>,
    /// Status checks issued for this job so far
    pub polls: u32,
    /// Whether a job task is still working on this generation
    pub active: bool,
    /// Unix timestamp of the last update
    pub updated_at: i64,
}

impl JobSnapshot {
    fn idle() -> Self {
        Self {
            generation: 0,
            status: JobStatus::Idle,
            message: None,
            result: None,
            failure: None,
            polls: 0,
            active: false,
            updated_at: chrono::Utc::now().timestamp(),
        }
    }

    /// True when no further automatic changes will happen for this job
    pub fn is_settled(&self) -> bool {
        !self.active
    }
}

/// Notification emitted to observers
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// The status changed
    Transition { from: JobStatus, snapshot: JobSnapshot },
    /// A status check reported the job is still processing
    Progress { snapshot: JobSnapshot },
    /// The result of a completed job was retrieved
    ResultReady { snapshot: JobSnapshot },
    /// The job completed but its result could not be retrieved
    ResultUnavailable { snapshot: JobSnapshot },
}

impl JobEvent {
    /// State right after the event was applied
    pub fn snapshot(&self) -> &JobSnapshot {
        match self {
            JobEvent::Transition { snapshot, .. }
            | JobEvent::Progress { snapshot }
            | JobEvent::ResultReady { snapshot }
            | JobEvent::ResultUnavailable { snapshot } => snapshot,
        }
    }
}

/// Receives orchestrator events
///
/// Observers run on the task that applied the change and must not call
/// `start()` or `cancel()` from inside `on_event`. Reading `current_state()`
/// is fine.
pub trait JobObserver: Send + Sync {
    fn on_event(&self, event: &JobEvent);
}

impl<F> JobObserver for F
where
    F: Fn(&JobEvent) + Send + Sync,
{
    fn on_event(&self, event: &JobEvent) {
        self(event)
    }
}

/// Handle returned by [`JobOrchestrator::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Builds the observer event once an update has been applied
type MakeEvent = fn(JobStatus, JobSnapshot) -> JobEvent;

struct Inner {
    snapshot: JobSnapshot,
    observers: Vec<(SubscriptionId, Arc<dyn JobObserver>)>,
    next_subscription: u64,
    started_at: Option<Instant>,
}

/// State shared between the orchestrator handle and its job task
pub(crate) struct Shared {
    /// Serializes apply + notify so observers see events in order
    transitions: Mutex<()>,
    state: Mutex<Inner>,
    watch_tx: watch::Sender<JobSnapshot>,
    logger: JobLogger,
    metrics: OrchestratorMetrics,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn new(logger: JobLogger, metrics: OrchestratorMetrics) -> Self {
        let snapshot = JobSnapshot::idle();
        let (watch_tx, _) = watch::channel(snapshot.clone());
        Self {
            transitions: Mutex::new(()),
            state: Mutex::new(Inner {
                snapshot,
                observers: Vec::new(),
                next_subscription: 0,
                started_at: None,
            }),
            watch_tx,
            logger,
            metrics,
        }
    }

    fn snapshot(&self) -> JobSnapshot {
        lock(&self.state).snapshot.clone()
    }

    /// Apply `update` if `generation` is still current, then notify observers
    ///
    /// Returns false when the generation is stale; nothing is changed then.
    fn apply<F>(&self, generation: u64, update: F) -> bool
    where
        F: FnOnce(&mut Inner) -> MakeEvent,
    {
        self.apply_inner(Some(generation), |inner| Some(update(inner)))
            .is_some()
    }

    /// Shared body of `apply` and the generation-bumping operations
    ///
    /// With `expected = None` the update runs unconditionally. The closure
    /// may return `None` to skip the change entirely.
    fn apply_inner<F>(&self, expected: Option<u64>, update: F) -> Option<JobSnapshot>
    where
        F: FnOnce(&mut Inner) -> Option<MakeEvent>,
    {
        let _serial = lock(&self.transitions);

        let (event, observers) = {
            let mut inner = lock(&self.state);
            let current = inner.snapshot.generation;
            if let Some(generation) = expected {
                if generation != current {
                    self.logger.log_stale_response(generation, current);
                    return None;
                }
            }

            let from = inner.snapshot.status;
            let make_event = update(&mut *inner)?;
            inner.snapshot.updated_at = chrono::Utc::now().timestamp();

            let snapshot = inner.snapshot.clone();
            self.watch_tx.send_replace(snapshot.clone());

            let observers: Vec<Arc<dyn JobObserver>> = inner
                .observers
                .iter()
                .map(|(_, observer)| Arc::clone(observer))
                .collect();
            (make_event(from, snapshot), observers)
        };

        for observer in &observers {
            observer.on_event(&event);
        }

        Some(event.snapshot().clone())
    }

    /// Begin a new job: bump the generation and enter `Submitting`
    fn begin(&self) -> u64 {
        self.apply_inner(None, |inner| {
            let snapshot = &mut inner.snapshot;
            snapshot.generation += 1;
            snapshot.status = JobStatus::Submitting;
            snapshot.message = None;
            snapshot.result = None;
            snapshot.failure = None;
            snapshot.polls = 0;
            snapshot.active = true;
            inner.started_at = Some(Instant::now());
            Some(transition)
        })
        .map(|snapshot| snapshot.generation)
        .unwrap_or_default()
    }

    /// Stop the active job, if any, and return to `Idle`
    fn cancel(&self) -> Option<u64> {
        self.apply_inner(None, |inner| {
            let snapshot = &mut inner.snapshot;
            if !snapshot.active {
                return None;
            }
            snapshot.generation += 1;
            snapshot.status = JobStatus::Idle;
            snapshot.message = Some("cancelled".to_string());
            snapshot.result = None;
            snapshot.failure = None;
            snapshot.active = false;
            inner.started_at = None;
            Some(transition)
        })
        .map(|snapshot| snapshot.generation)
    }

    fn processing(&self, generation: u64, message: Option<String>) -> bool {
        self.apply(generation, |inner| {
            inner.snapshot.status = JobStatus::Processing;
            inner.snapshot.message = message;
            transition
        })
    }

    fn progress(&self, generation: u64, polls: u32, message: Option<String>) -> bool {
        self.apply(generation, |inner| {
            inner.snapshot.polls = polls;
            if message.is_some() {
                inner.snapshot.message = message;
            }
            progress
        })
    }

    fn complete(&self, generation: u64, polls: u32, message: Option<String>) -> bool {
        let applied = self.apply(generation, |inner| {
            inner.snapshot.status = JobStatus::Completed;
            inner.snapshot.polls = polls;
            inner.snapshot.message = message;
            transition
        });
        if applied {
            let elapsed = self.elapsed_secs();
            self.metrics.inc_jobs_completed();
            self.metrics.observe_job_duration(elapsed);
            self.logger.log_job_completed(generation, polls, elapsed);
        }
        applied
    }

    fn fail(&self, generation: u64, polls: u32, failure: OrchestrationFailure) -> bool {
        let message = failure.to_string();
        let recorded = failure.clone();
        let applied = self.apply(generation, |inner| {
            inner.snapshot.status = JobStatus::Failed;
            inner.snapshot.polls = polls;
            inner.snapshot.message = Some(message);
            inner.snapshot.failure = Some(recorded);
            inner.snapshot.active = false;
            transition
        });
        if applied {
            self.metrics.inc_jobs_failed(&failure);
            self.metrics.observe_job_duration(self.elapsed_secs());
            self.logger.log_job_failed(generation, &failure);
        }
        applied
    }

    fn store_result(&self, generation: u64, result: JobResult) -> bool {
        let transfers = result.recommended_transfers.len();
        let applied = self.apply(generation, |inner| {
            inner.snapshot.result = Some(Arc::new(result));
            inner.snapshot.active = false;
            result_ready
        });
        if applied {
            self.logger.log_result_ready(generation, transfers);
        }
        applied
    }

    fn result_unavailable(&self, generation: u64, failure: OrchestrationFailure) -> bool {
        let recorded = failure.clone();
        let applied = self.apply(generation, |inner| {
            inner.snapshot.failure = Some(recorded);
            inner.snapshot.active = false;
            result_unavailable
        });
        if applied {
            self.metrics.inc_result_fetch_failures();
            self.logger.log_result_fetch_failed(generation, &failure);
        }
        applied
    }

    fn elapsed_secs(&self) -> f64 {
        lock(&self.state)
            .started_at
            .map(|started| started.elapsed().as_secs_f64())
            .unwrap_or_default()
    }
}

fn transition(from: JobStatus, snapshot: JobSnapshot) -> JobEvent {
    JobEvent::Transition { from, snapshot }
}

fn progress(_: JobStatus, snapshot: JobSnapshot) -> JobEvent {
    JobEvent::Progress { snapshot }
}

fn result_ready(_: JobStatus, snapshot: JobSnapshot) -> JobEvent {
    JobEvent::ResultReady { snapshot }
}

fn result_unavailable(_: JobStatus, snapshot: JobSnapshot) -> JobEvent {
    JobEvent::ResultUnavailable { snapshot }
}

/// Drives optimization jobs against a [`JobClient`]
///
/// One orchestrator owns one job at a time; run independent jobs on
/// independent orchestrators. Must be used from within a Tokio runtime.
pub struct JobOrchestrator {
    client: Arc<dyn JobClient>,
    config: PollConfig,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl JobOrchestrator {
    /// Create an orchestrator with default poll configuration
    pub fn new(client: Arc<dyn JobClient>) -> Self {
        JobOrchestratorBuilder::new(client).build()
    }

    /// Start building an orchestrator
    pub fn builder(client: Arc<dyn JobClient>) -> JobOrchestratorBuilder {
        JobOrchestratorBuilder::new(client)
    }

    /// Poll configuration in effect
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Start a new job, superseding any job already in flight
    ///
    /// The status is `Submitting` by the time this returns. Returns the
    /// generation assigned to the new job.
    pub fn start(&self, parameters: JobParameters) -> u64 {
        let mut task = lock(&self.task);
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let generation = self.shared.begin();
        self.shared.metrics.inc_jobs_started();
        self.shared.logger.log_job_started(
            generation,
            &parameters.strategy,
            parameters.parameters.len(),
        );

        *task = Some(tokio::spawn(poll::run_job(
            Arc::clone(&self.shared),
            Arc::clone(&self.client),
            self.config.clone(),
            parameters,
            generation,
        )));

        generation
    }

    /// Cancel the active job and return to `Idle`
    ///
    /// Returns false (and changes nothing) when no job is active, so calling
    /// it repeatedly is harmless.
    pub fn cancel(&self) -> bool {
        let mut task = lock(&self.task);
        if let Some(handle) = task.take() {
            handle.abort();
        }

        match self.shared.cancel() {
            Some(generation) => {
                self.shared.metrics.inc_jobs_cancelled();
                self.shared.logger.log_job_cancelled(generation);
                true
            }
            None => false,
        }
    }

    /// Register an observer for every subsequent event
    pub fn subscribe<O>(&self, observer: O) -> SubscriptionId
    where
        O: JobObserver + 'static,
    {
        let mut inner = lock(&self.shared.state);
        inner.next_subscription += 1;
        let id = SubscriptionId(inner.next_subscription);
        inner.observers.push((id, Arc::new(observer)));
        id
    }

    /// Remove a previously registered observer
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = lock(&self.shared.state);
        let before = inner.observers.len();
        inner.observers.retain(|(existing, _)| *existing != id);
        inner.observers.len() != before
    }

    /// Current status, message and result
    pub fn current_state(&self) -> JobSnapshot {
        self.shared.snapshot()
    }

    /// Receiver that always holds the latest snapshot
    pub fn watch(&self) -> watch::Receiver<JobSnapshot> {
        self.shared.watch_tx.subscribe()
    }

    /// Wait until the current job settles (terminal, result handled, or cancelled)
    pub async fn wait_for_terminal(&self) -> JobSnapshot {
        let mut rx = self.watch();
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if snapshot.is_settled() {
                    return snapshot.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.current_state();
            }
        }
    }
}

impl Drop for JobOrchestrator {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }
    }
}

/// Builder for [`JobOrchestrator`]
pub struct JobOrchestratorBuilder {
    client: Arc<dyn JobClient>,
    config: PollConfig,
    backend: String,
}

impl JobOrchestratorBuilder {
    /// Create a new builder with default configuration
    pub fn new(client: Arc<dyn JobClient>) -> Self {
        Self {
            client,
            config: PollConfig::default(),
            backend: "default".to_string(),
        }
    }

    /// Replace the whole poll configuration
    pub fn config(mut self, config: PollConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the delay between status checks
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Limit the number of status checks per job
    pub fn max_polls(mut self, max_polls: u32) -> Self {
        self.config.max_polls = Some(max_polls);
        self
    }

    /// Limit the time from submission to a terminal status
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.config.deadline = Some(deadline);
        self
    }

    /// Label used in structured logs to identify the backend
    pub fn backend_label(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    /// Build the orchestrator
    pub fn build(self) -> JobOrchestrator {
        JobOrchestrator {
            client: self.client,
            config: self.config,
            shared: Arc::new(Shared::new(
                JobLogger::new(self.backend),
                OrchestratorMetrics::new(),
            )),
            task: Mutex::new(None),
        }
    }
}
