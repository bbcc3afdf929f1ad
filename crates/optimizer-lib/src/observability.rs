//! Observability infrastructure for job orchestration
//!
//! Provides:
//! - Prometheus metrics (jobs started/completed/failed, status polls, job duration)
//! - Structured logging of job lifecycle events with tracing

use crate::error::OrchestrationFailure;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for end-to-end job duration (in seconds)
const JOB_DURATION_BUCKETS: &[f64] = &[
    0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<OrchestratorMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct OrchestratorMetricsInner {
    jobs_started: IntCounter,
    jobs_completed: IntCounter,
    jobs_failed: IntCounterVec,
    jobs_cancelled: IntCounter,
    status_polls: IntCounter,
    result_fetch_failures: IntCounter,
    job_duration_seconds: Histogram,
}

impl OrchestratorMetricsInner {
    fn new() -> Self {
        Self {
            jobs_started: register_int_counter!(
                "teraops_jobs_started_total",
                "Total number of optimization jobs started"
            )
            .expect("Failed to register jobs_started"),

            jobs_completed: register_int_counter!(
                "teraops_jobs_completed_total",
                "Total number of optimization jobs that reached completed"
            )
            .expect("Failed to register jobs_completed"),

            jobs_failed: register_int_counter_vec!(
                "teraops_jobs_failed_total",
                "Total number of optimization jobs that ended in failed, by cause",
                &["kind"]
            )
            .expect("Failed to register jobs_failed"),

            jobs_cancelled: register_int_counter!(
                "teraops_jobs_cancelled_total",
                "Total number of optimization jobs cancelled by the caller"
            )
            .expect("Failed to register jobs_cancelled"),

            status_polls: register_int_counter!(
                "teraops_status_polls_total",
                "Total number of status checks issued"
            )
            .expect("Failed to register status_polls"),

            result_fetch_failures: register_int_counter!(
                "teraops_result_fetch_failures_total",
                "Completed jobs whose result could not be retrieved"
            )
            .expect("Failed to register result_fetch_failures"),

            job_duration_seconds: register_histogram!(
                "teraops_job_duration_seconds",
                "Time from submission to a terminal status",
                JOB_DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register job_duration_seconds"),
        }
    }
}

/// Orchestrator metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Debug, Clone)]
pub struct OrchestratorMetrics {
    _private: (),
}

impl Default for OrchestratorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(OrchestratorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &OrchestratorMetricsInner {
        GLOBAL_METRICS.get_or_init(OrchestratorMetricsInner::new)
    }

    pub fn inc_jobs_started(&self) {
        self.inner().jobs_started.inc();
    }

    pub fn inc_jobs_completed(&self) {
        self.inner().jobs_completed.inc();
    }

    pub fn inc_jobs_failed(&self, failure: &OrchestrationFailure) {
        self.inner()
            .jobs_failed
            .with_label_values(&[failure.kind()])
            .inc();
    }

    pub fn inc_jobs_cancelled(&self) {
        self.inner().jobs_cancelled.inc();
    }

    pub fn inc_status_polls(&self) {
        self.inner().status_polls.inc();
    }

    pub fn inc_result_fetch_failures(&self) {
        self.inner().result_fetch_failures.inc();
    }

    /// Record time from submission to a terminal status
    pub fn observe_job_duration(&self, duration_secs: f64) {
        self.inner().job_duration_seconds.observe(duration_secs);
    }

    /// Current value of the status poll counter
    pub fn status_polls(&self) -> u64 {
        self.inner().status_polls.get()
    }
}

/// Structured logger for job lifecycle events
#[derive(Debug, Clone)]
pub struct JobLogger {
    backend: String,
}

impl JobLogger {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
        }
    }

    /// Log a job submission
    pub fn log_job_started(&self, generation: u64, strategy: &str, parameter_count: usize) {
        info!(
            event = "job_started",
            backend = %self.backend,
            generation = generation,
            strategy = %strategy,
            parameter_count = parameter_count,
            "Optimization job submitted"
        );
    }

    /// Log a status check
    pub fn log_status_polled(&self, generation: u64, poll: u32, remote_status: &str) {
        debug!(
            event = "status_polled",
            backend = %self.backend,
            generation = generation,
            poll = poll,
            remote_status = %remote_status,
            "Optimization status checked"
        );
    }

    /// Log a job reaching completed
    pub fn log_job_completed(&self, generation: u64, polls: u32, elapsed_secs: f64) {
        info!(
            event = "job_completed",
            backend = %self.backend,
            generation = generation,
            polls = polls,
            elapsed_secs = elapsed_secs,
            "Optimization job completed"
        );
    }

    /// Log a job ending in failed
    pub fn log_job_failed(&self, generation: u64, failure: &OrchestrationFailure) {
        warn!(
            event = "job_failed",
            backend = %self.backend,
            generation = generation,
            kind = failure.kind(),
            error = %failure,
            "Optimization job failed"
        );
    }

    /// Log a result retrieval failure for a completed job
    pub fn log_result_fetch_failed(&self, generation: u64, failure: &OrchestrationFailure) {
        warn!(
            event = "result_fetch_failed",
            backend = %self.backend,
            generation = generation,
            error = %failure,
            "Job completed but result retrieval failed"
        );
    }

    /// Log a result being stored
    pub fn log_result_ready(&self, generation: u64, transfers: usize) {
        info!(
            event = "result_ready",
            backend = %self.backend,
            generation = generation,
            transfers = transfers,
            "Optimization result retrieved"
        );
    }

    /// Log a caller-initiated cancellation
    pub fn log_job_cancelled(&self, generation: u64) {
        info!(
            event = "job_cancelled",
            backend = %self.backend,
            generation = generation,
            "Optimization job cancelled"
        );
    }

    /// Log a response that arrived for a superseded job
    pub fn log_stale_response(&self, generation: u64, current_generation: u64) {
        debug!(
            event = "stale_response",
            backend = %self.backend,
            generation = generation,
            current_generation = current_generation,
            "Discarding response from superseded job"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    #[test]
    fn test_orchestrator_metrics_creation() {
        // Metrics live in the global Prometheus registry; creating several
        // handles must not try to register twice.
        let metrics = OrchestratorMetrics::new();
        let other = OrchestratorMetrics::new();

        metrics.inc_jobs_started();
        metrics.inc_jobs_completed();
        metrics.inc_jobs_cancelled();
        metrics.inc_result_fetch_failures();
        metrics.inc_jobs_failed(&OrchestrationFailure::StatusCheck(TransportError::Network(
            "refused".into(),
        )));
        metrics.observe_job_duration(4.2);

        let before = other.status_polls();
        metrics.inc_status_polls();
        assert!(other.status_polls() > before);
    }

    #[test]
    fn test_job_logger_creation() {
        let logger = JobLogger::new("http://localhost:8000/");
        assert_eq!(logger.backend, "http://localhost:8000/");
    }
}
