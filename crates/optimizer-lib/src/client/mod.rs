//! Transport to the optimization backend
//!
//! [`JobClient`] is the seam the orchestrator depends on. Each operation is a
//! single request/response exchange: no retries happen at this layer, and
//! every failure is returned to the caller.

mod http;


pub use http::{ApiClient, ApiClientConfig};

use crate::error::TransportError;
use crate::models::{JobParameters, JobResult, RemoteStatus, SubmissionAck};

pub use async_trait::async_trait;

/// Path of the job submission endpoint
pub const SUBMIT_PATH: &str = "api/optimize";
/// Path of the job status endpoint
pub const STATUS_PATH: &str = "api/optimization/status";
/// Path of the job results endpoint
pub const RESULTS_PATH: &str = "api/optimization/results";
/// Path of the dashboard summary endpoint
pub const SUMMARY_PATH: &str = "api/summary";

/// Trait for optimization job transports
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Submit a new optimization job
    async fn submit(&self, parameters: &JobParameters) -> Result<SubmissionAck, TransportError>;

    /// Fetch the status of the most recent job
    async fn fetch_status(&self) -> Result<RemoteStatus, TransportError>;

    /// Fetch the result of the most recent completed job
    async fn fetch_results(&self) -> Result<JobResult, TransportError>;
}
