//! Optimization job library for QPU block management
//!
//! This crate provides the core functionality for:
//! - Building and validating optimization job requests
//! - Talking to the optimization backend over HTTP
//! - Orchestrating the submit → poll → fetch-results job lifecycle
//! - Presenting raw results as display-ready values
//! - Structured logging and Prometheus metrics

pub mod client;
pub mod error;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod presenter;
pub mod request;

pub use client::{ApiClient, JobClient};
pub use error::{OrchestrationFailure, TransportError, ValidationError};
pub use models::*;
pub use observability::{JobLogger, OrchestratorMetrics};
pub use orchestrator::{
    JobEvent, JobObserver, JobOrchestrator, JobOrchestratorBuilder, JobSnapshot, PollConfig,
    SubscriptionId,
};
pub use presenter::{
    present, present_summary, CategoryCount, DisplayResult, DisplaySummary, DisplayTransfer,
    DistributionRow,
};
pub use request::JobRequestBuilder;
