//! Core data models for optimization jobs

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Strategy used when the caller does not choose one
pub const DEFAULT_STRATEGY: &str = "cost_efficiency";

/// Validated submission payload for `POST /api/optimize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParameters {
    pub strategy: String,
    pub parameters: BTreeMap<String, f64>,
}

/// Acknowledgement returned by the backend when a job is submitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Job state as reported by the backend status endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteState {
    Processing,
    Completed,
    Error,
    /// Any other value, kept verbatim (e.g. "No optimization has been run yet")
    Other(String),
}

impl RemoteState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "processing" => RemoteState::Processing,
            "completed" => RemoteState::Completed,
            "error" => RemoteState::Error,
            other => RemoteState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RemoteState::Processing => "processing",
            RemoteState::Completed => "completed",
            RemoteState::Error => "error",
            RemoteState::Other(raw) => raw,
        }
    }
}

/// Response of `GET /api/optimization/status`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawStatus")]
pub struct RemoteStatus {
    pub state: RemoteState,
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct RawStatus {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

impl From<RawStatus> for RemoteStatus {
    fn from(raw: RawStatus) -> Self {
        Self {
            state: RemoteState::parse(&raw.status),
            message: raw.message,
        }
    }
}

impl RemoteStatus {
    pub fn new(state: RemoteState) -> Self {
        Self {
            state,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Lifecycle status of a job as tracked by the orchestrator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Submitting,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Returns true once no further automatic transitions will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Idle => write!(f, "idle"),
            JobStatus::Submitting => write!(f, "submitting"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Result of a completed optimization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub total_blocks_analyzed: u64,
    pub transfers_recommended: u64,
    pub current_avg_daily_cost: f64,
    pub expected_avg_daily_cost: f64,
    pub expected_monthly_savings: f64,
    pub percentage_improvement: f64,
    pub current_distribution: BTreeMap<String, u64>,
    pub optimized_distribution: BTreeMap<String, u64>,
    pub recommended_transfers: Vec<TransferRecommendation>,
}

/// A suggested move of one QPU block to another category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecommendation {
    #[serde(deserialize_with = "string_or_number")]
    pub block_id: String,
    pub current_category: String,
    pub recommended_category: String,
    /// Block size in bytes
    pub size: f64,
    pub avg_daily_workloads: f64,
    /// Raw micro-unit encoding
    pub expected_savings_30d: f64,
    pub days_to_break_even: f64,
}

/// Response of `GET /api/summary`
///
/// The backend stringifies several numeric fields, so they accept either form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(deserialize_with = "number_or_string")]
    pub total_blocks: f64,
    #[serde(default)]
    pub blocks_by_type: BTreeMap<String, u64>,
    #[serde(deserialize_with = "number_or_string")]
    pub total_workloads: f64,
    /// Raw micro-unit encoding
    #[serde(deserialize_with = "number_or_string")]
    pub average_cost_per_day: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub cost_savings_percentage: f64,
    #[serde(default)]
    pub recommendation: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Number(serde_json::Number),
    Text(String),
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Lenient::deserialize(deserializer)? {
        Lenient::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom(format!("number out of range: {}", n))),
        Lenient::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got '{}'", s))),
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Lenient::deserialize(deserializer)? {
        Lenient::Number(n) => Ok(n.to_string()),
        Lenient::Text(s) => Ok(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_status_parse() {
        let status: RemoteStatus =
            serde_json::from_str(r#"{"status": "processing"}"#).unwrap();
        assert_eq!(status.state, RemoteState::Processing);
        assert_eq!(status.message, None);

        let status: RemoteStatus =
            serde_json::from_str(r#"{"status": "error", "message": "solver crashed"}"#).unwrap();
        assert_eq!(status.state, RemoteState::Error);
        assert_eq!(status.message.as_deref(), Some("solver crashed"));
    }

    #[test]
    fn test_remote_status_unknown_value_kept_verbatim() {
        let status: RemoteStatus =
            serde_json::from_str(r#"{"status": "No optimization has been run yet"}"#).unwrap();
        assert_eq!(
            status.state,
            RemoteState::Other("No optimization has been run yet".to_string())
        );
        assert_eq!(status.state.as_str(), "No optimization has been run yet");
    }

    #[test]
    fn test_remote_status_missing_field_is_error() {
        let result: Result<RemoteStatus, _> = serde_json::from_str(r#"{"message": "hi"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_job_parameters_wire_shape() {
        let mut parameters = BTreeMap::new();
        parameters.insert("max_blocks".to_string(), 100.0);
        parameters.insert("workload_threshold".to_string(), 50.0);
        let params = JobParameters {
            strategy: DEFAULT_STRATEGY.to_string(),
            parameters,
        };

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["strategy"], "cost_efficiency");
        assert_eq!(json["parameters"]["max_blocks"], 100.0);
        assert_eq!(json["parameters"]["workload_threshold"], 50.0);
    }

    #[test]
    fn test_job_result_accepts_numeric_block_id() {
        let json = r#"{
            "total_blocks_analyzed": 40,
            "transfers_recommended": 1,
            "current_avg_daily_cost": 1500.5,
            "expected_avg_daily_cost": 1200.25,
            "expected_monthly_savings": 9007.5,
            "percentage_improvement": 20.01,
            "current_distribution": {"Atom": 20, "Photon": 20},
            "optimized_distribution": {"Atom": 21, "Photon": 19},
            "recommended_transfers": [{
                "block_id": 17,
                "current_category": "Photon",
                "recommended_category": "Atom",
                "size": 2097152,
                "avg_daily_workloads": 3.5,
                "expected_savings_30d": 12345000,
                "days_to_break_even": 1234.5
            }]
        }"#;

        let result: JobResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.total_blocks_analyzed, 40);
        assert_eq!(result.recommended_transfers[0].block_id, "17");
        assert_eq!(result.current_distribution["Atom"], 20);
    }

    #[test]
    fn test_job_result_missing_field_is_error() {
        let result: Result<JobResult, _> =
            serde_json::from_str(r#"{"total_blocks_analyzed": 40}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_dashboard_summary_accepts_stringified_numbers() {
        let json = r#"{
            "total_blocks": "120",
            "blocks_by_type": {"Atom": 50, "Spin": 70},
            "total_workloads": "5400",
            "average_cost_per_day": "25000000.0",
            "cost_savings_percentage": 12,
            "recommendation": "Move idle Photon blocks to Atom"
        }"#;

        let summary: DashboardSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.total_blocks, 120.0);
        assert_eq!(summary.average_cost_per_day, 25_000_000.0);
        assert_eq!(summary.cost_savings_percentage, 12.0);
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Idle.is_terminal());
        assert!(!JobStatus::Submitting.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert_eq!(JobStatus::default(), JobStatus::Idle);
    }
}
