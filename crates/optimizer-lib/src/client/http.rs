//! HTTP client for the optimization backend

use super::{async_trait, JobClient, RESULTS_PATH, STATUS_PATH, SUBMIT_PATH, SUMMARY_PATH};
use crate::error::TransportError;
use crate::models::{DashboardSummary, JobParameters, JobResult, RemoteStatus, SubmissionAck};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Backend base URL (e.g., "http://localhost:8000")
    pub base_url: String,
    /// Timeout applied to each request
    pub request_timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Error body returned by the backend on failures
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP implementation of [`JobClient`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client with default timeouts
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_config(ApiClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
    }

    /// Create a new API client from explicit configuration
    pub fn with_config(config: ApiClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to create HTTP client: {}", e)))?;

        // A trailing slash keeps `join` from dropping the last path segment
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| TransportError::Network(format!("invalid API URL '{}': {}", base, e)))?;

        Ok(Self { client, base_url })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the dashboard summary
    pub async fn fetch_summary(&self) -> Result<DashboardSummary, TransportError> {
        self.get(SUMMARY_PATH).await
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let url = self.url(path)?;
        debug!(url = %url, "GET");

        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        let url = self.url(path)?;
        debug!(url = %url, "POST");

        let response = self.client.post(url).json(body).send().await?;
        Self::decode(response).await
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::Network(format!("invalid path '{}': {}", path, e)))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(TransportError::from)
    }
}

#[async_trait]
impl JobClient for ApiClient {
    async fn submit(&self, parameters: &JobParameters) -> Result<SubmissionAck, TransportError> {
        self.post(SUBMIT_PATH, parameters).await
    }

    async fn fetch_status(&self) -> Result<RemoteStatus, TransportError> {
        self.get(STATUS_PATH).await
    }

    async fn fetch_results(&self) -> Result<JobResult, TransportError> {
        self.get(RESULTS_PATH).await
    }
}
