//! HTTP client for the master's worker-facing API.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use aegis_proto::{
    CompleteRequest, HeartbeatRequest, RegisterRequest, RegisterResponse, ShutdownRequest,
    StatusReport, TaskStatus,
};

use crate::config::MasterConfig;
use crate::error::{AgentError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the registration, heartbeat and completion endpoints.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct MasterClient {
    client: Client,
    base_url: String,
}

impl MasterClient {
    /// Creates a client from master connection settings.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Http` if the underlying client cannot be built.
    pub fn new(config: &MasterConfig) -> Result<Self> {
        Self::build(&config.url, config.request_timeout)
    }

    /// Creates a client for the given base URL with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Http` if the underlying client cannot be built.
    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        Self::build(&url.into(), DEFAULT_TIMEOUT)
    }

    fn build(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AgentError::Http)?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_owned(),
        })
    }

    /// Registers the worker and returns the master's acknowledgement,
    /// including the heartbeat cadence the master expects.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Http` on transport failure or
    /// `AgentError::Rejected` if the master refuses the registration.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        let url = format!("{}/worker/register", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(AgentError::Http)?;

        match response.status() {
            StatusCode::OK => response.json().await.map_err(AgentError::Http),
            status => Err(AgentError::Rejected(format!(
                "registration refused with status {status}"
            ))),
        }
    }

    /// Sends one heartbeat carrying the current resource readings.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::UnknownWorker` if the master has no record of
    /// this worker, `AgentError::Rejected` for any other refusal and
    /// `AgentError::Http` on transport failure.
    pub async fn heartbeat(&self, worker_id: &str, status: StatusReport) -> Result<()> {
        let url = format!("{}/worker/heartbeat", self.base_url);
        let request = HeartbeatRequest::new(worker_id, status);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(AgentError::Http)?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(AgentError::UnknownWorker(worker_id.to_owned())),
            status => Err(AgentError::Rejected(format!(
                "heartbeat refused with status {status}"
            ))),
        }
    }

    /// Reports a terminal task outcome.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::UnknownWorker` if the master evicted this worker,
    /// `AgentError::Rejected` for any other refusal and `AgentError::Http`
    /// on transport failure.
    pub async fn complete(
        &self,
        task_id: &str,
        worker_id: &str,
        status: TaskStatus,
    ) -> Result<()> {
        let url = format!("{}/task/complete", self.base_url);
        let mut request = CompleteRequest::new(task_id, worker_id);
        request.status = status;
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(AgentError::Http)?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(AgentError::UnknownWorker(worker_id.to_owned())),
            status => Err(AgentError::Rejected(format!(
                "completion refused with status {status}"
            ))),
        }
    }

    /// Notifies the master that this worker is leaving the pool.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::UnknownWorker` if the master already dropped the
    /// record, `AgentError::Rejected` for any other refusal and
    /// `AgentError::Http` on transport failure.
    pub async fn shutdown(&self, worker_id: &str) -> Result<()> {
        let url = format!("{}/worker/shutdown", self.base_url);
        let request = ShutdownRequest::new(worker_id);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(AgentError::Http)?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(AgentError::UnknownWorker(worker_id.to_owned())),
            status => Err(AgentError::Rejected(format!(
                "shutdown notice refused with status {status}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_from_config() {
        let config = MasterConfig::default();
        let client = MasterClient::new(&config);
        assert!(client.is_ok());
    }

    #[test]
    fn client_with_custom_url() {
        let client = MasterClient::with_url("http://master.internal:8080");
        assert!(client.is_ok());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = MasterClient::with_url("http://master.internal:8080/").unwrap();
        assert_eq!(client.base_url, "http://master.internal:8080");
    }
}
