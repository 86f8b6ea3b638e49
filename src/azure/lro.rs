//! Long-running operation tracking for Resource Manager power actions.
//!
//! A `202 Accepted` response names where progress can be observed. The
//! `Azure-AsyncOperation` URL returns a status document; the `Location` URL
//! keeps answering `202` until the operation finishes.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tokio::time::sleep;

use super::error::ErrorDetail;
use super::{AzureBackendError, AzureComputeBackend};

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

#[derive(Clone, Debug, Eq, PartialEq)]
enum Monitor {
    AsyncOperation(String),
    Location(String),
}

impl Monitor {
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        };
        header(AZURE_ASYNC_OPERATION)
            .map(Self::AsyncOperation)
            .or_else(|| header(LOCATION.as_str()).map(Self::Location))
    }

    fn url(&self) -> &str {
        match self {
            Self::AsyncOperation(url) | Self::Location(url) => url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

/// Progress observed on one poll.
enum Progress {
    Pending(Option<Duration>),
    Done,
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

impl AzureComputeBackend {
    /// Resolves once the operation started by `response` reaches a terminal
    /// state.
    pub(super) async fn wait_for_completion(
        &self,
        operation: &str,
        response: Response,
    ) -> Result<(), AzureBackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AzureBackendError::from_response_body(
                status.as_u16(),
                &body,
            ));
        }
        if status != StatusCode::ACCEPTED {
            return Ok(());
        }

        let Some(monitor) = Monitor::from_headers(response.headers()) else {
            tracing::debug!(operation, "accepted without a monitor URL; treating as done");
            return Ok(());
        };

        let deadline = Instant::now() + self.wait_timeout;
        let mut delay = retry_after(response.headers()).unwrap_or(self.poll_interval);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(AzureBackendError::Timeout {
                    operation: operation.to_owned(),
                    vm_name: self.identity.vm_name.clone(),
                });
            }
            // Retry-After never stretches the wait past the deadline.
            sleep(delay.min(remaining)).await;
            match self.poll(operation, &monitor).await? {
                Progress::Done => return Ok(()),
                Progress::Pending(hint) => delay = hint.unwrap_or(self.poll_interval),
            }
        }
    }

    async fn poll(&self, operation: &str, monitor: &Monitor) -> Result<Progress, AzureBackendError> {
        let url = monitor.url();
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.authorization().await?)
            .send()
            .await
            .map_err(|err| AzureBackendError::transport(url, &err))?;

        let status = response.status();
        let hint = retry_after(response.headers());
        let body = response
            .text()
            .await
            .map_err(|err| AzureBackendError::transport(url, &err))?;
        if !status.is_success() {
            return Err(AzureBackendError::from_response_body(
                status.as_u16(),
                &body,
            ));
        }

        match monitor {
            Monitor::Location(_) if status == StatusCode::ACCEPTED => Ok(Progress::Pending(hint)),
            Monitor::Location(_) => Ok(Progress::Done),
            Monitor::AsyncOperation(_) => self.interpret_status(operation, &body, hint),
        }
    }

    fn interpret_status(
        &self,
        operation: &str,
        body: &str,
        hint: Option<Duration>,
    ) -> Result<Progress, AzureBackendError> {
        let parsed: OperationStatus =
            serde_json::from_str(body).map_err(|err| AzureBackendError::Decode {
                what: String::from("operation status"),
                message: err.to_string(),
            })?;

        if parsed.status.eq_ignore_ascii_case("succeeded") {
            return Ok(Progress::Done);
        }
        if parsed.status.eq_ignore_ascii_case("failed")
            || parsed.status.eq_ignore_ascii_case("canceled")
        {
            let message = parsed
                .error
                .and_then(|detail| detail.message)
                .unwrap_or_default();
            return Err(AzureBackendError::OperationFailed {
                operation: operation.to_owned(),
                vm_name: self.identity.vm_name.clone(),
                status: parsed.status,
                message,
            });
        }

        tracing::trace!(operation, status = %parsed.status, "operation still running");
        Ok(Progress::Pending(hint))
    }
}
