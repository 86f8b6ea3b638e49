//! Azure Resource Manager implementation of the compute backend.
//!
//! The backend talks to the REST API directly: `POST …/start`,
//! `POST …/deallocate` and `GET …/instanceView` on the configured VM. Power
//! operations are long-running and are polled through the operation URLs
//! Resource Manager hands back.

mod error;
mod lro;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;

use crate::backend::{BackendFuture, ComputeBackend, InstanceView};
use crate::config::{AzureConfig, VmIdentity};
use crate::credential::Credential;

pub use error::AzureBackendError;

/// Compute API version used for every request.
pub const COMPUTE_API_VERSION: &str = "2024-07-01";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PowerAction {
    Start,
    Deallocate,
}

impl PowerAction {
    const fn path(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Deallocate => "deallocate",
        }
    }
}

/// Backend bound to one VM through Resource Manager.
#[derive(Clone, Debug)]
pub struct AzureComputeBackend {
    http: reqwest::Client,
    credential: Arc<Credential>,
    identity: VmIdentity,
    endpoint: String,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl AzureComputeBackend {
    /// Binds a backend to the VM named in `config`.
    #[must_use]
    pub fn new(config: &AzureConfig, credential: Arc<Credential>) -> Self {
        Self {
            http: crate::http::client(),
            credential,
            identity: config.identity(),
            endpoint: config
                .management_endpoint
                .trim()
                .trim_end_matches('/')
                .to_owned(),
            poll_interval: config.poll_interval(),
            wait_timeout: config.wait_timeout(),
        }
    }

    /// The VM this backend controls.
    #[must_use]
    pub const fn identity(&self) -> &VmIdentity {
        &self.identity
    }

    /// Token audience for the configured endpoint.
    fn audience(&self) -> String {
        format!("{}/", self.endpoint)
    }

    fn vm_url(&self, suffix: &str) -> String {
        format!(
            "{}{}/{suffix}",
            self.endpoint,
            self.identity.resource_path()
        )
    }

    async fn authorization(&self) -> Result<String, AzureBackendError> {
        let token = self.credential.token(&self.audience()).await?;
        Ok(format!("Bearer {}", token.secret()))
    }

    async fn power_action(&self, action: PowerAction) -> Result<(), AzureBackendError> {
        let url = self.vm_url(action.path());
        let response = self
            .http
            .post(&url)
            .query(&[("api-version", COMPUTE_API_VERSION)])
            .header(AUTHORIZATION, self.authorization().await?)
            .body("")
            .send()
            .await
            .map_err(|err| AzureBackendError::transport(&url, &err))?;

        tracing::debug!(
            operation = action.path(),
            vm = %self.identity,
            status = response.status().as_u16(),
            "power operation accepted"
        );
        self.wait_for_completion(action.path(), response).await
    }

    async fn fetch_instance_view(&self) -> Result<InstanceView, AzureBackendError> {
        let url = self.vm_url("instanceView");
        let response = self
            .http
            .get(&url)
            .query(&[("api-version", COMPUTE_API_VERSION)])
            .header(AUTHORIZATION, self.authorization().await?)
            .send()
            .await
            .map_err(|err| AzureBackendError::transport(&url, &err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| AzureBackendError::transport(&url, &err))?;
        if !status.is_success() {
            return Err(AzureBackendError::from_response_body(
                status.as_u16(),
                &body,
            ));
        }

        serde_json::from_str(&body).map_err(|err| AzureBackendError::Decode {
            what: String::from("instance view"),
            message: err.to_string(),
        })
    }
}

impl ComputeBackend for AzureComputeBackend {
    type Error = AzureBackendError;

    fn start(&self) -> BackendFuture<'_, (), Self::Error> {
        Box::pin(self.power_action(PowerAction::Start))
    }

    fn deallocate(&self) -> BackendFuture<'_, (), Self::Error> {
        Box::pin(self.power_action(PowerAction::Deallocate))
    }

    fn instance_view(&self) -> BackendFuture<'_, InstanceView, Self::Error> {
        Box::pin(self.fetch_instance_view())
    }
}
