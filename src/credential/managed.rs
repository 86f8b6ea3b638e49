//! Token acquisition through the managed identity attached to the host.

use std::env;
use std::fmt;

use serde::Deserialize;

use super::error::CredentialError;
use super::token::{AccessToken, EpochSeconds};

/// Instance Metadata Service token endpoint available on Azure VMs.
pub const IMDS_TOKEN_URL: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
/// Variable carrying the identity endpoint on App Service and Container Apps.
pub const IDENTITY_ENDPOINT_ENV: &str = "IDENTITY_ENDPOINT";
/// Variable carrying the shared secret for [`IDENTITY_ENDPOINT_ENV`].
pub const IDENTITY_HEADER_ENV: &str = "IDENTITY_HEADER";

const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// Where managed identity tokens are issued from.
#[derive(Clone, Eq, PartialEq)]
pub enum ManagedIdentitySource {
    /// Instance Metadata Service (VMs, scale sets, AKS nodes).
    Imds {
        /// Token endpoint URL.
        url: String,
    },
    /// Hosting-platform identity endpoint (App Service, Container Apps).
    AppService {
        /// Token endpoint URL.
        url: String,
        /// Secret sent as `X-IDENTITY-HEADER`.
        header: String,
    },
}

impl ManagedIdentitySource {
    /// Detects the source from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::detect(
            env::var(IDENTITY_ENDPOINT_ENV).ok(),
            env::var(IDENTITY_HEADER_ENV).ok(),
        )
    }

    /// Picks the hosting-platform endpoint when both values are present and
    /// non-empty, falling back to IMDS.
    #[must_use]
    pub fn detect(endpoint: Option<String>, header: Option<String>) -> Self {
        match (endpoint, header) {
            (Some(url), Some(header)) if !url.trim().is_empty() && !header.is_empty() => {
                Self::AppService {
                    url: url.trim().to_owned(),
                    header,
                }
            }
            _ => Self::Imds {
                url: IMDS_TOKEN_URL.to_owned(),
            },
        }
    }

    const fn api_version(&self) -> &'static str {
        match self {
            Self::Imds { .. } => IMDS_API_VERSION,
            Self::AppService { .. } => APP_SERVICE_API_VERSION,
        }
    }

    fn url(&self) -> &str {
        match self {
            Self::Imds { url } | Self::AppService { url, .. } => url,
        }
    }
}

impl fmt::Debug for ManagedIdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imds { url } => f.debug_struct("Imds").field("url", url).finish(),
            Self::AppService { url, .. } => f
                .debug_struct("AppService")
                .field("url", url)
                .field("header", &"<redacted>")
                .finish(),
        }
    }
}

/// Credential backed by the host's managed identity.
#[derive(Clone, Debug)]
pub struct ManagedIdentityCredential {
    source: ManagedIdentitySource,
    client_id: Option<String>,
    http: reqwest::Client,
}

impl ManagedIdentityCredential {
    /// Creates a credential for the given source. `client_id` selects a
    /// user-assigned identity.
    #[must_use]
    pub fn new(source: ManagedIdentitySource, client_id: Option<String>) -> Self {
        Self {
            source,
            client_id: client_id
                .map(|id| id.trim().to_owned())
                .filter(|id| !id.is_empty()),
            http: crate::http::client(),
        }
    }

    /// Creates a credential whose source is detected from the environment.
    #[must_use]
    pub fn from_env(client_id: Option<String>) -> Self {
        Self::new(ManagedIdentitySource::from_env(), client_id)
    }

    /// The endpoint this credential requests tokens from.
    #[must_use]
    pub const fn source(&self) -> &ManagedIdentitySource {
        &self.source
    }

    pub(super) async fn fetch(&self, resource: &str) -> Result<AccessToken, CredentialError> {
        let mut query = vec![
            ("api-version", self.source.api_version()),
            ("resource", resource),
        ];
        if let Some(client_id) = self.client_id.as_deref() {
            query.push(("client_id", client_id));
        }

        let request = self.http.get(self.source.url()).query(&query);
        let request = match &self.source {
            ManagedIdentitySource::Imds { .. } => request.header("Metadata", "true"),
            ManagedIdentitySource::AppService { header, .. } => {
                request.header("X-IDENTITY-HEADER", header)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|err| CredentialError::Request {
                message: err.to_string(),
            })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| CredentialError::Request {
                message: err.to_string(),
            })?;
        if !status.is_success() {
            return Err(CredentialError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ManagedToken =
            serde_json::from_str(&body).map_err(|err| CredentialError::Parse {
                origin: String::from("managed identity"),
                message: err.to_string(),
            })?;
        let expires_on = parsed
            .expires_on
            .as_ref()
            .and_then(EpochSeconds::to_system_time);
        Ok(AccessToken::new(parsed.access_token, expires_on))
    }
}

#[derive(Deserialize)]
struct ManagedToken {
    access_token: String,
    #[serde(default)]
    expires_on: Option<EpochSeconds>,
}
