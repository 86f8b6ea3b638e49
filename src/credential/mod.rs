//! Credential selection for Resource Manager calls.
//!
//! A process picks exactly one credential at startup. Operators running the
//! service on their workstation set `IS_LOCAL_ENV` and rely on their `az
//! login` session; deployments inside Azure use the managed identity attached
//! to the host. Construction never performs I/O, so a broken credential only
//! surfaces on the first remote call.

mod cli;
mod error;
mod managed;
mod token;

use std::env;
use std::ffi::OsStr;
use std::fmt;
use std::time::SystemTime;

use tokio::sync::Mutex;

pub use cli::{AzureCliCredential, DEFAULT_AZ_BIN};
pub use error::CredentialError;
pub use managed::{
    IDENTITY_ENDPOINT_ENV, IDENTITY_HEADER_ENV, IMDS_TOKEN_URL, ManagedIdentityCredential,
    ManagedIdentitySource,
};
pub use token::AccessToken;

/// Environment flag selecting the Azure CLI credential.
pub const LOCAL_ENV_FLAG: &str = "IS_LOCAL_ENV";

/// Which identity mechanism the process authenticates with.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CredentialKind {
    /// The operator's Azure CLI login.
    AzureCli,
    /// The managed identity of the hosting Azure resource.
    ManagedIdentity,
}

impl CredentialKind {
    /// Maps the raw value of [`LOCAL_ENV_FLAG`]: any non-empty value selects
    /// the CLI credential.
    #[must_use]
    pub fn from_local_flag(value: Option<&OsStr>) -> Self {
        match value {
            Some(flag) if !flag.is_empty() => Self::AzureCli,
            _ => Self::ManagedIdentity,
        }
    }

    /// Reads [`LOCAL_ENV_FLAG`] from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_local_flag(env::var_os(LOCAL_ENV_FLAG).as_deref())
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AzureCli => "azure-cli",
            Self::ManagedIdentity => "managed-identity",
        })
    }
}

#[derive(Clone, Debug)]
enum CredentialSource {
    AzureCli(AzureCliCredential),
    ManagedIdentity(ManagedIdentityCredential),
}

#[derive(Clone, Debug)]
struct CachedToken {
    resource: String,
    token: AccessToken,
}

/// Authentication handle shared by every request.
///
/// Tokens carrying an expiry are cached until shortly before they lapse.
#[derive(Debug)]
pub struct Credential {
    source: CredentialSource,
    cache: Mutex<Option<CachedToken>>,
}

impl Credential {
    /// Builds the credential matching `kind`. `client_id` only applies to the
    /// managed identity variant.
    #[must_use]
    pub fn select(kind: CredentialKind, client_id: Option<String>) -> Self {
        match kind {
            CredentialKind::AzureCli => Self::azure_cli(AzureCliCredential::new()),
            CredentialKind::ManagedIdentity => {
                Self::managed_identity(ManagedIdentityCredential::from_env(client_id))
            }
        }
    }

    /// Wraps an Azure CLI credential.
    #[must_use]
    pub const fn azure_cli(credential: AzureCliCredential) -> Self {
        Self::from_source(CredentialSource::AzureCli(credential))
    }

    /// Wraps a managed identity credential.
    #[must_use]
    pub const fn managed_identity(credential: ManagedIdentityCredential) -> Self {
        Self::from_source(CredentialSource::ManagedIdentity(credential))
    }

    const fn from_source(source: CredentialSource) -> Self {
        Self {
            source,
            cache: Mutex::const_new(None),
        }
    }

    /// Reports which variant is in use.
    #[must_use]
    pub const fn kind(&self) -> CredentialKind {
        match self.source {
            CredentialSource::AzureCli(_) => CredentialKind::AzureCli,
            CredentialSource::ManagedIdentity(_) => CredentialKind::ManagedIdentity,
        }
    }

    /// Returns a token for `resource`, reusing the cached one while fresh.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the underlying mechanism cannot issue
    /// a token.
    pub async fn token(&self, resource: &str) -> Result<AccessToken, CredentialError> {
        if let Some(token) = self.cached(resource).await {
            return Ok(token);
        }

        // The lock is not held while fetching, so concurrent misses may both
        // fetch; the last one to finish populates the cache.
        let token = match &self.source {
            CredentialSource::AzureCli(credential) => credential.fetch(resource).await?,
            CredentialSource::ManagedIdentity(credential) => credential.fetch(resource).await?,
        };
        tracing::debug!(credential = %self.kind(), resource, "acquired access token");

        if token.expires_on().is_some() {
            *self.cache.lock().await = Some(CachedToken {
                resource: resource.to_owned(),
                token: token.clone(),
            });
        }
        Ok(token)
    }

    async fn cached(&self, resource: &str) -> Option<AccessToken> {
        self.cache
            .lock()
            .await
            .as_ref()
            .filter(|cached| cached.resource == resource)
            .filter(|cached| cached.token.is_fresh(SystemTime::now()))
            .map(|cached| cached.token.clone())
    }
}
