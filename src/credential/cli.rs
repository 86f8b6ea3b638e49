//! Token acquisition through a locally logged-in Azure CLI.

use std::ffi::OsString;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::process::{CommandRunner, ProcessCommandRunner};

use super::error::CredentialError;
use super::token::{AccessToken, EpochSeconds};

/// Default Azure CLI binary name.
pub const DEFAULT_AZ_BIN: &str = "az";

/// Credential that borrows the operator's `az login` session.
#[derive(Clone)]
pub struct AzureCliCredential {
    program: String,
    runner: Arc<dyn CommandRunner>,
}

impl AzureCliCredential {
    /// Creates a credential wired to the real `az` binary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_runner(DEFAULT_AZ_BIN, ProcessCommandRunner)
    }

    /// Creates a credential using the provided program and runner.
    #[must_use]
    pub fn with_runner(program: impl Into<String>, runner: impl CommandRunner + 'static) -> Self {
        Self {
            program: program.into(),
            runner: Arc::new(runner),
        }
    }

    fn token_args(resource: &str) -> Vec<OsString> {
        vec![
            OsString::from("account"),
            OsString::from("get-access-token"),
            OsString::from("--output"),
            OsString::from("json"),
            OsString::from("--resource"),
            OsString::from(resource),
        ]
    }

    pub(super) async fn fetch(&self, resource: &str) -> Result<AccessToken, CredentialError> {
        let args = Self::token_args(resource);
        let output = self.runner.run(&self.program, &args).await?;
        if !output.is_success() {
            return Err(CredentialError::CommandFailure {
                program: self.program.clone(),
                status_text: output.status_text(),
                stderr: output.stderr.trim().to_owned(),
            });
        }

        let parsed: CliToken =
            serde_json::from_str(&output.stdout).map_err(|err| CredentialError::Parse {
                origin: String::from("az account get-access-token"),
                message: err.to_string(),
            })?;
        let expires_on = parsed
            .expires_on
            .as_ref()
            .and_then(EpochSeconds::to_system_time);
        Ok(AccessToken::new(parsed.access_token, expires_on))
    }
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AzureCliCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureCliCredential")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct CliToken {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(default)]
    expires_on: Option<EpochSeconds>,
}
