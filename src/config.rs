//! Configuration loading via `ortho-config`.

use std::fmt;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Public Azure Resource Manager endpoint.
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// Azure settings derived from environment variables and configuration files.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "AZURE",
    discovery(
        app_name = "vmgate",
        env_var = "VMGATE_CONFIG_PATH",
        config_file_name = "vmgate.toml",
        dotfile_name = ".vmgate.toml",
        project_file_name = "vmgate.toml"
    )
)]
pub struct AzureConfig {
    /// Subscription that owns the VM. Empty values are passed through and
    /// fail when the first remote call is made.
    #[ortho_config(default = String::new())]
    pub subscription_id: String,
    /// Resource group containing the VM.
    #[ortho_config(default = String::new())]
    pub resource_group: String,
    /// Name of the VM under control.
    #[ortho_config(default = String::new())]
    pub vm_name: String,
    /// Client id of a user-assigned managed identity. When absent the
    /// system-assigned identity is used.
    pub client_id: Option<String>,
    /// Resource Manager base URL. Override for sovereign clouds.
    #[ortho_config(default = DEFAULT_MANAGEMENT_ENDPOINT.to_owned())]
    pub management_endpoint: String,
    /// Fallback delay between long-running operation polls when the provider
    /// does not send `Retry-After`.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
    /// Upper bound on waiting for a start or deallocate operation.
    #[ortho_config(default = 1800)]
    pub wait_timeout_secs: u64,
}

/// Identifies the single VM this process controls.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VmIdentity {
    /// Subscription identifier.
    pub subscription_id: String,
    /// Resource group name.
    pub resource_group: String,
    /// VM name.
    pub vm_name: String,
}

impl VmIdentity {
    /// Builds an identity from its three components.
    #[must_use]
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        vm_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            vm_name: vm_name.into(),
        }
    }

    /// Resource Manager path of the VM, without host or query.
    #[must_use]
    pub fn resource_path(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/virtualMachines/{}",
            self.subscription_id, self.resource_group, self.vm_name
        )
    }
}

impl fmt::Display for VmIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.subscription_id, self.resource_group, self.vm_name
        )
    }
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl AzureConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to vmgate.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("vmgate")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Returns the identity triple of the controlled VM.
    #[must_use]
    pub fn identity(&self) -> VmIdentity {
        VmIdentity::new(
            self.subscription_id.trim(),
            self.resource_group.trim(),
            self.vm_name.trim(),
        )
    }

    /// Delay between operation polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Maximum time spent waiting on a long-running operation.
    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    /// Performs semantic validation on the VM identity and endpoint. The
    /// server does not refuse to start on failure; callers decide.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.subscription_id,
            &FieldMetadata::new(
                "Azure subscription ID",
                "AZURE_SUBSCRIPTION_ID",
                "subscription_id",
            ),
        )?;
        Self::require_field(
            &self.resource_group,
            &FieldMetadata::new("resource group", "AZURE_RESOURCE_GROUP", "resource_group"),
        )?;
        Self::require_field(
            &self.vm_name,
            &FieldMetadata::new("VM name", "AZURE_VM_NAME", "vm_name"),
        )?;
        Self::require_field(
            &self.management_endpoint,
            &FieldMetadata::new(
                "Resource Manager endpoint",
                "AZURE_MANAGEMENT_ENDPOINT",
                "management_endpoint",
            ),
        )?;
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
