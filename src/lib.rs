//! Core library for the `vmgate` VM control service.
//!
//! The crate exposes a compute backend abstraction for one Azure virtual
//! machine, an Azure Resource Manager implementation authenticated by either
//! the operator's CLI login or a managed identity, and an HTTP router that
//! starts, deallocates, and reports the power state of that machine.

pub mod azure;
pub mod backend;
pub mod config;
pub mod credential;
mod http;
pub mod process;
pub mod server;
pub mod status;
pub mod test_support;

pub use azure::{AzureBackendError, AzureComputeBackend};
pub use backend::{BackendFuture, ComputeBackend, InstanceStatus, InstanceView};
pub use config::{AzureConfig, ConfigError, VmIdentity};
pub use credential::{Credential, CredentialError, CredentialKind};
pub use server::router;
pub use status::{MachineStatus, map_power_state};
