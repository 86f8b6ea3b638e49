//! JSON bodies returned by the control endpoints.

use serde::{Deserialize, Serialize};

use crate::status::MachineStatus;

/// Error text returned when a start request fails.
pub const START_FAILED: &str = "Could not start VM";
/// Error text returned when a stop request fails.
pub const STOP_FAILED: &str = "Could not stop VM";
/// Error text returned when the status lookup fails.
pub const STATUS_FAILED: &str = "Could not fetch status";

/// Body of `/vm/start`, `/vm/stop`, and of a failed `/vm/status`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ActionResponse {
    /// Status after the operation, or the assumed status on failure.
    pub status: MachineStatus,
    /// Caller-facing error text; omitted on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResponse {
    /// Successful outcome.
    #[must_use]
    pub const fn ok(status: MachineStatus) -> Self {
        Self {
            status,
            error: None,
        }
    }

    /// Failed outcome carrying a generic message.
    #[must_use]
    pub fn failed(status: MachineStatus, error: &str) -> Self {
        Self {
            status,
            error: Some(error.to_owned()),
        }
    }
}

/// Body of a successful `/vm/status`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StatusReport {
    /// Mapped power state.
    pub status: MachineStatus,
    /// Provider timestamp when the VM is running; `null` otherwise.
    #[serde(rename = "startedAt")]
    pub started_at: Option<String>,
}

/// Body of `/health`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: String,
    /// Crate version.
    pub version: String,
}
