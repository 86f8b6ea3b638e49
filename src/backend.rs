//! Compute backend abstraction for the single managed virtual machine.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use crate::status::{MachineStatus, POWER_STATE_PREFIX, map_power_state};

/// One entry of the provider's instance-view status collection.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatus {
    /// Provider status code (for example `PowerState/running`).
    #[serde(default)]
    pub code: Option<String>,
    /// Severity level reported alongside the code.
    #[serde(default)]
    pub level: Option<String>,
    /// Short localised label for the status.
    #[serde(default)]
    pub display_status: Option<String>,
    /// Timestamp attached to the status, as reported by the provider.
    #[serde(default)]
    pub time: Option<String>,
}

impl InstanceStatus {
    /// Builds a status entry carrying only a code.
    #[must_use]
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::default()
        }
    }

    /// Attaches a timestamp to the entry.
    #[must_use]
    pub fn at(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }
}

/// Snapshot of the VM's runtime status.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct InstanceView {
    /// Ordered status entries as returned by the provider.
    #[serde(default)]
    pub statuses: Vec<InstanceStatus>,
}

impl InstanceView {
    /// Returns the code of the first entry describing power state.
    #[must_use]
    pub fn power_state(&self) -> Option<&str> {
        self.statuses
            .iter()
            .filter_map(|status| status.code.as_deref())
            .find(|code| code.starts_with(POWER_STATE_PREFIX))
    }

    /// Returns the timestamp of the first entry that carries one.
    #[must_use]
    pub fn first_timestamp(&self) -> Option<&str> {
        self.statuses
            .iter()
            .find_map(|status| status.time.as_deref())
    }

    /// Maps the power state onto the caller-visible status.
    #[must_use]
    pub fn machine_status(&self) -> MachineStatus {
        map_power_state(self.power_state())
    }
}

/// Future returned by backend operations.
pub type BackendFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Remote operations available against the configured VM.
///
/// `start` and `deallocate` resolve only once the provider reports the
/// operation finished.
pub trait ComputeBackend {
    /// Provider specific error type returned by the backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Powers the VM on.
    fn start(&self) -> BackendFuture<'_, (), Self::Error>;

    /// Stops the VM and releases its compute allocation.
    fn deallocate(&self) -> BackendFuture<'_, (), Self::Error>;

    /// Fetches the current instance view.
    fn instance_view(&self) -> BackendFuture<'_, InstanceView, Self::Error>;
}
