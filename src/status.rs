//! Caller-visible lifecycle status of the managed virtual machine.
//!
//! Azure reports power state through a family of `PowerState/*` status codes
//! whose membership grows over time. Callers only ever see the small closed
//! set in [`MachineStatus`]; anything the mapper does not recognise becomes
//! [`MachineStatus::Unknown`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix shared by every instance-view status code describing power state.
pub const POWER_STATE_PREFIX: &str = "PowerState/";

/// Lifecycle state reported to HTTP callers.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MachineStatus {
    /// The VM is powered on.
    Running,
    /// The VM is deallocated.
    Stopped,
    /// The VM is booting.
    Starting,
    /// The VM is being deallocated.
    Stopping,
    /// The provider reported a state outside the vocabulary above, or none.
    Unknown,
}

impl MachineStatus {
    /// Returns the wire representation used in JSON bodies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
            Self::Starting => "STARTING",
            Self::Stopping => "STOPPING",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps an Azure power-state code onto a [`MachineStatus`].
///
/// The mapping is total: unrecognised codes and a missing code both yield
/// [`MachineStatus::Unknown`].
#[must_use]
pub fn map_power_state(code: Option<&str>) -> MachineStatus {
    match code {
        Some("PowerState/running") => MachineStatus::Running,
        Some("PowerState/deallocated") => MachineStatus::Stopped,
        Some("PowerState/deallocating") => MachineStatus::Stopping,
        Some("PowerState/starting") => MachineStatus::Starting,
        _ => MachineStatus::Unknown,
    }
}
