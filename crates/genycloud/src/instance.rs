//! Cloud emulator instances

use std::fmt;

use serde::{Deserialize, Serialize};

/// Serial the cloud reports for an instance that has no adb tunnel yet
pub const DISCONNECTED_ADB_SERIAL: &str = "0.0.0.0";

/// Instance lifecycle state as reported by the cloud
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceState {
    Creating,
    Starting,
    Booting,
    Online,
    Recycling,
    Recycled,
    Stopping,
    Deleted,
    Error,
    #[serde(other)]
    Unknown,
}

impl InstanceState {
    pub fn is_online(&self) -> bool {
        matches!(self, InstanceState::Online)
    }

    /// The instance is going away or already gone
    pub fn is_terminated(&self) -> bool {
        matches!(
            self,
            InstanceState::Stopping | InstanceState::Deleted | InstanceState::Error
        )
    }
}

/// A running (or starting) cloud emulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub uuid: String,
    /// Display name given at creation
    pub name: Option<String>,
    pub state: InstanceState,
    /// Connection handle used to direct adb commands
    pub adb_name: String,
    /// Recipe the instance was started from
    pub recipe_uuid: Option<String>,
}

impl Instance {
    pub fn is_online(&self) -> bool {
        self.state.is_online()
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminated()
    }

    pub fn is_adb_connected(&self) -> bool {
        !self.adb_name.is_empty() && self.adb_name != DISCONNECTED_ADB_SERIAL
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }

    /// Handle returned to callers of the driver
    pub fn handle(&self) -> DeviceHandle {
        DeviceHandle {
            adb_name: self.adb_name.clone(),
            uuid: self.uuid.clone(),
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenyCloud:{} ({} {})", self.display_name(), self.uuid, self.adb_name)
    }
}

/// Outcome of instance allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub instance: Instance,
    /// The instance was created for this allocation rather than reused
    pub is_new: bool,
}

/// What the driver hands back once a device is usable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceHandle {
    pub adb_name: String,
    pub uuid: String,
}
