//! Block-device hotplug events.
//!
//! The monitor consumes these from an abstract queue; the producing side
//! is either the udev source (`hotplug` module, feature-gated) or any
//! other feeder such as the JSON-lines bench source in the CLI. Events
//! are consumed once and never retained.

use serde::{Deserialize, Serialize};

/// Device kind carried by partition events. Whole-disk and other kinds
/// are ignored by the monitor.
pub const PARTITION_KIND: &str = "partition";

/// Hotplug action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceAction {
    Add,
    Remove,
}

/// One hotplug event from the OS block subsystem.
///
/// All metadata besides the action is optional: the OS does not guarantee
/// any of it, and the monitor's filters decide what is actionable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDeviceEvent {
    pub action: DeviceAction,

    /// Device node path, e.g. /dev/sdb1.
    #[serde(default)]
    pub device_path: Option<String>,

    /// Filesystem type reported by the OS, e.g. "vfat".
    #[serde(default)]
    pub fs_type: Option<String>,

    /// Device kind, e.g. "partition" or "disk".
    #[serde(default)]
    pub device_kind: Option<String>,

    /// Volume label, when the media carries one.
    #[serde(default)]
    pub volume_label: Option<String>,

    /// Partition size in bytes, when reported.
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

impl BlockDeviceEvent {
    /// Whether this event targets a partition device.
    pub fn is_partition(&self) -> bool {
        self.device_kind.as_deref() == Some(PARTITION_KIND)
    }

    /// Partition size in whole megabytes, 0 when unreported.
    pub fn size_mib(&self) -> u64 {
        self.size_bytes.unwrap_or(0) / (1024 * 1024)
    }

    /// Volume label for operator messages, with a placeholder when absent.
    pub fn label(&self) -> &str {
        self.volume_label.as_deref().unwrap_or("unlabelled media")
    }
}
