//! Daemon configuration.
//!
//! Loaded once at startup from a JSON file. Everything except the
//! required-instrument profile has a sensible default, so a minimal
//! config only declares the profile:
//!
//! ```json
//! {
//!   "required_instruments": {
//!     "NET/SWI/101/B/SB2": 3,
//!     "KAM/CHS/06U": 1,
//!     "NET/REC/006/B": 1
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the provisioning daemon.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory where removable media is mounted.
    ///
    /// Default: /mnt/usbkey
    #[serde(default = "default_mount_point")]
    pub mount_point: PathBuf,

    /// Descriptor filename expected at the root of the mounted media.
    ///
    /// Default: allswi101.xidml
    #[serde(default = "default_descriptor_name")]
    pub descriptor_name: String,

    /// Filesystem types accepted on removable media.
    ///
    /// Default: ["vfat"]
    #[serde(default = "default_filesystems")]
    pub filesystems: Vec<String>,

    /// Instrument identifier to exact required occurrence count.
    ///
    /// A descriptor must declare every identifier listed here, the listed
    /// number of times. Identifiers not listed are ignored.
    pub required_instruments: HashMap<String, u32>,

    /// Multicast group for operator status messages.
    ///
    /// Default: 235.0.0.1
    #[serde(default = "default_multicast_group")]
    pub multicast_group: Ipv4Addr,

    /// UDP port for operator status messages.
    ///
    /// Default: 4444
    #[serde(default = "default_multicast_port")]
    pub multicast_port: u16,

    /// Wait after device arrival before the mount attempt, in seconds.
    ///
    /// Tolerates hardware/bus enumeration races. Default: 2
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,

    /// External compile/program tool settings.
    #[serde(default)]
    pub toolchain: ToolchainConfig,
}

/// Settings for the external compile/program tool.
///
/// An unset command makes that stage a no-op that succeeds, matching a
/// board where only one of the two steps is wired up.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Command invoked as `<compile_command> <task-file>`.
    #[serde(default)]
    pub compile_command: Option<PathBuf>,

    /// Command invoked as `<program_command> <task-file>`.
    #[serde(default)]
    pub program_command: Option<PathBuf>,

    /// Deadline for each tool invocation, in seconds.
    ///
    /// The tool runs on the event-handling task, so a runaway invocation
    /// would stall event processing forever without this. Default: 300
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
}

impl DaemonConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(config)
    }

    /// Full path of the descriptor file on mounted media.
    pub fn descriptor_path(&self) -> PathBuf {
        self.mount_point.join(&self.descriptor_name)
    }

    /// Settling delay before the mount attempt.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    /// Whether a filesystem type is accepted for mounting.
    pub fn accepts_filesystem(&self, fstype: &str) -> bool {
        self.filesystems.iter().any(|f| f == fstype)
    }
}

impl ToolchainConfig {
    /// Deadline for a single tool invocation.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_mount_point() -> PathBuf {
    PathBuf::from("/mnt/usbkey")
}

fn default_descriptor_name() -> String {
    "allswi101.xidml".to_string()
}

fn default_filesystems() -> Vec<String> {
    vec!["vfat".to_string()]
}

fn default_multicast_group() -> Ipv4Addr {
    Ipv4Addr::new(235, 0, 0, 1)
}

fn default_multicast_port() -> u16 {
    4444
}

fn default_settle_delay_secs() -> u64 {
    2
}

fn default_tool_timeout_secs() -> u64 {
    300
}
