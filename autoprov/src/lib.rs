//! autoprov - unattended USB-key provisioning for embedded test-equipment
//! boards.
//!
//! The daemon watches for removable-storage insertion, validates the task
//! descriptor found on the media against a required hardware-instrument
//! profile, drives an external compile-and-program toolchain, and reports
//! each outcome over best-effort UDP multicast so field operators get
//! status without a terminal.
//!
//! Data flows one direction:
//!
//! ```text
//! hotplug event → mount → validate → compile/program → report
//! ```
//!
//! [`monitor::DeviceEventMonitor`] is the top-level state machine; the
//! other modules are its collaborators.

pub mod config;
pub mod descriptor;
pub mod device;
pub mod error;
#[cfg(all(target_os = "linux", feature = "udev-events"))]
pub mod hotplug;
pub mod monitor;
pub mod mount;
pub mod pipeline;
pub mod report;
pub mod toolchain;

pub use config::{DaemonConfig, ToolchainConfig};
pub use descriptor::{InstrumentProfile, TaskDescriptor};
pub use device::{BlockDeviceEvent, DeviceAction};
pub use error::{
    AutoprovError, AutoprovResult, ConfigError, MountError, ToolError, ValidationError,
};
pub use monitor::{DeviceEventMonitor, MonitorState};
#[cfg(target_os = "linux")]
pub use mount::SysMounter;
pub use mount::{MountController, MountState};
pub use pipeline::{PipelineOutcome, ProvisioningPipeline, Stage};
pub use report::{StatusReporter, StatusSink};
pub use toolchain::{SubprocessToolchain, Toolchain};
