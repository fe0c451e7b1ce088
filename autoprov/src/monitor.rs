//! Hotplug state machine driving the whole mount cycle.
//!
//! A single consumer task receives block-device events serially from an
//! mpsc queue and handles them one at a time: mount, validate, pipeline,
//! report, unmount. Serialization is correctness here, not a throughput
//! limit: at most one piece of media is ever relevant.

use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::config::DaemonConfig;
use crate::descriptor::InstrumentProfile;
use crate::device::{BlockDeviceEvent, DeviceAction};
use crate::error::AutoprovResult;
use crate::mount::{MountController, MountState};
use crate::pipeline::ProvisioningPipeline;
use crate::report::StatusSink;
use crate::toolchain::Toolchain;

// ============================================================================
// Monitor State
// ============================================================================

/// Lifecycle state of the mount point.
///
/// State machine:
/// ```text
/// Idle ──add──▶ Mounting ──mount ok──▶ Mounted ──remove──▶ Unmounting ──▶ Idle
///                  │                                                       ▲
///                  └──────────────── mount failed ─────────────────────────┘
/// ```
/// No terminal state: the daemon cycles for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// No media mounted; waiting for an add event.
    Idle,
    /// Add event accepted; mount attempt in progress.
    Mounting,
    /// Media mounted; pipeline has run; waiting for removal.
    Mounted,
    /// Remove event received; cleanup in progress.
    Unmounting,
}

impl MonitorState {
    pub fn is_idle(&self) -> bool {
        matches!(self, MonitorState::Idle)
    }

    /// Whether an add event may start a mount cycle from this state.
    /// A second drive while one is active is never mounted.
    pub fn can_accept_add(&self) -> bool {
        matches!(self, MonitorState::Idle)
    }

    /// Whether a transition to `target` is valid.
    pub fn can_transition_to(&self, target: MonitorState) -> bool {
        use MonitorState::*;
        matches!(
            (self, target),
            (Idle, Mounting)
                | (Mounting, Mounted)
                | (Mounting, Idle)
                | (Mounted, Unmounting)
                | (Idle, Unmounting)
                | (Unmounting, Idle)
        )
    }
}

// ============================================================================
// Device Event Monitor
// ============================================================================

/// Consumes hotplug events and drives mount, pipeline, and reporting.
pub struct DeviceEventMonitor<M, T, R>
where
    M: MountController,
    T: Toolchain,
    R: StatusSink,
{
    config: DaemonConfig,
    profile: InstrumentProfile,
    mounter: M,
    pipeline: ProvisioningPipeline<T>,
    reporter: R,
    state: MonitorState,
    mount_state: MountState,
}

impl<M, T, R> DeviceEventMonitor<M, T, R>
where
    M: MountController,
    T: Toolchain,
    R: StatusSink,
{
    /// Build a monitor from configuration and its collaborators.
    ///
    /// Fails only if the configured instrument profile is invalid.
    pub fn new(
        config: DaemonConfig,
        mounter: M,
        toolchain: T,
        reporter: R,
    ) -> AutoprovResult<Self> {
        let profile = InstrumentProfile::new(config.required_instruments.clone())?;
        let mount_state = MountState::new(config.mount_point.clone());
        Ok(Self {
            config,
            profile,
            mounter,
            pipeline: ProvisioningPipeline::new(toolchain),
            reporter,
            state: MonitorState::Idle,
            mount_state,
        })
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn mount_state(&self) -> &MountState {
        &self.mount_state
    }

    /// Consume events until the queue's senders are dropped.
    pub async fn run(mut self, mut events: mpsc::Receiver<BlockDeviceEvent>) {
        info!(
            mount_point = %self.config.mount_point.display(),
            descriptor = %self.config.descriptor_name,
            instruments = self.profile.len(),
            "provisioning monitor started"
        );
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        info!("event source closed, monitor stopping");
    }

    /// Handle one event synchronously. Exposed for test injection.
    pub async fn handle_event(&mut self, event: BlockDeviceEvent) {
        match event.action {
            DeviceAction::Add => self.handle_add(event).await,
            DeviceAction::Remove => self.handle_remove(event).await,
        }
    }

    async fn handle_add(&mut self, event: BlockDeviceEvent) {
        // Only complete partition events for a supported filesystem are
        // actionable; everything else is ignored without a transition.
        let (Some(device), Some(fs_type)) = (event.device_path.clone(), event.fs_type.clone())
        else {
            trace!("ignoring add event with incomplete metadata");
            return;
        };
        if !event.is_partition() {
            trace!(%device, "ignoring add event for non-partition device");
            return;
        }
        if !self.config.accepts_filesystem(&fs_type) {
            debug!(%device, %fs_type, "ignoring media with unsupported filesystem");
            return;
        }
        if !self.state.can_accept_add() {
            debug!(%device, state = ?self.state, "media already active, ignoring add event");
            return;
        }

        self.state = MonitorState::Mounting;
        let status = self.mount_and_provision(&device, &fs_type, &event).await;
        debug!(%device, status, "mount cycle finished");
    }

    /// Mount the device and run the pipeline. Returns 0 on success, 1 on
    /// failure; the code is for local logging only, the daemon never
    /// exits on a failed cycle.
    async fn mount_and_provision(
        &mut self,
        device: &str,
        fs_type: &str,
        event: &BlockDeviceEvent,
    ) -> i32 {
        let mount_point = self.config.mount_point.clone();

        // Stale mount point from a prior ungraceful removal.
        if mount_point.exists() {
            self.mounter.cleanup_unmount(&mount_point);
        }
        if let Err(e) = std::fs::create_dir_all(&mount_point) {
            self.state = MonitorState::Idle;
            self.reporter
                .report(
                    &format!("Failed to create mount point {}: {}", mount_point.display(), e),
                    false,
                )
                .await;
            return 1;
        }

        // Settling period for bus enumeration.
        tokio::time::sleep(self.config.settle_delay()).await;

        if let Err(e) = self
            .mounter
            .mount(Path::new(device), &mount_point, fs_type, true)
        {
            self.state = MonitorState::Idle;
            self.reporter.report(&e.to_string(), false).await;
            return 1;
        }

        self.mount_state.mark_mounted(device);
        self.state = MonitorState::Mounted;
        self.reporter
            .report(
                &format!(
                    "Mounted {} at {} on {} {} MB",
                    event.label(),
                    device,
                    mount_point.display(),
                    event.size_mib()
                ),
                true,
            )
            .await;

        self.provision().await
    }

    async fn provision(&mut self) -> i32 {
        let task_file = self.config.descriptor_path();
        let outcome = self.pipeline.run(&task_file, &self.profile).await;
        self.reporter
            .report(&outcome.status_text(), outcome.is_success())
            .await;
        if outcome.is_success() { 0 } else { 1 }
    }

    async fn handle_remove(&mut self, event: BlockDeviceEvent) {
        if !event.is_partition() {
            trace!("ignoring remove event for non-partition device");
            return;
        }

        self.state = MonitorState::Unmounting;
        let clean = self.mounter.cleanup_unmount(&self.config.mount_point);
        self.mount_state.mark_unmounted();
        self.state = MonitorState::Idle;

        // Cleanliness is informational only; either way the daemon is
        // back to idle and ready for the next key.
        let text = if clean {
            format!("{} ejected cleanly", event.label())
        } else {
            format!("{} not ejected cleanly", event.label())
        };
        self.reporter.report(&text, true).await;
    }
}
