//! udev-backed hotplug event source.
//!
//! Subscribes to the kernel's block subsystem and feeds converted events
//! into the monitor's queue. The udev monitor socket is polled on a
//! dedicated blocking thread; the queue is the only coupling to the
//! async side.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::device::{BlockDeviceEvent, DeviceAction};
use crate::error::AutoprovResult;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Start the udev listener thread for block-device add/remove events.
///
/// The thread exits when the receiving side of `sender` is dropped.
/// Fails only if the udev monitor socket cannot be created, which is an
/// unrecoverable startup failure.
pub fn spawn_udev_source(
    sender: mpsc::Sender<BlockDeviceEvent>,
) -> AutoprovResult<std::thread::JoinHandle<()>> {
    let socket = udev::MonitorBuilder::new()?
        .match_subsystem("block")?
        .listen()?;
    info!("listening for block-device hotplug events");

    let handle = std::thread::Builder::new()
        .name("udev-monitor".into())
        .spawn(move || poll_loop(socket, sender))?;
    Ok(handle)
}

fn poll_loop(socket: udev::MonitorSocket, sender: mpsc::Sender<BlockDeviceEvent>) {
    loop {
        let mut saw_event = false;
        for event in socket.iter() {
            saw_event = true;
            let Some(converted) = convert(&event) else {
                continue;
            };
            debug!(?converted, "hotplug event");
            if sender.blocking_send(converted).is_err() {
                // Monitor is gone; nothing left to feed.
                return;
            }
        }
        if !saw_event {
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Map a udev event onto the daemon's event type. Actions other than
/// add/remove (change, bind, ...) are dropped here.
fn convert(event: &udev::Event) -> Option<BlockDeviceEvent> {
    let action = match event.event_type() {
        udev::EventType::Add => DeviceAction::Add,
        udev::EventType::Remove => DeviceAction::Remove,
        _ => return None,
    };

    let property = |name: &str| {
        event
            .property_value(name)
            .map(|v| v.to_string_lossy().into_owned())
    };

    Some(BlockDeviceEvent {
        action,
        device_path: event
            .devnode()
            .map(|p| p.to_string_lossy().into_owned()),
        fs_type: property("ID_FS_TYPE"),
        device_kind: event
            .devtype()
            .map(|t| t.to_string_lossy().into_owned()),
        volume_label: property("ID_FS_LABEL"),
        size_bytes: property("UDISKS_PARTITION_SIZE").and_then(|v| v.parse().ok()),
    })
}
