//! The daemon itself: event source → monitor, until interrupted.

use clap::{Args, ValueEnum};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EventSource {
    /// Kernel hotplug events via udev
    Udev,
    /// JSON-lines events on standard input, one event per line (bench use)
    Stdin,
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSource::Udev => write!(f, "udev"),
            EventSource::Stdin => write!(f, "stdin"),
        }
    }
}

impl EventSource {
    fn default_source() -> Self {
        if cfg!(all(target_os = "linux", feature = "udev-events")) {
            EventSource::Udev
        } else {
            EventSource::Stdin
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Where hotplug events come from
    #[arg(long, value_enum, default_value_t = EventSource::default_source())]
    pub events: EventSource,
}

#[cfg(target_os = "linux")]
pub async fn execute(args: RunArgs, global: &crate::GlobalFlags) -> anyhow::Result<()> {
    use autoprov::{DeviceEventMonitor, StatusReporter, SubprocessToolchain, SysMounter};
    use tokio::sync::mpsc;

    let config = global.load_config()?;
    let (sender, receiver) = mpsc::channel(64);

    match args.events {
        EventSource::Udev => {
            #[cfg(feature = "udev-events")]
            {
                autoprov::hotplug::spawn_udev_source(sender)?;
            }
            #[cfg(not(feature = "udev-events"))]
            anyhow::bail!(
                "this build has no udev support; rebuild with --features udev-events \
                 or use --events stdin"
            );
        }
        EventSource::Stdin => {
            tokio::spawn(stdin_source(sender));
        }
    }

    let reporter = StatusReporter::new(config.multicast_group, config.multicast_port);
    let toolchain = SubprocessToolchain::new(&config.toolchain);
    let monitor = DeviceEventMonitor::new(config, SysMounter, toolchain, reporter)?;

    tokio::select! {
        _ = monitor.run(receiver) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub async fn execute(_args: RunArgs, _global: &crate::GlobalFlags) -> anyhow::Result<()> {
    anyhow::bail!("the provisioning daemon only runs on Linux hosts")
}

/// Feed events from JSON lines on stdin. EOF closes the queue, which
/// stops the monitor.
#[cfg(target_os = "linux")]
async fn stdin_source(sender: tokio::sync::mpsc::Sender<autoprov::BlockDeviceEvent>) {
    use tokio::io::{AsyncBufReadExt, BufReader};

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<autoprov::BlockDeviceEvent>(line) {
                    Ok(event) => {
                        if sender.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "ignoring malformed event line"),
                }
            }
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                return;
            }
        }
    }
}
