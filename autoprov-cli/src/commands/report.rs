//! One-off status datagram, for checking the operator channel.

use clap::Args;

use autoprov::{StatusReporter, StatusSink};

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Status text to send
    pub message: String,

    /// Mark the message as a failure
    #[arg(long)]
    pub failure: bool,
}

pub async fn execute(args: ReportArgs, global: &crate::GlobalFlags) -> anyhow::Result<()> {
    let config = global.load_config()?;
    let reporter = StatusReporter::new(config.multicast_group, config.multicast_port);
    reporter.report(&args.message, !args.failure).await;
    Ok(())
}
