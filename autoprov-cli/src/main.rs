//! autoprov command-line interface.

mod commands;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Unattended USB-key provisioning for embedded test-equipment boards",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    global: GlobalFlags,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalFlags {
    /// Path to the daemon configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "AUTOPROV_CONFIG",
        default_value = "/etc/autoprov.json"
    )]
    config: PathBuf,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

impl GlobalFlags {
    pub fn load_config(&self) -> anyhow::Result<autoprov::DaemonConfig> {
        autoprov::DaemonConfig::load(&self.config)
            .with_context(|| format!("loading configuration from {}", self.config.display()))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the provisioning daemon
    Run(commands::run::RunArgs),
    /// Validate a task descriptor against the configured profile
    Validate(commands::validate::ValidateArgs),
    /// Send a one-off status message on the operator channel
    Report(commands::report::ReportArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // The appender guard must outlive all logging.
    let _log_guard = init_tracing(cli.global.log_file.as_deref());

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, &cli.global).await,
        Commands::Validate(args) => commands::validate::execute(args, &cli.global).await,
        Commands::Report(args) => commands::report::execute(args, &cli.global).await,
    }
}

/// Initialize the tracing subscriber. Respects RUST_LOG, defaults to
/// "info", and writes to a non-blocking file appender when a log file is
/// configured.
fn init_tracing(log_file: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let dir = match path.parent() {
                Some(parent) if parent != Path::new("") => parent,
                _ => Path::new("."),
            };
            let file_name = path.file_name().unwrap_or_else(|| "autoprov.log".as_ref());
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_target(true)
                        .with_ansi(false),
                )
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_env_filter(filter)
                .try_init();
            None
        }
    }
}
