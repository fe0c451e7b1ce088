//! Offline descriptor validation, for checking a key on the bench
//! before walking it out to the aircraft.

use std::path::PathBuf;

use clap::Args;

use autoprov::{InstrumentProfile, descriptor};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Task descriptor file to check
    pub file: PathBuf,
}

pub async fn execute(args: ValidateArgs, global: &crate::GlobalFlags) -> anyhow::Result<()> {
    let config = global.load_config()?;
    let profile = InstrumentProfile::new(config.required_instruments.clone())?;

    let descriptor = descriptor::validate(&args.file, &profile)?;

    println!("{}: OK", args.file.display());
    let mut discovered: Vec<_> = descriptor.discovered_instruments.iter().collect();
    discovered.sort();
    for (part, count) in discovered {
        println!("  {count}x {part}");
    }
    Ok(())
}
