//! `ctcheck all`: Run the signal table, then the port case.

use clap::Args;
use ctcheck_verify::cases;

use super::Settings;
use crate::runner::{self, Plan};

/// Arguments for the `all` command.
#[derive(Args, Debug)]
pub struct AllArgs {
    /// Run every case this many times, each in a fresh container.
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,
}

/// Executes the `all` command.
///
/// # Errors
///
/// Returns an error if the runtime cannot be driven or a case failed.
pub fn execute(args: AllArgs, settings: &Settings) -> anyhow::Result<()> {
    let plan = Plan {
        cases: cases::default_cases(),
        port: Some(settings.config.port),
        repeat: args.repeat,
    };
    runner::run(settings, &plan)
}
