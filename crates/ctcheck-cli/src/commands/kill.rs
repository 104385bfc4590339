//! `ctcheck kill`: Deliver signals and check exit codes.

use clap::Args;
use ctcheck_common::types::Signal;
use ctcheck_verify::cases::{self, SignalCase};

use super::Settings;
use crate::runner::{self, Plan};

/// Arguments for the `kill` command.
#[derive(Args, Debug)]
pub struct KillArgs {
    /// Signal to check (name or number); repeatable. Runs the full table
    /// when omitted.
    #[arg(short, long = "signal", value_name = "SIG")]
    pub signals: Vec<Signal>,

    /// Run every case this many times, each in a fresh container.
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,
}

impl KillArgs {
    /// Cases selected by the arguments.
    #[must_use]
    pub fn cases(&self) -> Vec<SignalCase> {
        if self.signals.is_empty() {
            cases::default_cases()
        } else {
            self.signals.iter().copied().map(cases::case_for).collect()
        }
    }
}

/// Executes the `kill` command.
///
/// # Errors
///
/// Returns an error if the runtime cannot be driven or a case failed.
pub fn execute(args: KillArgs, settings: &Settings) -> anyhow::Result<()> {
    let plan = Plan {
        cases: args.cases(),
        port: None,
        repeat: args.repeat,
    };
    runner::run(settings, &plan)
}
