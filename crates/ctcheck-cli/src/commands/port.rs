//! `ctcheck port`: Publish a port and check it is reported.

use clap::Args;
use ctcheck_common::types::PortMapping;

use super::Settings;
use crate::runner::{self, Plan};

/// Arguments for the `port` command.
#[derive(Args, Debug)]
pub struct PortArgs {
    /// Host side of the mapping (defaults to the configured one).
    #[arg(long)]
    pub host_port: Option<u16>,

    /// Container side of the mapping (defaults to the configured one).
    #[arg(long)]
    pub container_port: Option<u16>,

    /// Run the case this many times, each in a fresh container.
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,
}

impl PortArgs {
    /// The configured mapping with the flags applied.
    #[must_use]
    pub fn mapping(&self, configured: PortMapping) -> PortMapping {
        PortMapping {
            host_port: self.host_port.unwrap_or(configured.host_port),
            container_port: self.container_port.unwrap_or(configured.container_port),
            protocol: configured.protocol,
        }
    }
}

/// Executes the `port` command.
///
/// # Errors
///
/// Returns an error if the runtime cannot be driven or the case failed.
pub fn execute(args: PortArgs, settings: &Settings) -> anyhow::Result<()> {
    let plan = Plan {
        cases: Vec::new(),
        port: Some(args.mapping(settings.config.port)),
        repeat: args.repeat,
    };
    runner::run(settings, &plan)
}
