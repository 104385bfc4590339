//! CLI command definitions and dispatch.

pub mod all;
pub mod kill;
pub mod port;
pub mod signals;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use ctcheck_common::config::CheckConfig;
use ctcheck_common::constants::{APP_NAME, ENV_IMAGE, ENV_RUNTIME, ENV_TIMEOUT};
use ctcheck_common::types::Signal;
use ctcheck_verify::cases::SkipList;

/// ctcheck: signal and port conformance checks for container runtimes.
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Container CLI binary to check (name on PATH or a path).
    #[arg(long, global = true, env = ENV_RUNTIME)]
    pub runtime: Option<PathBuf>,

    /// Image every case runs.
    #[arg(long, global = true, env = ENV_IMAGE)]
    pub image: Option<String>,

    /// Seconds to wait for a container to arm its trap.
    #[arg(long, global = true, env = ENV_TIMEOUT)]
    pub timeout: Option<u64>,

    /// How containers are created.
    #[arg(long, global = true, value_enum, default_value_t = Backend::Docker)]
    pub backend: Backend,

    /// JSON configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Skip a signal (name or number); repeatable.
    #[arg(long = "skip", global = true, value_name = "SIG")]
    pub skips: Vec<Signal>,

    /// Run the signals the reference runtime does not forward, too.
    #[arg(long, global = true)]
    pub no_default_skips: bool,

    /// Print the report as JSON on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Where containers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// A docker-compatible CLI.
    Docker,
    /// Host child processes; no image, no port publishing.
    Process,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the signal table with expected exit codes.
    Signals,
    /// Deliver signals and check exit codes.
    Kill(kill::KillArgs),
    /// Publish a port and check it is reported.
    Port(port::PortArgs),
    /// Run the signal and port checks.
    All(all::AllArgs),
}

/// Resolved settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Layered configuration.
    pub config: CheckConfig,
    /// Selected backend.
    pub backend: Backend,
    /// Whether to print JSON.
    pub json: bool,
}

impl Settings {
    /// Layers defaults, the config file, the environment and the flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or a value is
    /// invalid.
    pub fn resolve(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let config = match &cli.config {
            Some(path) => CheckConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => CheckConfig::default(),
        };
        let mut config = config.apply_env_from(env)?;

        if let Some(runtime) = &cli.runtime {
            config.runtime.clone_from(runtime);
        }
        if let Some(image) = &cli.image {
            config.image.clone_from(image);
        }
        if let Some(timeout) = cli.timeout {
            config.timeout_secs = timeout;
        }
        if cli.no_default_skips {
            config.default_skips = false;
        }
        config
            .extra_skips
            .extend(cli.skips.iter().map(|sig| sig.name().to_string()));
        config.validate()?;

        tracing::debug!(?config, backend = ?cli.backend, "resolved settings");
        Ok(Self {
            config,
            backend: cli.backend,
            json: cli.json,
        })
    }

    /// The skip list the configuration asks for.
    ///
    /// # Errors
    ///
    /// Returns an error if an extra skip names no signal.
    pub fn skip_list(&self) -> anyhow::Result<SkipList> {
        let mut skips = if self.config.default_skips {
            SkipList::unforwarded()
        } else {
            SkipList::none()
        };
        for sig in self.config.parsed_extra_skips()? {
            skips.add(sig, "skipped on request");
        }
        Ok(skips)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the settings are invalid, the runtime cannot be
/// driven, or a case failed.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::resolve(&cli, |key| std::env::var(key).ok())?;
    match cli.command {
        Command::Signals => signals::execute(&settings),
        Command::Kill(args) => kill::execute(args, &settings),
        Command::Port(args) => port::execute(args, &settings),
        Command::All(args) => all::execute(args, &settings),
    }
}
