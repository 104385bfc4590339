//! Driver for docker-compatible command line tools.
//!
//! Every operation is one invocation of the binary; nothing is cached
//! between calls.

use std::path::{Path, PathBuf};

use ctcheck_common::error::{CheckError, Result};
use ctcheck_common::types::{ContainerId, Signal};

use super::{ContainerCli, RunSpec};
use crate::command::{CommandOutput, run_command};

/// Shells out to `docker` (or a CLI with the same surface, e.g. `podman`).
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: PathBuf,
}

impl DockerCli {
    /// Uses `program` as is, without checking that it exists.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolves `runtime` on `PATH` (or as a path) before using it.
    ///
    /// # Errors
    ///
    /// Returns an error if no such executable can be found.
    pub fn locate(runtime: &Path) -> Result<Self> {
        let program = which::which(runtime).map_err(|_| CheckError::NotFound {
            kind: "container runtime",
            id: runtime.display().to_string(),
        })?;
        tracing::info!(program = %program.display(), "using container runtime");
        Ok(Self::new(program))
    }

    /// Returns the resolved binary.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn invoke(&self, args: &[String]) -> Result<CommandOutput> {
        run_command(&self.program, args).await
    }

    async fn checked(&self, args: Vec<String>) -> Result<String> {
        let output = self.invoke(&args).await?;
        Ok(output.into_checked(&self.program, &args)?.stdout)
    }

    async fn inspect(&self, id: &ContainerId, format: &str) -> Result<String> {
        let stdout = self
            .checked(vec![
                "inspect".into(),
                "--type".into(),
                "container".into(),
                "--format".into(),
                format.into(),
                id.to_string(),
            ])
            .await?;
        Ok(stdout.trim().to_string())
    }
}

impl ContainerCli for DockerCli {
    fn driver(&self) -> &'static str {
        "docker"
    }

    async fn run(&self, spec: &RunSpec) -> Result<ContainerId> {
        tracing::info!(id = %spec.name, image = %spec.image, "starting container");
        let _ = self.checked(spec.to_args()).await?;
        Ok(spec.name.clone())
    }

    async fn logs(&self, id: &ContainerId) -> Result<String> {
        let args = vec!["logs".into(), id.to_string()];
        let output = self.invoke(&args).await?.into_checked(&self.program, &args)?;
        Ok(format!("{}{}", output.stdout, output.stderr))
    }

    async fn kill(&self, id: &ContainerId, signal: Option<Signal>) -> Result<()> {
        tracing::info!(id = %id, signal = ?signal.map(Signal::name), "killing container");
        let _ = self.checked(kill_args(id, signal)).await?;
        Ok(())
    }

    async fn exit_code(&self, id: &ContainerId, wait_for_exit: bool) -> Result<i32> {
        let raw = if wait_for_exit {
            self.checked(vec!["wait".into(), id.to_string()]).await?
        } else {
            self.inspect(id, "{{.State.ExitCode}}").await?
        };
        parse_exit_code(&raw)
    }

    async fn is_running(&self, id: &ContainerId) -> Result<bool> {
        let raw = self.inspect(id, "{{.State.Running}}").await?;
        match raw.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(CheckError::Parse {
                what: "running state",
                input: raw,
            }),
        }
    }

    async fn remove(&self, id: &ContainerId) -> bool {
        match self.checked(vec!["rm".into(), "-f".into(), id.to_string()]).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "failed to remove container");
                false
            }
        }
    }

    async fn exists(&self, id: &ContainerId) -> bool {
        let args = vec![
            "ps".into(),
            "--all".into(),
            "--filter".into(),
            format!("name={id}"),
            "--format".into(),
            "{{.Names}}".into(),
        ];
        match self.checked(args).await {
            Ok(stdout) => lists_name(&stdout, id),
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "failed to list containers");
                false
            }
        }
    }

    async fn port(&self, id: &ContainerId, key: &str) -> Result<String> {
        self.checked(vec!["port".into(), id.to_string(), key.into()])
            .await
    }
}

fn kill_args(id: &ContainerId, signal: Option<Signal>) -> Vec<String> {
    let mut args = vec!["kill".to_string()];
    if let Some(sig) = signal {
        args.push("-s".into());
        args.push(sig.number().to_string());
    }
    args.push(id.to_string());
    args
}

/// Parses the exit code printed by `wait` or `inspect`.
fn parse_exit_code(raw: &str) -> Result<i32> {
    let trimmed = raw.trim();
    trimmed.parse().map_err(|_| CheckError::Parse {
        what: "exit code",
        input: trimmed.to_string(),
    })
}

/// `--filter name=` matches substrings; only an exact line counts.
fn lists_name(stdout: &str, id: &ContainerId) -> bool {
    stdout
        .lines()
        .map(|line| line.trim().trim_start_matches('/'))
        .any(|name| name == id.as_str())
}
