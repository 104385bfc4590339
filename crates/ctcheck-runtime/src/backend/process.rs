//! Driver that runs each "container" as a host child process.
//!
//! The image is ignored: the command runs directly on the host, its output
//! goes to a per-container log file, and signals are delivered with
//! `kill(2)`. Exit statuses follow the shell convention, so a process killed
//! by signal `S` reports `128 + S`. Useful to check the harness itself, or a
//! shell, without a container runtime.

use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::str::FromStr;
use std::sync::Arc;

use ctcheck_common::constants::{NOT_EXITED_EXIT_CODE, SIGNAL_EXIT_BASE};
use ctcheck_common::error::{CheckError, Result};
use ctcheck_common::types::{ContainerId, Signal};
use nix::sys::signal;
use nix::unistd::Pid;
use tokio::process::Child;
use tokio::sync::Mutex;

use super::{ContainerCli, RunSpec};
use crate::logs;

const DRIVER: &str = "process";

struct HostProcess {
    child: Child,
    status: Option<ExitStatus>,
}

impl HostProcess {
    fn poll(&mut self) -> Result<Option<ExitStatus>> {
        if self.status.is_none() {
            self.status = self.child.try_wait().map_err(|e| CheckError::Io {
                path: PathBuf::from("waitpid"),
                source: e,
            })?;
        }
        Ok(self.status)
    }
}

type SharedProcess = Arc<Mutex<HostProcess>>;

/// Runs container commands as local processes.
///
/// The table lock is only held to look a process up; waiting on a child
/// holds that child's own lock, so other containers stay reachable.
pub struct ProcessCli {
    data_dir: PathBuf,
    children: Mutex<HashMap<ContainerId, SharedProcess>>,
}

impl ProcessCli {
    /// Creates a driver that keeps its log files under `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            children: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the directory holding the log files.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn not_found(id: &ContainerId) -> CheckError {
        CheckError::NotFound {
            kind: "container",
            id: id.to_string(),
        }
    }

    async fn process(&self, id: &ContainerId) -> Result<SharedProcess> {
        self.children
            .lock()
            .await
            .get(id)
            .map(Arc::clone)
            .ok_or_else(|| Self::not_found(id))
    }
}

/// Maps a wait status to what a shell (and a container runtime) reports.
fn shell_exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| SIGNAL_EXIT_BASE + status.signal().unwrap_or_default())
}

/// Translates a container signal into the host's numbering by name.
fn host_signal(sig: Signal) -> Result<signal::Signal> {
    signal::Signal::from_str(sig.name()).map_err(|_| CheckError::Unsupported {
        operation: sig.name(),
        driver: DRIVER,
    })
}

impl ContainerCli for ProcessCli {
    fn driver(&self) -> &'static str {
        DRIVER
    }

    async fn run(&self, spec: &RunSpec) -> Result<ContainerId> {
        if !spec.publish.is_empty() {
            return Err(CheckError::Unsupported {
                operation: "port publishing",
                driver: DRIVER,
            });
        }
        let Some((program, args)) = spec.command.split_first() else {
            return Err(CheckError::Config {
                message: "the process driver needs an explicit command".into(),
            });
        };

        let mut children = self.children.lock().await;
        if children.contains_key(&spec.name) {
            return Err(CheckError::Config {
                message: format!("container {} already exists", spec.name),
            });
        }

        let log = logs::create_log(&self.data_dir, spec.name.as_str())?;
        let log_path = logs::log_path(&self.data_dir, spec.name.as_str());
        let stderr = log.try_clone().map_err(|e| CheckError::Io {
            path: log_path.clone(),
            source: e,
        })?;

        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(log)
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CheckError::Io {
                path: PathBuf::from(program),
                source: e,
            })?;

        tracing::info!(id = %spec.name, pid = ?child.id(), log = %log_path.display(), "spawned host process");
        let process = HostProcess { child, status: None };
        let _ = children.insert(spec.name.clone(), Arc::new(Mutex::new(process)));
        Ok(spec.name.clone())
    }

    async fn logs(&self, id: &ContainerId) -> Result<String> {
        if !self.children.lock().await.contains_key(id) {
            return Err(Self::not_found(id));
        }
        logs::read_logs(&self.data_dir, id.as_str())
    }

    async fn kill(&self, id: &ContainerId, sig: Option<Signal>) -> Result<()> {
        let sig = sig.unwrap_or(Signal::KILL);
        let host = host_signal(sig)?;

        let shared = self.process(id).await?;
        let mut process = shared.lock().await;
        let not_running = || CheckError::NotRunning { id: id.to_string() };
        if process.poll()?.is_some() {
            return Err(not_running());
        }
        let pid = process.child.id().ok_or_else(not_running)?;

        #[allow(clippy::cast_possible_wrap)]
        signal::kill(Pid::from_raw(pid as i32), host).map_err(|errno| CheckError::Io {
            path: PathBuf::from("kill"),
            source: std::io::Error::from(errno),
        })?;
        tracing::info!(id = %id, pid, signal = %sig, "delivered signal");
        Ok(())
    }

    async fn exit_code(&self, id: &ContainerId, wait_for_exit: bool) -> Result<i32> {
        let shared = self.process(id).await?;
        let mut process = shared.lock().await;

        let status = match process.poll()? {
            Some(status) => Some(status),
            None if wait_for_exit => {
                let status = process.child.wait().await.map_err(|e| CheckError::Io {
                    path: PathBuf::from("waitpid"),
                    source: e,
                })?;
                process.status = Some(status);
                Some(status)
            }
            None => None,
        };
        Ok(status.map_or(NOT_EXITED_EXIT_CODE, shell_exit_code))
    }

    async fn is_running(&self, id: &ContainerId) -> Result<bool> {
        let shared = self.process(id).await?;
        let mut process = shared.lock().await;
        Ok(process.poll()?.is_none())
    }

    async fn remove(&self, id: &ContainerId) -> bool {
        let Some(shared) = self.children.lock().await.remove(id) else {
            tracing::warn!(id = %id, "no such container to remove");
            return false;
        };
        let mut process = shared.lock().await;

        if matches!(process.poll(), Ok(None)) {
            if let Err(e) = process.child.start_kill() {
                tracing::warn!(id = %id, error = %e, "failed to kill host process");
            }
            if let Err(e) = process.child.wait().await {
                tracing::warn!(id = %id, error = %e, "failed to reap host process");
            }
        }

        if let Err(e) = logs::remove_log(&self.data_dir, id.as_str()) {
            tracing::warn!(id = %id, error = %e, "failed to remove log file");
        }
        tracing::debug!(id = %id, "removed host process");
        true
    }

    async fn exists(&self, id: &ContainerId) -> bool {
        self.children.lock().await.contains_key(id)
    }

    async fn port(&self, _id: &ContainerId, _key: &str) -> Result<String> {
        Err(CheckError::Unsupported {
            operation: "port introspection",
            driver: DRIVER,
        })
    }
}
