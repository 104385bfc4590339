//! Container CLI abstraction the verifiers run against.

pub mod docker;
pub mod fake;
#[cfg(unix)]
pub mod process;

use std::future::Future;

use ctcheck_common::error::Result;
use ctcheck_common::types::{ContainerId, PortMapping, Signal};

/// What to start: the equivalent of one `run` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    /// Name given to the container (`--name`).
    pub name: ContainerId,
    /// Image to run.
    pub image: String,
    /// Command and arguments. Empty means the image default.
    pub command: Vec<String>,
    /// Ports to publish (`-p`).
    pub publish: Vec<PortMapping>,
    /// Start detached (`-d`).
    pub detach: bool,
    /// Allocate a pseudo-TTY (`-t`).
    pub tty: bool,
}

impl RunSpec {
    /// A detached, TTY-attached container running the image default.
    #[must_use]
    pub fn new(name: ContainerId, image: impl Into<String>) -> Self {
        Self {
            name,
            image: image.into(),
            command: Vec::new(),
            publish: Vec::new(),
            detach: true,
            tty: true,
        }
    }

    /// Sets the command to run inside the container.
    #[must_use]
    pub fn command(mut self, cmd: Vec<String>) -> Self {
        self.command = cmd;
        self
    }

    /// Runs `script` through `sh -c`.
    #[must_use]
    pub fn shell(self, script: impl Into<String>) -> Self {
        self.command(vec!["sh".into(), "-c".into(), script.into()])
    }

    /// Adds a published port.
    #[must_use]
    pub fn publish(mut self, mapping: PortMapping) -> Self {
        self.publish.push(mapping);
        self
    }

    /// Renders the `run` argument list of a docker-compatible CLI.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string()];
        match (self.detach, self.tty) {
            (true, true) => args.push("-dt".into()),
            (true, false) => args.push("-d".into()),
            (false, true) => args.push("-t".into()),
            (false, false) => {}
        }
        for mapping in &self.publish {
            args.push("-p".into());
            args.push(mapping.publish_arg());
        }
        args.push("--name".into());
        args.push(self.name.to_string());
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

/// The operations a check needs from a container CLI.
///
/// Implementors translate each call into whatever the driven runtime
/// understands. Lifecycle queries (`remove`, `exists`) answer with a plain
/// boolean and log their own failures.
pub trait ContainerCli: Send + Sync + 'static {
    /// Short driver name used in logs and errors.
    fn driver(&self) -> &'static str;

    /// Starts a container and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the container could not be started.
    fn run(&self, spec: &RunSpec) -> impl Future<Output = Result<ContainerId>> + Send;

    /// Returns the output accumulated so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the logs cannot be retrieved, which includes the
    /// window right after `run` where the container is not known yet.
    fn logs(&self, id: &ContainerId) -> impl Future<Output = Result<String>> + Send;

    /// Delivers `signal`, or the runtime's default kill signal if `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal could not be delivered.
    fn kill(
        &self,
        id: &ContainerId,
        signal: Option<Signal>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Returns the exit code, blocking until exit when `wait_for_exit`.
    ///
    /// A container that has not exited reports `0`.
    ///
    /// # Errors
    ///
    /// Returns an error if the code cannot be retrieved or parsed.
    fn exit_code(
        &self,
        id: &ContainerId,
        wait_for_exit: bool,
    ) -> impl Future<Output = Result<i32>> + Send;

    /// Returns whether the container's process is still alive. A stopped
    /// (suspended) process counts as alive.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be retrieved.
    fn is_running(&self, id: &ContainerId) -> impl Future<Output = Result<bool>> + Send;

    /// Force-removes the container. Returns whether removal succeeded.
    fn remove(&self, id: &ContainerId) -> impl Future<Output = bool> + Send;

    /// Returns whether a container with this name exists.
    fn exists(&self, id: &ContainerId) -> impl Future<Output = bool> + Send;

    /// Returns the port introspection output for `key` (e.g. `8080/tcp`).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the driver cannot publish ports.
    fn port(&self, id: &ContainerId, key: &str) -> impl Future<Output = Result<String>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_case_arguments_match_cli_conventions() {
        let spec = RunSpec::new(ContainerId::new("c1"), "busybox").shell("while :; do sleep 1; done");
        assert_eq!(
            spec.to_args(),
            vec![
                "run",
                "-dt",
                "--name",
                "c1",
                "busybox",
                "sh",
                "-c",
                "while :; do sleep 1; done"
            ]
        );
    }

    #[test]
    fn port_case_arguments_include_publish_flag() {
        let spec = RunSpec::new(ContainerId::new("c2"), "busybox").publish(PortMapping::tcp(8080, 8080));
        assert_eq!(
            spec.to_args(),
            vec!["run", "-dt", "-p", "8080:8080", "--name", "c2", "busybox"]
        );
    }

    #[test]
    fn attached_run_has_no_detach_flag() {
        let mut spec = RunSpec::new(ContainerId::new("c3"), "busybox");
        spec.detach = false;
        spec.tty = false;
        assert_eq!(spec.to_args(), vec!["run", "--name", "c3", "busybox"]);
    }
}
