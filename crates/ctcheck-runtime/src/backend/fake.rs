//! In-memory container CLI for tests.
//!
//! Simulates the part of a runtime the checks observe: a shell script that
//! may install a `trap "exit N" N` handler and print a readiness marker,
//! signal delivery with default dispositions, exit codes, and published
//! ports. Knobs inject the failure modes the verifiers must survive.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ctcheck_common::constants::{NOT_EXITED_EXIT_CODE, SIGNAL_EXIT_BASE};
use ctcheck_common::error::{CheckError, Result};
use ctcheck_common::types::{ContainerId, PortMapping, Signal};

use super::{ContainerCli, RunSpec};

const DRIVER: &str = "fake";

/// Signals whose default action is to do nothing.
const IGNORED_BY_DEFAULT: [Signal; 4] = [Signal::CHLD, Signal::CONT, Signal::URG, Signal::WINCH];

#[derive(Debug)]
struct FakeContainer {
    command: Vec<String>,
    publish: Vec<PortMapping>,
    trap: Option<i32>,
    exit: Option<i32>,
    stopped: bool,
    log_polls: usize,
}

impl FakeContainer {
    fn script(&self) -> String {
        self.command.join(" ")
    }

    fn prints(&self, marker: &str) -> bool {
        self.script().contains(&format!("echo {marker}"))
    }

    fn deliver(&mut self, sig: Signal) {
        if self.exit.is_some() {
            return;
        }
        if sig == Signal::STOP {
            self.stopped = true;
        } else if sig == Signal::KILL {
            self.exit = Some(SIGNAL_EXIT_BASE + sig.number());
        } else if self.trap == Some(sig.number()) {
            self.exit = Some(sig.number());
        } else if !IGNORED_BY_DEFAULT.contains(&sig) {
            self.exit = Some(SIGNAL_EXIT_BASE + sig.number());
        }
    }
}

/// Parses `trap "exit N" N` out of a script.
fn parse_trap(script: &str) -> Option<i32> {
    let rest = script.split("trap \"exit ").nth(1)?;
    let (code, _) = rest.split_once('"')?;
    code.trim().parse().ok()
}

#[derive(Debug, Default)]
struct FakeState {
    containers: HashMap<ContainerId, FakeContainer>,
    calls: Vec<String>,
}

/// Scriptable stand-in for a container runtime.
#[derive(Debug)]
pub struct FakeCli {
    state: Mutex<FakeState>,
    marker: String,
    ready_after: usize,
    failing_log_polls: usize,
    never_ready: bool,
    dropped: HashSet<Signal>,
    sticky: bool,
    run_error: Option<String>,
}

impl FakeCli {
    /// A well-behaved runtime that prints `marker` as soon as asked.
    #[must_use]
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            marker: marker.into(),
            ready_after: 0,
            failing_log_polls: 0,
            never_ready: false,
            dropped: HashSet::new(),
            sticky: false,
            run_error: None,
        }
    }

    /// The marker shows up only from the `polls`-th log query on.
    #[must_use]
    pub const fn ready_after(mut self, polls: usize) -> Self {
        self.ready_after = polls;
        self
    }

    /// The first `polls` log queries fail.
    #[must_use]
    pub const fn failing_log_polls(mut self, polls: usize) -> Self {
        self.failing_log_polls = polls;
        self
    }

    /// The marker never shows up.
    #[must_use]
    pub const fn never_ready(mut self) -> Self {
        self.never_ready = true;
        self
    }

    /// `kill` succeeds for `signal` but nothing reaches the process.
    #[must_use]
    pub fn dropping(mut self, signal: Signal) -> Self {
        let _ = self.dropped.insert(signal);
        self
    }

    /// `remove` reports success but the container stays listed.
    #[must_use]
    pub const fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }

    /// Every `run` fails with `message`.
    #[must_use]
    pub fn failing_run(mut self, message: impl Into<String>) -> Self {
        self.run_error = Some(message.into());
        self
    }

    /// Every call made so far, formatted like a CLI invocation.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Names of the containers that currently exist.
    pub fn live_containers(&self) -> Vec<ContainerId> {
        self.lock().containers.keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_container<T>(
        &self,
        call: String,
        id: &ContainerId,
        f: impl FnOnce(&mut FakeContainer) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.lock();
        state.calls.push(call);
        let container = state
            .containers
            .get_mut(id)
            .ok_or_else(|| CheckError::NotFound {
                kind: "container",
                id: id.to_string(),
            })?;
        f(container)
    }
}

impl ContainerCli for FakeCli {
    fn driver(&self) -> &'static str {
        DRIVER
    }

    async fn run(&self, spec: &RunSpec) -> Result<ContainerId> {
        let mut state = self.lock();
        state.calls.push(spec.to_args().join(" "));
        if let Some(message) = &self.run_error {
            return Err(CheckError::CommandFailed {
                program: DRIVER.into(),
                args: spec.to_args().join(" "),
                code: Some(125),
                stderr: message.clone(),
            });
        }
        if state.containers.contains_key(&spec.name) {
            return Err(CheckError::Config {
                message: format!("container {} already exists", spec.name),
            });
        }
        let script = spec.command.join(" ");
        let _ = state.containers.insert(
            spec.name.clone(),
            FakeContainer {
                command: spec.command.clone(),
                publish: spec.publish.clone(),
                trap: parse_trap(&script),
                exit: None,
                stopped: false,
                log_polls: 0,
            },
        );
        Ok(spec.name.clone())
    }

    async fn logs(&self, id: &ContainerId) -> Result<String> {
        let marker = self.marker.clone();
        self.with_container(format!("logs {id}"), id, |c| {
            c.log_polls += 1;
            if c.log_polls <= self.failing_log_polls {
                return Err(CheckError::CommandFailed {
                    program: DRIVER.into(),
                    args: format!("logs {id}"),
                    code: Some(1),
                    stderr: "container is not running yet".into(),
                });
            }
            let ready = !self.never_ready && c.log_polls > self.ready_after && c.prints(&marker);
            Ok(if ready { format!("{marker}\r\n") } else { String::new() })
        })
    }

    async fn kill(&self, id: &ContainerId, signal: Option<Signal>) -> Result<()> {
        let call = match signal {
            Some(sig) => format!("kill -s {} {id}", sig.number()),
            None => format!("kill {id}"),
        };
        self.with_container(call, id, |c| {
            if c.exit.is_some() {
                return Err(CheckError::CommandFailed {
                    program: DRIVER.into(),
                    args: format!("kill {id}"),
                    code: Some(1),
                    stderr: format!("container {id} is not running"),
                });
            }
            let sig = signal.unwrap_or(Signal::KILL);
            if !self.dropped.contains(&sig) {
                c.deliver(sig);
            }
            Ok(())
        })
    }

    async fn exit_code(&self, id: &ContainerId, wait_for_exit: bool) -> Result<i32> {
        let call = if wait_for_exit {
            format!("wait {id}")
        } else {
            format!("inspect {id}")
        };
        let exit = self.with_container(call, id, |c| Ok(c.exit))?;
        match exit {
            Some(code) => Ok(code),
            // Like `docker wait`, nothing comes back until the process exits.
            None if wait_for_exit => std::future::pending().await,
            None => Ok(NOT_EXITED_EXIT_CODE),
        }
    }

    async fn is_running(&self, id: &ContainerId) -> Result<bool> {
        self.with_container(format!("inspect {id}"), id, |c| Ok(c.exit.is_none()))
    }

    async fn remove(&self, id: &ContainerId) -> bool {
        let mut state = self.lock();
        state.calls.push(format!("rm -f {id}"));
        if self.sticky {
            return state.containers.contains_key(id);
        }
        state.containers.remove(id).is_some()
    }

    async fn exists(&self, id: &ContainerId) -> bool {
        let mut state = self.lock();
        state.calls.push(format!("ps -a {id}"));
        state.containers.contains_key(id)
    }

    async fn port(&self, id: &ContainerId, key: &str) -> Result<String> {
        self.with_container(format!("port {id} {key}"), id, |c| {
            c.publish
                .iter()
                .find(|m| m.container_key() == key)
                .map(|m| format!("0.0.0.0:{}\n[::]:{}\n", m.host_port, m.host_port))
                .ok_or_else(|| CheckError::CommandFailed {
                    program: DRIVER.into(),
                    args: format!("port {id} {key}"),
                    code: Some(1),
                    stderr: format!("no public port '{key}' published for {id}"),
                })
        })
    }
}
