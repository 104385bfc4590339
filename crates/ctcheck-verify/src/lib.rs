//! # ctcheck-verify
//!
//! Table-driven checks of a container runtime's observable behavior.
//!
//! - [`kill::KillVerifier`]: delivers a signal to a container, optionally
//!   after a trap is armed, and compares the exit code with the shell
//!   convention.
//! - [`port::PortVerifier`]: publishes a port and reads it back through
//!   port introspection.
//! - [`suite::Suite`]: runs cases one after another and collects a
//!   [`report::SuiteReport`].
//!
//! Every check creates its own container and removes it afterwards,
//! whatever the outcome.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ctcheck_runtime::backend::docker::DockerCli;
//! use ctcheck_verify::cases::{SignalCase, SkipList};
//! use ctcheck_verify::kill::KillVerifier;
//! use ctcheck_verify::readiness::PollPolicy;
//!
//! # async fn demo() -> ctcheck_common::error::Result<()> {
//! let cli = Arc::new(DockerCli::new("docker"));
//! let verifier = KillVerifier::new(cli, "busybox", PollPolicy::default(), SkipList::unforwarded());
//! let report = verifier.verify(&SignalCase::without_signal()).await;
//! assert!(report.verdict.is_passed());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cases;
pub mod cleanup;
pub mod kill;
pub mod port;
pub mod readiness;
pub mod report;
pub mod suite;
