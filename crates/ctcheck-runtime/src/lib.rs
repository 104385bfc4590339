//! Drivers for the container CLI under test.
//!
//! Every driver implements [`backend::ContainerCli`], the narrow interface
//! the verifiers consume: run, logs, kill, exit code, remove, exists and
//! port introspection.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod command;
pub mod logs;
