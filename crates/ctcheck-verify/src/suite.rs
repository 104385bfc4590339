//! Sequential execution of many cases.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ctcheck_runtime::backend::ContainerCli;

use crate::cases::SignalCase;
use crate::kill::KillVerifier;
use crate::port::PortVerifier;
use crate::report::SuiteReport;

/// Runs cases one at a time, each `repeat` times.
///
/// Cases share nothing but the runtime, and a runtime is not assumed to
/// cope with concurrent cases, so nothing runs in parallel. Raising the
/// interrupt flag stops the run before the next attempt; the attempt in
/// flight finishes, cleanup included.
#[derive(Debug, Clone)]
pub struct Suite {
    repeat: u32,
    interrupted: Arc<AtomicBool>,
}

impl Default for Suite {
    fn default() -> Self {
        Self::new()
    }
}

impl Suite {
    /// A suite running every case once.
    #[must_use]
    pub fn new() -> Self {
        Self {
            repeat: 1,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs every case `repeat` times (at least once), each in its own
    /// container.
    #[must_use]
    pub fn repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat.max(1);
        self
    }

    /// Flag that stops the run once set.
    #[must_use]
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    fn should_stop(&self, report: &mut SuiteReport) -> bool {
        if self.interrupted.load(Ordering::SeqCst) {
            tracing::warn!("run interrupted");
            report.interrupted = true;
        }
        report.interrupted
    }

    /// Runs signal cases, appending to `report`.
    pub async fn run_kill<C: ContainerCli>(
        &self,
        verifier: &KillVerifier<C>,
        cases: &[SignalCase],
        report: &mut SuiteReport,
    ) {
        tracing::info!(cases = cases.len(), repeat = self.repeat, "running signal cases");
        for case in cases {
            for attempt in 1..=self.repeat {
                if self.should_stop(report) {
                    return;
                }
                report.push(verifier.verify_attempt(case, attempt).await);
            }
        }
    }

    /// Runs the port case, appending to `report`.
    pub async fn run_port<C: ContainerCli>(
        &self,
        verifier: &PortVerifier<C>,
        report: &mut SuiteReport,
    ) {
        for attempt in 1..=self.repeat {
            if self.should_stop(report) {
                return;
            }
            report.push(verifier.verify_attempt(attempt).await);
        }
    }
}
