//! Signal delivery and exit-code verification.

use std::sync::Arc;
use std::time::Instant;

use ctcheck_common::constants::TRAP_MARKER;
use ctcheck_common::error::{CheckError, Result};
use ctcheck_common::types::ContainerId;
use ctcheck_runtime::backend::{ContainerCli, RunSpec};
use tracing::Instrument;

use crate::cases::{SignalCase, SkipList};
use crate::cleanup;
use crate::readiness::{self, PollPolicy};
use crate::report::{CaseReport, Verdict};

/// Runs [`SignalCase`]s against a container CLI.
pub struct KillVerifier<C> {
    cli: Arc<C>,
    image: String,
    policy: PollPolicy,
    skips: SkipList,
}

impl<C: ContainerCli> KillVerifier<C> {
    /// Creates a verifier running `image` through `cli`.
    #[must_use]
    pub fn new(cli: Arc<C>, image: impl Into<String>, policy: PollPolicy, skips: SkipList) -> Self {
        Self {
            cli,
            image: image.into(),
            policy,
            skips,
        }
    }

    /// Returns the skip list in use.
    #[must_use]
    pub const fn skips(&self) -> &SkipList {
        &self.skips
    }

    /// Runs one case in a fresh container.
    pub async fn verify(&self, case: &SignalCase) -> CaseReport {
        self.verify_attempt(case, 1).await
    }

    /// Runs one case in a fresh container, labelled as attempt `attempt`.
    ///
    /// The container is removed afterwards whatever happened, and a
    /// container that survives removal fails the case.
    pub async fn verify_attempt(&self, case: &SignalCase, attempt: u32) -> CaseReport {
        let started_at = chrono::Utc::now();
        let clock = Instant::now();

        if let Some(reason) = self.skips.reason(case) {
            tracing::info!(case = %case, reason, "skipping");
            return CaseReport {
                name: case.to_string(),
                attempt,
                container: None,
                verdict: Verdict::Skipped {
                    reason: reason.to_string(),
                },
                started_at,
                elapsed: clock.elapsed(),
            };
        }

        let id = ContainerId::generate();
        let span = tracing::info_span!("kill", case = %case, id = %id, attempt);
        let verdict = async {
            let outcome = self.exercise(case, &id).await;
            let cleaned = cleanup::remove_and_confirm(self.cli.as_ref(), &id).await;
            let verdict = Verdict::settle(outcome, cleaned);
            match &verdict {
                Verdict::Failed { reason } => tracing::warn!(reason, "case failed"),
                _ => tracing::info!("case passed"),
            }
            verdict
        }
        .instrument(span)
        .await;

        CaseReport {
            name: case.to_string(),
            attempt,
            container: Some(id),
            verdict,
            started_at,
            elapsed: clock.elapsed(),
        }
    }

    async fn exercise(&self, case: &SignalCase, id: &ContainerId) -> Result<Verdict> {
        let spec = RunSpec::new(id.clone(), self.image.clone()).shell(case.script());
        let _ = self.cli.run(&spec).await?;

        if case.signal.is_some() {
            readiness::wait_for_marker(Arc::clone(&self.cli), id, TRAP_MARKER, self.policy).await?;
        }

        // A SIGCHLD trap can fire on the idle loop's own `sleep` before we
        // get here; the exit code decides, not the delivery.
        if let Err(e) = self.cli.kill(id, case.signal).await {
            tracing::warn!(error = %e, "signal delivery reported an error");
        }

        let observed = self.observe_exit(case, id).await?;
        tracing::debug!(observed, expected = case.expected_exit_code, "exit code");
        if observed != case.expected_exit_code {
            return Ok(Verdict::failed(format!(
                "expected exit code {}, got {observed}",
                case.expected_exit_code
            )));
        }

        if case.leaves_running() && !self.cli.is_running(id).await? {
            return Ok(Verdict::failed(
                "container exited, expected it to stay suspended",
            ));
        }

        Ok(Verdict::Passed)
    }

    /// Reads the exit code, giving up after `policy.timeout` when the
    /// runtime has to wait for the container to exit.
    async fn observe_exit(&self, case: &SignalCase, id: &ContainerId) -> Result<i32> {
        if !case.wait_for_exit {
            return self.cli.exit_code(id, false).await;
        }
        match tokio::time::timeout(self.policy.timeout, self.cli.exit_code(id, true)).await {
            Ok(code) => code,
            Err(_) => {
                tracing::warn!(timeout = ?self.policy.timeout, "container did not exit after the signal");
                Err(CheckError::Timeout {
                    secs: self.policy.timeout.as_secs(),
                    what: format!("container {id} to exit"),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ctcheck_common::types::Signal;
    use ctcheck_runtime::backend::fake::FakeCli;

    use super::*;
    use crate::cases::default_cases;

    fn verifier(cli: FakeCli, skips: SkipList) -> (Arc<FakeCli>, KillVerifier<FakeCli>) {
        let cli = Arc::new(cli);
        let policy = PollPolicy {
            interval: Duration::from_millis(5),
            timeout: Duration::from_secs(1),
        };
        let verifier = KillVerifier::new(Arc::clone(&cli), "busybox", policy, skips);
        (cli, verifier)
    }

    #[tokio::test]
    async fn hangup_is_trapped() {
        let (cli, verifier) = verifier(FakeCli::new(TRAP_MARKER), SkipList::none());
        let report = verifier.verify(&SignalCase::trapped(Signal::HUP)).await;
        assert_eq!(report.verdict, Verdict::Passed);

        let calls = cli.calls();
        assert!(calls[0].contains("trap \"exit 1\" 1; echo TRAP_RUNNING"));
        assert!(calls.iter().any(|c| c.starts_with("kill -s 1 ")));
        assert!(calls.iter().any(|c| c.starts_with("wait ")));
    }

    #[tokio::test]
    async fn kill_exits_137() {
        let (_, verifier) = verifier(FakeCli::new(TRAP_MARKER), SkipList::none());
        let report = verifier.verify(&SignalCase::untrappable(Signal::KILL)).await;
        assert!(report.verdict.is_passed(), "{:?}", report.verdict);
    }

    #[tokio::test]
    async fn plain_kill_skips_readiness_wait() {
        let (cli, verifier) = verifier(FakeCli::new(TRAP_MARKER).never_ready(), SkipList::none());
        let report = verifier.verify(&SignalCase::without_signal()).await;
        assert!(report.verdict.is_passed(), "{:?}", report.verdict);

        let calls = cli.calls();
        assert!(!calls.iter().any(|c| c.starts_with("logs")));
        assert!(calls.iter().any(|c| c.starts_with("kill ctcheck-")));
    }

    #[tokio::test]
    async fn stop_does_not_wait_and_checks_liveness() {
        let (cli, verifier) = verifier(FakeCli::new(TRAP_MARKER), SkipList::none());
        let report = verifier.verify(&SignalCase::unchanged(Signal::STOP)).await;
        assert!(report.verdict.is_passed(), "{:?}", report.verdict);
        assert!(!cli.calls().iter().any(|c| c.starts_with("wait")));
    }

    #[tokio::test]
    async fn every_default_case_passes_on_a_conforming_runtime() {
        let (cli, verifier) = verifier(FakeCli::new(TRAP_MARKER), SkipList::none());
        for case in default_cases() {
            let report = verifier.verify(&case).await;
            assert!(report.verdict.is_passed(), "{case}: {:?}", report.verdict);
        }
        assert!(cli.live_containers().is_empty());
    }

    #[tokio::test]
    async fn dropped_signal_times_out_waiting_for_exit() {
        let cli = FakeCli::new(TRAP_MARKER).dropping(Signal::USR2);
        let (cli, verifier) = verifier(cli, SkipList::none());
        let report = tokio::time::timeout(
            Duration::from_secs(5),
            verifier.verify(&SignalCase::trapped(Signal::USR2)),
        )
        .await
        .expect("exit wait must be bounded by the policy timeout");

        let Verdict::Failed { reason } = &report.verdict else {
            panic!("expected failure, got {:?}", report.verdict);
        };
        assert!(reason.contains("timeout reached after 1s"), "{reason}");
        assert!(reason.contains("to exit"), "{reason}");
        assert!(report.elapsed < Duration::from_secs(5));
        assert!(cli.live_containers().is_empty(), "container leaked");
    }

    #[tokio::test]
    async fn skipped_signal_creates_nothing() {
        let (cli, verifier) = verifier(FakeCli::new(TRAP_MARKER), SkipList::unforwarded());
        let report = verifier.verify(&SignalCase::trapped(Signal::WINCH)).await;
        assert!(matches!(report.verdict, Verdict::Skipped { .. }));
        assert!(report.container.is_none());
        assert!(cli.calls().is_empty());
    }

    #[tokio::test]
    async fn timeout_fails_and_still_cleans_up() {
        let (cli, verifier) = verifier(FakeCli::new(TRAP_MARKER).never_ready(), SkipList::none());
        let report = verifier.verify(&SignalCase::trapped(Signal::TERM)).await;
        let Verdict::Failed { reason } = &report.verdict else {
            panic!("expected failure, got {:?}", report.verdict);
        };
        assert!(reason.contains("timeout reached after 1s"), "{reason}");
        assert!(cli.live_containers().is_empty());
        assert!(!cli.calls().iter().any(|c| c.starts_with("kill")));
    }

    #[tokio::test]
    async fn setup_failure_is_reported() {
        let (cli, verifier) = verifier(
            FakeCli::new(TRAP_MARKER).failing_run("image not found"),
            SkipList::none(),
        );
        let report = verifier.verify(&SignalCase::trapped(Signal::HUP)).await;
        let Verdict::Failed { reason } = &report.verdict else {
            panic!("expected failure, got {:?}", report.verdict);
        };
        assert!(reason.contains("image not found"), "{reason}");
        assert!(!cli.calls().iter().any(|c| c.starts_with("logs")));
    }

    #[tokio::test]
    async fn leaked_container_fails_passing_case() {
        let (_, verifier) = verifier(FakeCli::new(TRAP_MARKER).sticky(), SkipList::none());
        let report = verifier.verify(&SignalCase::trapped(Signal::HUP)).await;
        let Verdict::Failed { reason } = &report.verdict else {
            panic!("expected failure, got {:?}", report.verdict);
        };
        assert!(reason.starts_with("cleanup:"), "{reason}");
    }

    #[tokio::test]
    async fn repeated_attempts_use_distinct_containers() {
        let (_, verifier) = verifier(FakeCli::new(TRAP_MARKER), SkipList::none());
        let case = SignalCase::trapped(Signal::INT);
        let first = verifier.verify_attempt(&case, 1).await;
        let second = verifier.verify_attempt(&case, 2).await;
        assert_eq!(first.verdict, second.verdict);
        assert_ne!(first.container, second.container);
        assert_eq!(second.attempt, 2);
    }
}
