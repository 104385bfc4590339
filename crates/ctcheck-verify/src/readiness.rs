//! Waiting for a container to announce it is ready.
//!
//! A background task polls the logs on a fixed interval while the caller
//! races it against a timer. Whichever finishes first decides; a poller
//! that loses is aborted.

use std::sync::Arc;
use std::time::Duration;

use ctcheck_common::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_SECS};
use ctcheck_common::error::{CheckError, Result};
use ctcheck_common::types::ContainerId;
use ctcheck_runtime::backend::ContainerCli;

/// How often to poll and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between two log queries.
    pub interval: Duration,
    /// Upper bound for the whole wait.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Waits until the logs of `id` contain `marker`.
///
/// Log queries that fail are treated like "not there yet": right after
/// `run` a runtime may not know the container, and there is no way to tell
/// that apart from a real failure.
///
/// # Errors
///
/// Returns [`CheckError::Timeout`] if the marker does not show up within
/// `policy.timeout`.
pub async fn wait_for_marker<C: ContainerCli>(
    cli: Arc<C>,
    id: &ContainerId,
    marker: &str,
    policy: PollPolicy,
) -> Result<()> {
    let poller = tokio::spawn(poll_logs(cli, id.clone(), marker.to_string(), policy.interval));
    let abort = poller.abort_handle();

    match tokio::time::timeout(policy.timeout, poller).await {
        Ok(Ok(polls)) => {
            tracing::debug!(id = %id, polls, "container is ready");
            Ok(())
        }
        Ok(Err(join)) => Err(poller_failed(id, &join)),
        Err(_) => {
            abort.abort();
            tracing::warn!(id = %id, timeout = ?policy.timeout, "readiness marker never showed up");
            Err(CheckError::Timeout {
                secs: policy.timeout.as_secs(),
                what: format!("{marker} in the logs of {id}"),
            })
        }
    }
}

fn poller_failed(id: &ContainerId, join: &tokio::task::JoinError) -> CheckError {
    CheckError::TaskFailed {
        task: format!("log poller for {id}"),
        message: join.to_string(),
    }
}

/// Polls until the marker shows up; returns the number of queries made.
async fn poll_logs<C: ContainerCli>(
    cli: Arc<C>,
    id: ContainerId,
    marker: String,
    interval: Duration,
) -> usize {
    let mut polls = 0;
    loop {
        polls += 1;
        match cli.logs(&id).await {
            Ok(logs) if logs.contains(&marker) => return polls,
            Ok(_) => {}
            Err(e) => tracing::debug!(id = %id, error = %e, "log query failed, retrying"),
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use ctcheck_runtime::backend::RunSpec;
    use ctcheck_runtime::backend::fake::FakeCli;

    use super::*;

    const MARKER: &str = "TRAP_RUNNING";

    fn fast(timeout_ms: u64) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(10),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    async fn started(cli: &FakeCli) -> ContainerId {
        let spec = RunSpec::new(ContainerId::generate(), "busybox")
            .shell(format!("trap \"exit 1\" 1; echo {MARKER}; while :; do sleep 1; done"));
        cli.run(&spec).await.expect("run")
    }

    #[tokio::test]
    async fn returns_once_marker_is_logged() {
        let cli = Arc::new(FakeCli::new(MARKER).ready_after(3));
        let id = started(&cli).await;
        wait_for_marker(Arc::clone(&cli), &id, MARKER, fast(2_000))
            .await
            .expect("ready");
        let polls = cli.calls().iter().filter(|c| c.starts_with("logs")).count();
        assert_eq!(polls, 4);
    }

    #[tokio::test]
    async fn log_errors_are_retried() {
        let cli = Arc::new(FakeCli::new(MARKER).failing_log_polls(2));
        let id = started(&cli).await;
        wait_for_marker(cli, &id, MARKER, fast(2_000))
            .await
            .expect("ready despite failing queries");
    }

    #[tokio::test]
    async fn times_out_with_configured_duration() {
        let cli = Arc::new(FakeCli::new(MARKER).never_ready());
        let id = started(&cli).await;
        let policy = PollPolicy {
            interval: Duration::from_millis(10),
            timeout: Duration::from_secs(1),
        };
        let err = wait_for_marker(cli, &id, MARKER, policy).await.unwrap_err();
        match err {
            CheckError::Timeout { secs, what } => {
                assert_eq!(secs, 1);
                assert!(what.contains(MARKER));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn crashed_poller_is_a_task_failure() {
        let join = tokio::spawn(async { panic!("boom") }).await.unwrap_err();
        let err = poller_failed(&ContainerId::new("ctcheck-1"), &join);
        match err {
            CheckError::TaskFailed { task, message } => {
                assert_eq!(task, "log poller for ctcheck-1");
                assert!(message.contains("panicked"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn poller_stops_after_timeout() {
        let cli = Arc::new(FakeCli::new(MARKER).never_ready());
        let id = started(&cli).await;
        let _ = wait_for_marker(Arc::clone(&cli), &id, MARKER, fast(50)).await;

        let before = cli.calls().len();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cli.calls().len(), before, "aborted poller kept querying");
    }
}
