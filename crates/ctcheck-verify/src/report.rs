//! Case outcomes and their aggregation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use ctcheck_common::error::{CheckError, Result};
use ctcheck_common::types::ContainerId;
use serde::Serialize;

/// Outcome of a single case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Verdict {
    /// The runtime behaved as expected.
    Passed,
    /// The case did not run.
    Skipped {
        /// Why it was skipped.
        reason: String,
    },
    /// The runtime misbehaved, or the case could not complete.
    Failed {
        /// What went wrong.
        reason: String,
    },
}

impl Verdict {
    /// Shorthand for a failure.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Combines the case body's outcome with the cleanup that followed it.
    ///
    /// A passing case whose container leaked still fails.
    #[must_use]
    pub fn settle(outcome: Result<Self>, cleanup: Result<()>) -> Self {
        let body = outcome.unwrap_or_else(|e| Self::failed(e.to_string()));
        match (body, cleanup) {
            (body, Ok(())) => body,
            (Self::Failed { reason }, Err(e)) => Self::failed(format!("{reason}; cleanup: {e}")),
            (_, Err(e)) => Self::failed(format!("cleanup: {e}")),
        }
    }

    /// Whether the case passed.
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Whether the case failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Record of one case attempt.
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    /// Human-readable case name.
    pub name: String,
    /// 1-based attempt number when a case is repeated.
    pub attempt: u32,
    /// Container used, `None` if none was created.
    pub container: Option<ContainerId>,
    /// Outcome.
    #[serde(flatten)]
    pub verdict: Verdict,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Time spent, cleanup included.
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// All case records of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteReport {
    /// Case records in execution order.
    pub cases: Vec<CaseReport>,
    /// Whether the run was cut short.
    pub interrupted: bool,
}

impl SuiteReport {
    /// Appends a record.
    pub fn push(&mut self, case: CaseReport) {
        self.cases.push(case);
    }

    /// Number of passed attempts.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.verdict.is_passed()).count()
    }

    /// Number of failed attempts.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.cases.iter().filter(|c| c.verdict.is_failed()).count()
    }

    /// Number of skipped attempts.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.cases.len() - self.passed() - self.failed()
    }

    /// Whether nothing failed and the run completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && !self.interrupted
    }

    /// Failed records.
    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|c| c.verdict.is_failed())
    }

    /// Serializes the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(CheckError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(verdict: Verdict) -> CaseReport {
        CaseReport {
            name: "case".into(),
            attempt: 1,
            container: Some(ContainerId::new("ctcheck-1")),
            verdict,
            started_at: Utc::now(),
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn settle_keeps_outcome_when_cleanup_succeeds() {
        assert_eq!(Verdict::settle(Ok(Verdict::Passed), Ok(())), Verdict::Passed);
    }

    #[test]
    fn settle_turns_errors_into_failures() {
        let outcome = Err(CheckError::Timeout {
            secs: 30,
            what: "marker".into(),
        });
        let verdict = Verdict::settle(outcome, Ok(()));
        assert_eq!(
            verdict,
            Verdict::failed("timeout reached after 30s waiting for marker")
        );
    }

    #[test]
    fn settle_fails_pass_with_leak() {
        let leak = Err(CheckError::Leaked {
            id: "c1".into(),
            removed: false,
        });
        let verdict = Verdict::settle(Ok(Verdict::Passed), leak);
        assert!(verdict.is_failed());
    }

    #[test]
    fn settle_keeps_both_reasons() {
        let leak = Err(CheckError::Leaked {
            id: "c1".into(),
            removed: true,
        });
        let verdict = Verdict::settle(Ok(Verdict::failed("exit code 1, expected 2")), leak);
        let Verdict::Failed { reason } = verdict else {
            panic!("expected failure");
        };
        assert!(reason.starts_with("exit code 1, expected 2; cleanup:"));
    }

    #[test]
    fn counts_add_up() {
        let mut report = SuiteReport::default();
        report.push(record(Verdict::Passed));
        report.push(record(Verdict::failed("boom")));
        report.push(record(Verdict::Skipped {
            reason: "not forwarded".into(),
        }));
        assert_eq!((report.passed(), report.failed(), report.skipped()), (1, 1, 1));
        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn interrupted_run_is_not_a_success() {
        let report = SuiteReport {
            cases: vec![record(Verdict::Passed)],
            interrupted: true,
        };
        assert!(!report.is_success());
    }

    #[test]
    fn json_flattens_verdict() {
        let mut report = SuiteReport::default();
        report.push(record(Verdict::failed("boom")));
        let json: serde_json::Value =
            serde_json::from_str(&report.to_json().expect("json")).expect("parse");
        let case = &json["cases"][0];
        assert_eq!(case["status"], "failed");
        assert_eq!(case["reason"], "boom");
        assert_eq!(case["elapsed_ms"], 1500);
        assert_eq!(case["container"], "ctcheck-1");
    }
}
