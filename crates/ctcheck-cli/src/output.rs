//! Formatted output helpers for CLI commands.
//!
//! Provides the case table, the run summary, and human-readable
//! duration formatting.

use std::fmt::Write as _;
use std::time::Duration;

use ctcheck_verify::cases::{SignalCase, SkipList};
use ctcheck_verify::report::{SuiteReport, Verdict};
use serde_json::json;

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Formats a duration as seconds with one decimal (e.g., "1.5s").
#[must_use]
pub fn format_duration(d: Duration) -> String {
    format!("{:.1}s", d.as_secs_f64())
}

/// Renders the signal table with expected codes and skip status.
#[must_use]
pub fn case_table(cases: &[SignalCase], skips: &SkipList) -> String {
    let mut out = format!(
        "{:<46} {:<9} {:<6} {}\n",
        "CASE", "EXPECTED", "WAIT", "STATUS"
    );
    for case in cases {
        let status = skips
            .reason(case)
            .map_or_else(|| "run".to_string(), |reason| format!("skip ({reason})"));
        let wait = if case.wait_for_exit { "yes" } else { "no" };
        let _ = writeln!(
            out,
            "{:<46} {:<9} {:<6} {status}",
            case.to_string(),
            case.expected_exit_code,
            wait
        );
    }
    out.truncate(out.trim_end().len());
    out
}

/// Renders the signal table as JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn case_table_json(cases: &[SignalCase], skips: &SkipList) -> anyhow::Result<String> {
    let rows: Vec<_> = cases
        .iter()
        .map(|case| {
            json!({
                "name": case.to_string(),
                "case": case,
                "skipped": skips.reason(case),
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

/// Renders one line per attempt followed by the totals.
#[must_use]
pub fn summary(report: &SuiteReport) -> String {
    let mut out = String::new();
    for case in &report.cases {
        let attempt = if case.attempt > 1 {
            format!(" {DIM}#{}{RESET}", case.attempt)
        } else {
            String::new()
        };
        let elapsed = format_duration(case.elapsed);
        let _ = match &case.verdict {
            Verdict::Passed => writeln!(
                out,
                "  {GREEN}✔{RESET} {}{attempt} {DIM}({elapsed}){RESET}",
                case.name
            ),
            Verdict::Skipped { reason } => writeln!(
                out,
                "  {YELLOW}-{RESET} {}{attempt} {DIM}skipped: {reason}{RESET}",
                case.name
            ),
            Verdict::Failed { reason } => writeln!(
                out,
                "  {RED}✘{RESET} {BOLD}{}{RESET}{attempt} {DIM}({elapsed}){RESET}\n      {reason}",
                case.name
            ),
        };
    }

    let colour = if report.is_success() { GREEN } else { RED };
    let _ = write!(
        out,
        "\n  {colour}{BOLD}{} passed, {} failed, {} skipped{RESET}",
        report.passed(),
        report.failed(),
        report.skipped()
    );
    if report.interrupted {
        let _ = write!(out, " {YELLOW}(interrupted){RESET}");
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ctcheck_common::types::{ContainerId, Signal};
    use ctcheck_verify::report::CaseReport;

    use super::*;

    fn record(name: &str, attempt: u32, verdict: Verdict) -> CaseReport {
        CaseReport {
            name: name.into(),
            attempt,
            container: Some(ContainerId::new("ctcheck-1")),
            verdict,
            started_at: Utc::now(),
            elapsed: Duration::from_millis(1250),
        }
    }

    #[test]
    fn format_duration_keeps_one_decimal() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(30)), "30.0s");
    }

    #[test]
    fn case_table_marks_skips() {
        let cases = [
            SignalCase::trapped(Signal::HUP),
            SignalCase::trapped(Signal::WINCH),
            SignalCase::unchanged(Signal::STOP),
        ];
        let table = case_table(&cases, &SkipList::unforwarded());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("CASE"));
        assert!(lines[1].contains("SIGHUP(1)") && lines[1].ends_with("run"));
        assert!(lines[2].contains("skip (window-size changes are not forwarded)"));
        assert!(lines[3].contains(" no "));
    }

    #[test]
    fn case_table_json_lists_reason() {
        let cases = [SignalCase::trapped(Signal::PIPE)];
        let json = case_table_json(&cases, &SkipList::unforwarded()).expect("json");
        let rows: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(rows[0]["case"]["expected_exit_code"], 13);
        assert!(rows[0]["skipped"].is_string());
    }

    #[test]
    fn summary_counts_and_reasons() {
        let report = SuiteReport {
            cases: vec![
                record("with SIGHUP(1) signal", 1, Verdict::Passed),
                record("with SIGTERM(15) signal", 2, Verdict::failed("expected exit code 15, got 143")),
            ],
            interrupted: false,
        };
        let text = summary(&report);
        assert!(text.contains("expected exit code 15, got 143"));
        assert!(text.contains("#2"));
        assert!(text.contains("1 passed, 1 failed, 0 skipped"));
        assert!(!text.contains("interrupted"));
    }

    #[test]
    fn summary_flags_interruption() {
        let report = SuiteReport {
            cases: Vec::new(),
            interrupted: true,
        };
        assert!(summary(&report).contains("(interrupted)"));
    }
}
