//! Signal cases and the exit codes they must produce.

use std::collections::BTreeMap;
use std::fmt;

use ctcheck_common::constants::{
    DEFAULT_KILL_EXIT_CODE, IDLE_LOOP, NOT_EXITED_EXIT_CODE, SIGNAL_EXIT_BASE, TRAP_MARKER,
};
use ctcheck_common::types::Signal;
use serde::Serialize;

/// Exit code of a process terminated by `signal`.
///
/// A trapped signal exits with the signal number itself (the trap handler
/// calls `exit <S>`); an uncaught one follows the shell's `128 + S`.
#[must_use]
pub const fn expected_exit_code(signal: Signal, trappable: bool) -> i32 {
    if trappable {
        signal.number()
    } else {
        SIGNAL_EXIT_BASE + signal.number()
    }
}

/// One row of the kill table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignalCase {
    /// Signal to deliver, `None` for a plain `kill`.
    pub signal: Option<Signal>,
    /// Whether the trap installed by the script can catch `signal`.
    pub trappable: bool,
    /// Exit code the container must report.
    pub expected_exit_code: i32,
    /// Whether to block until the container has exited before reading it.
    pub wait_for_exit: bool,
}

impl SignalCase {
    /// A signal the script traps: exit code is the signal number.
    #[must_use]
    pub const fn trapped(signal: Signal) -> Self {
        Self {
            signal: Some(signal),
            trappable: true,
            expected_exit_code: expected_exit_code(signal, true),
            wait_for_exit: true,
        }
    }

    /// A signal no handler can catch: exit code is `128 + S`.
    #[must_use]
    pub const fn untrappable(signal: Signal) -> Self {
        Self {
            signal: Some(signal),
            trappable: false,
            expected_exit_code: expected_exit_code(signal, false),
            wait_for_exit: true,
        }
    }

    /// A signal that suspends rather than terminates.
    ///
    /// The process never exits, so the exit code stays at the "not exited"
    /// value and the check must not wait for an exit.
    #[must_use]
    pub const fn unchanged(signal: Signal) -> Self {
        Self {
            signal: Some(signal),
            trappable: false,
            expected_exit_code: NOT_EXITED_EXIT_CODE,
            wait_for_exit: false,
        }
    }

    /// A plain `kill`: the runtime's default signal, SIGKILL.
    #[must_use]
    pub const fn without_signal() -> Self {
        Self {
            signal: None,
            trappable: false,
            expected_exit_code: DEFAULT_KILL_EXIT_CODE,
            wait_for_exit: true,
        }
    }

    /// Whether delivery is expected to leave the process alive.
    #[must_use]
    pub const fn leaves_running(&self) -> bool {
        self.signal.is_some() && !self.wait_for_exit
    }

    /// Shell script the container runs for this case.
    ///
    /// With a signal, a trap exiting with the signal number is installed and
    /// the readiness marker printed before idling.
    #[must_use]
    pub fn script(&self) -> String {
        match self.signal {
            Some(sig) => {
                let n = sig.number();
                format!("trap \"exit {n}\" {n}; echo {TRAP_MARKER}; {IDLE_LOOP}")
            }
            None => IDLE_LOOP.to_string(),
        }
    }
}

impl fmt::Display for SignalCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.signal {
            None => write!(f, "without a signal"),
            Some(sig) if self.leaves_running() => {
                write!(f, "with {sig} signal, don't change the exit code")
            }
            Some(sig) => write!(f, "with {sig} signal"),
        }
    }
}

/// The full kill table: every standard signal a shell can trap, SIGKILL,
/// SIGSTOP, and a plain kill.
#[must_use]
pub fn default_cases() -> Vec<SignalCase> {
    vec![
        SignalCase::trapped(Signal::HUP),
        SignalCase::trapped(Signal::INT),
        SignalCase::trapped(Signal::QUIT),
        SignalCase::trapped(Signal::ILL),
        SignalCase::trapped(Signal::TRAP),
        SignalCase::trapped(Signal::ABRT),
        SignalCase::trapped(Signal::FPE),
        SignalCase::untrappable(Signal::KILL),
        SignalCase::trapped(Signal::USR1),
        SignalCase::trapped(Signal::SEGV),
        SignalCase::trapped(Signal::USR2),
        SignalCase::trapped(Signal::PIPE),
        SignalCase::trapped(Signal::ALRM),
        SignalCase::trapped(Signal::TERM),
        SignalCase::trapped(Signal::STKFLT),
        SignalCase::trapped(Signal::CHLD),
        SignalCase::trapped(Signal::CONT),
        SignalCase::unchanged(Signal::STOP),
        SignalCase::trapped(Signal::TSTP),
        SignalCase::trapped(Signal::TTIN),
        SignalCase::trapped(Signal::TTOU),
        SignalCase::trapped(Signal::URG),
        SignalCase::trapped(Signal::XCPU),
        SignalCase::trapped(Signal::XFSZ),
        SignalCase::trapped(Signal::VTALRM),
        SignalCase::trapped(Signal::PROF),
        SignalCase::trapped(Signal::WINCH),
        SignalCase::trapped(Signal::IO),
        SignalCase::trapped(Signal::PWR),
        SignalCase::without_signal(),
    ]
}

/// Builds the case for `signal` following the default table's policy.
#[must_use]
pub fn case_for(signal: Signal) -> SignalCase {
    match signal {
        Signal::KILL => SignalCase::untrappable(signal),
        Signal::STOP => SignalCase::unchanged(signal),
        _ => SignalCase::trapped(signal),
    }
}

/// Signals a runtime is known not to forward, with the reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipList {
    entries: BTreeMap<i32, (Signal, String)>,
}

impl SkipList {
    /// An empty list: every case runs.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Signals the reference shim does not forward to the workload.
    #[must_use]
    pub fn unforwarded() -> Self {
        let mut list = Self::none();
        for sig in [
            Signal::QUIT,
            Signal::ILL,
            Signal::BUS,
            Signal::FPE,
            Signal::SEGV,
            Signal::PIPE,
        ] {
            list.add(sig, "not forwarded by the runtime shim");
        }
        list.add(Signal::WINCH, "window-size changes are not forwarded");
        list
    }

    /// Adds (or replaces) an entry.
    pub fn add(&mut self, signal: Signal, reason: impl Into<String>) {
        let _ = self
            .entries
            .insert(signal.number(), (signal, reason.into()));
    }

    /// Returns why `case` is skipped, if it is.
    #[must_use]
    pub fn reason(&self, case: &SignalCase) -> Option<&str> {
        let sig = case.signal?;
        self.entries
            .get(&sig.number())
            .map(|(_, reason)| reason.as_str())
    }

    /// Skipped signals in numeric order.
    pub fn signals(&self) -> impl Iterator<Item = Signal> + '_ {
        self.entries.values().map(|(sig, _)| *sig)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hangup_trapped_exits_with_one() {
        assert_eq!(SignalCase::trapped(Signal::HUP).expected_exit_code, 1);
    }

    #[test]
    fn kill_exits_with_137() {
        let case = SignalCase::untrappable(Signal::KILL);
        assert_eq!(case.expected_exit_code, 137);
        assert!(!case.trappable);
    }

    #[test]
    fn plain_kill_exits_with_137() {
        let case = SignalCase::without_signal();
        assert_eq!(case.expected_exit_code, 137);
        assert!(case.signal.is_none());
        assert!(case.wait_for_exit);
    }

    #[test]
    fn stop_does_not_wait() {
        let case = SignalCase::unchanged(Signal::STOP);
        assert_eq!(case.expected_exit_code, 0);
        assert!(!case.wait_for_exit);
        assert!(case.leaves_running());
    }

    #[test]
    fn every_case_obeys_exit_code_rule() {
        for case in default_cases() {
            match case.signal {
                None => assert_eq!(case.expected_exit_code, 137),
                Some(sig) if case.leaves_running() => assert_eq!(case.expected_exit_code, 0, "{sig}"),
                Some(sig) if case.trappable => assert_eq!(case.expected_exit_code, sig.number()),
                Some(sig) => assert_eq!(case.expected_exit_code, 128 + sig.number()),
            }
        }
    }

    #[test]
    fn default_table_has_one_plain_kill_and_one_stop() {
        let cases = default_cases();
        assert_eq!(cases.len(), 30);
        assert_eq!(cases.iter().filter(|c| c.signal.is_none()).count(), 1);
        assert_eq!(cases.iter().filter(|c| c.leaves_running()).count(), 1);
        assert!(cases.iter().all(|c| c.signal != Some(Signal::BUS)));
    }

    #[test]
    fn case_for_follows_table_policy() {
        assert_eq!(case_for(Signal::KILL), SignalCase::untrappable(Signal::KILL));
        assert_eq!(case_for(Signal::STOP), SignalCase::unchanged(Signal::STOP));
        assert_eq!(case_for(Signal::TERM), SignalCase::trapped(Signal::TERM));
    }

    #[test]
    fn trapped_script_arms_trap_before_marker() {
        let script = SignalCase::trapped(Signal::TERM).script();
        assert_eq!(
            script,
            "trap \"exit 15\" 15; echo TRAP_RUNNING; while :; do sleep 1; done"
        );
    }

    #[test]
    fn plain_kill_script_only_idles() {
        assert_eq!(SignalCase::without_signal().script(), "while :; do sleep 1; done");
    }

    #[test]
    fn unforwarded_list_skips_shim_signals() {
        let skips = SkipList::unforwarded();
        assert_eq!(skips.len(), 7);
        assert!(skips.reason(&SignalCase::trapped(Signal::WINCH)).is_some());
        assert!(skips.reason(&SignalCase::trapped(Signal::SEGV)).is_some());
        assert!(skips.reason(&SignalCase::trapped(Signal::HUP)).is_none());
        assert!(skips.reason(&SignalCase::without_signal()).is_none());
    }

    #[test]
    fn display_names_signal() {
        assert_eq!(
            SignalCase::trapped(Signal::HUP).to_string(),
            "with SIGHUP(1) signal"
        );
        assert_eq!(SignalCase::without_signal().to_string(), "without a signal");
        assert!(SignalCase::unchanged(Signal::STOP)
            .to_string()
            .contains("don't change the exit code"));
    }
}
