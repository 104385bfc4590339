//! Domain primitive types used across the ctcheck workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::CONTAINER_PREFIX;
use crate::error::{CheckError, Result};

/// Name of a container created by a check.
///
/// Each case gets a fresh one so that repeated runs never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container name (`ctcheck-` followed by 32 hex digits).
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{CONTAINER_PREFIX}{}", uuid::Uuid::new_v4().simple()))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A POSIX signal, numbered the way a Linux container sees it.
///
/// The numbers do not depend on the host: a macOS host driving a Linux VM
/// still has to send `10` for `SIGUSR1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Signal {
    number: i32,
    name: &'static str,
}

#[allow(missing_docs)]
impl Signal {
    const fn new(number: i32, name: &'static str) -> Self {
        Self { number, name }
    }

    pub const HUP: Self = Self::new(1, "SIGHUP");
    pub const INT: Self = Self::new(2, "SIGINT");
    pub const QUIT: Self = Self::new(3, "SIGQUIT");
    pub const ILL: Self = Self::new(4, "SIGILL");
    pub const TRAP: Self = Self::new(5, "SIGTRAP");
    pub const ABRT: Self = Self::new(6, "SIGABRT");
    pub const BUS: Self = Self::new(7, "SIGBUS");
    pub const FPE: Self = Self::new(8, "SIGFPE");
    pub const KILL: Self = Self::new(9, "SIGKILL");
    pub const USR1: Self = Self::new(10, "SIGUSR1");
    pub const SEGV: Self = Self::new(11, "SIGSEGV");
    pub const USR2: Self = Self::new(12, "SIGUSR2");
    pub const PIPE: Self = Self::new(13, "SIGPIPE");
    pub const ALRM: Self = Self::new(14, "SIGALRM");
    pub const TERM: Self = Self::new(15, "SIGTERM");
    pub const STKFLT: Self = Self::new(16, "SIGSTKFLT");
    pub const CHLD: Self = Self::new(17, "SIGCHLD");
    pub const CONT: Self = Self::new(18, "SIGCONT");
    pub const STOP: Self = Self::new(19, "SIGSTOP");
    pub const TSTP: Self = Self::new(20, "SIGTSTP");
    pub const TTIN: Self = Self::new(21, "SIGTTIN");
    pub const TTOU: Self = Self::new(22, "SIGTTOU");
    pub const URG: Self = Self::new(23, "SIGURG");
    pub const XCPU: Self = Self::new(24, "SIGXCPU");
    pub const XFSZ: Self = Self::new(25, "SIGXFSZ");
    pub const VTALRM: Self = Self::new(26, "SIGVTALRM");
    pub const PROF: Self = Self::new(27, "SIGPROF");
    pub const WINCH: Self = Self::new(28, "SIGWINCH");
    pub const IO: Self = Self::new(29, "SIGIO");
    pub const PWR: Self = Self::new(30, "SIGPWR");
    pub const SYS: Self = Self::new(31, "SIGSYS");

    /// Every standard (non real-time) signal, in numeric order.
    pub const ALL: [Self; 31] = [
        Self::HUP,
        Self::INT,
        Self::QUIT,
        Self::ILL,
        Self::TRAP,
        Self::ABRT,
        Self::BUS,
        Self::FPE,
        Self::KILL,
        Self::USR1,
        Self::SEGV,
        Self::USR2,
        Self::PIPE,
        Self::ALRM,
        Self::TERM,
        Self::STKFLT,
        Self::CHLD,
        Self::CONT,
        Self::STOP,
        Self::TSTP,
        Self::TTIN,
        Self::TTOU,
        Self::URG,
        Self::XCPU,
        Self::XFSZ,
        Self::VTALRM,
        Self::PROF,
        Self::WINCH,
        Self::IO,
        Self::PWR,
        Self::SYS,
    ];

    /// Looks up a signal by its number.
    #[must_use]
    pub fn from_number(number: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.number == number)
    }

    /// Returns the signal number.
    #[must_use]
    pub const fn number(self) -> i32 {
        self.number
    }

    /// Returns the conventional name, e.g. `SIGHUP`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.number)
    }
}

impl FromStr for Signal {
    type Err = CheckError;

    /// Accepts `1`, `HUP`, `SIGHUP` and `sighup`. `IOT` is an alias of `ABRT`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parsed = if let Ok(number) = s.parse::<i32>() {
            Self::from_number(number)
        } else {
            let upper = s.to_ascii_uppercase();
            let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
            let bare = if bare == "IOT" { "ABRT" } else { bare };
            Self::ALL.into_iter().find(|sig| &sig.name[3..] == bare)
        };
        parsed.ok_or_else(|| CheckError::Parse {
            what: "signal",
            input: s.to_string(),
        })
    }
}

/// Transport protocol of a published port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TCP (the runtime default).
    #[default]
    Tcp,
    /// UDP.
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

/// A host port bound to a container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortMapping {
    /// Port on the host side.
    pub host_port: u16,
    /// Port inside the container.
    pub container_port: u16,
    /// Transport protocol.
    #[serde(default)]
    pub protocol: Protocol,
}

impl PortMapping {
    /// Creates a TCP mapping.
    #[must_use]
    pub const fn tcp(host_port: u16, container_port: u16) -> Self {
        Self {
            host_port,
            container_port,
            protocol: Protocol::Tcp,
        }
    }

    /// Value passed to `-p`, e.g. `8080:8080` or `5353:53/udp`.
    #[must_use]
    pub fn publish_arg(&self) -> String {
        match self.protocol {
            Protocol::Tcp => format!("{}:{}", self.host_port, self.container_port),
            Protocol::Udp => format!("{}:{}/udp", self.host_port, self.container_port),
        }
    }

    /// Key understood by port introspection, e.g. `8080/tcp`.
    #[must_use]
    pub fn container_key(&self) -> String {
        format!("{}/{}", self.container_port, self.protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_prefixed() {
        let a = ContainerId::generate();
        let b = ContainerId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("ctcheck-"));
        assert!(a.as_str().len() >= 30);
    }

    #[test]
    fn signal_table_is_numbered_in_order() {
        for (i, sig) in Signal::ALL.iter().enumerate() {
            assert_eq!(sig.number() as usize, i + 1, "{}", sig.name());
        }
    }

    #[test]
    fn signal_parses_numbers_and_names() {
        assert_eq!("1".parse::<Signal>().unwrap(), Signal::HUP);
        assert_eq!("HUP".parse::<Signal>().unwrap(), Signal::HUP);
        assert_eq!("SIGKILL".parse::<Signal>().unwrap(), Signal::KILL);
        assert_eq!("sigterm".parse::<Signal>().unwrap(), Signal::TERM);
        assert_eq!("IOT".parse::<Signal>().unwrap(), Signal::ABRT);
    }

    #[test]
    fn signal_rejects_unknown_input() {
        assert!("0".parse::<Signal>().is_err());
        assert!("64".parse::<Signal>().is_err());
        assert!("SIGNOPE".parse::<Signal>().is_err());
    }

    #[test]
    fn signal_display_includes_number() {
        assert_eq!(Signal::USR1.to_string(), "SIGUSR1(10)");
    }

    #[test]
    fn port_mapping_renders_cli_values() {
        let tcp = PortMapping::tcp(8080, 80);
        assert_eq!(tcp.publish_arg(), "8080:80");
        assert_eq!(tcp.container_key(), "80/tcp");

        let udp = PortMapping {
            host_port: 5353,
            container_port: 53,
            protocol: Protocol::Udp,
        };
        assert_eq!(udp.publish_arg(), "5353:53/udp");
        assert_eq!(udp.container_key(), "53/udp");
    }
}
