//! Defaults shared by the drivers, the verifiers and the CLI.

/// Default container CLI binary.
pub const DEFAULT_RUNTIME: &str = "docker";

/// Default image used for every case. Must provide `sh` and `sleep`.
pub const DEFAULT_IMAGE: &str = "busybox";

/// Default upper bound for the readiness wait, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default interval between two log polls, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Marker the trap script prints once its handler is installed.
pub const TRAP_MARKER: &str = "TRAP_RUNNING";

/// Idle loop every case script ends with.
pub const IDLE_LOOP: &str = "while :; do sleep 1; done";

/// Offset the shell adds to a signal number when a process dies from it.
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// Exit code reported when a container is killed without an explicit
/// signal (128 + SIGKILL).
pub const DEFAULT_KILL_EXIT_CODE: i32 = 137;

/// Exit code reported for a container that has not exited.
pub const NOT_EXITED_EXIT_CODE: i32 = 0;

/// Port published by the port case on both sides by default.
pub const DEFAULT_PUBLISHED_PORT: u16 = 8080;

/// Prefix of every generated container name.
pub const CONTAINER_PREFIX: &str = "ctcheck-";

/// Environment variable overriding the runtime binary.
pub const ENV_RUNTIME: &str = "CTCHECK_RUNTIME";

/// Environment variable overriding the image.
pub const ENV_IMAGE: &str = "CTCHECK_IMAGE";

/// Environment variable overriding the readiness timeout (seconds).
pub const ENV_TIMEOUT: &str = "CTCHECK_TIMEOUT";

/// Application name used in CLI output.
pub const APP_NAME: &str = "ctcheck";
