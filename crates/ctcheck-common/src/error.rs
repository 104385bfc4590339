//! Unified error type for the ctcheck workspace.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CheckError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path (or program) where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An external command ran but reported failure.
    #[error("`{program} {args}` exited with {code:?}: {stderr}")]
    CommandFailed {
        /// Program that was invoked.
        program: String,
        /// Space-joined argument list.
        args: String,
        /// Exit code, `None` if the command was killed by a signal.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// A bounded wait ran out of time.
    #[error("timeout reached after {secs}s waiting for {what}")]
    Timeout {
        /// Configured duration in seconds.
        secs: u64,
        /// What was being waited for.
        what: String,
    },

    /// Command output could not be interpreted.
    #[error("cannot parse {what} from {input:?}")]
    Parse {
        /// Kind of value expected.
        what: &'static str,
        /// Offending input.
        input: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// The container exists but has no live process to act on.
    #[error("container {id} is not running")]
    NotRunning {
        /// Name of the container.
        id: String,
    },

    /// A background task ended without producing its result.
    #[error("{task} stopped unexpectedly: {message}")]
    TaskFailed {
        /// What the task was doing.
        task: String,
        /// Panic or cancellation detail.
        message: String,
    },

    /// A container outlived its cleanup.
    #[error("container {id} still exists after removal (removal reported {removed})")]
    Leaked {
        /// Name of the container.
        id: String,
        /// What the remove call returned.
        removed: bool,
    },

    /// The driver cannot perform the requested operation.
    #[error("{operation} is not supported by the {driver} driver")]
    Unsupported {
        /// Operation that was requested.
        operation: &'static str,
        /// Driver that rejected it.
        driver: &'static str,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CheckError>;
