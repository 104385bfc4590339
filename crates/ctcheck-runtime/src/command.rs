//! External command invocation.

use std::path::Path;
use std::process::Stdio;

use ctcheck_common::error::{CheckError, Result};

/// Captured result of an external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Exit code, `None` if the command was killed by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Returns whether the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// Converts a non-zero exit into [`CheckError::CommandFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the command did not exit with status zero.
    pub fn into_checked(self, program: &Path, args: &[String]) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        Err(CheckError::CommandFailed {
            program: program.display().to_string(),
            args: args.join(" "),
            code: self.exit_code,
            stderr: self.stderr.trim().to_string(),
        })
    }
}

/// Runs `program` with `args` to completion and captures its output.
///
/// A non-zero exit is not an error here; callers decide through
/// [`CommandOutput::into_checked`].
///
/// Dropping the future kills the program, so a caller can bound a blocking
/// invocation such as `wait` with a timeout.
///
/// # Errors
///
/// Returns an error if the program cannot be spawned.
pub async fn run_command(program: &Path, args: &[String]) -> Result<CommandOutput> {
    tracing::debug!(program = %program.display(), ?args, "running command");

    let output = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| CheckError::Io {
            path: program.to_path_buf(),
            source: e,
        })?;

    let result = CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
    };
    tracing::trace!(code = ?result.exit_code, "command finished");
    Ok(result)
}
