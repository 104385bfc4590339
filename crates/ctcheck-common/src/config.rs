//! Configuration model for a check run.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! `CTCHECK_*` environment variables. The CLI applies its own flags last.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{CheckError, Result};
use crate::types::{PortMapping, Signal};

/// Root configuration for a check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Container CLI binary (name looked up on `PATH`, or a path).
    pub runtime: PathBuf,
    /// Image every case runs.
    pub image: String,
    /// Upper bound for the readiness wait, in seconds.
    pub timeout_secs: u64,
    /// Interval between two log polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Port published by the port case.
    pub port: PortMapping,
    /// Signals skipped on top of the default list (names or numbers).
    pub extra_skips: Vec<String>,
    /// Whether the built-in list of unforwarded signals applies.
    pub default_skips: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            runtime: PathBuf::from(constants::DEFAULT_RUNTIME),
            image: constants::DEFAULT_IMAGE.to_string(),
            timeout_secs: constants::DEFAULT_TIMEOUT_SECS,
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
            port: PortMapping::tcp(
                constants::DEFAULT_PUBLISHED_PORT,
                constants::DEFAULT_PUBLISHED_PORT,
            ),
            extra_skips: Vec::new(),
            default_skips: true,
        }
    }
}

impl CheckConfig {
    /// Loads a JSON configuration file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| CheckError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `CTCHECK_RUNTIME`, `CTCHECK_IMAGE` and `CTCHECK_TIMEOUT`.
    ///
    /// # Errors
    ///
    /// Returns an error if `CTCHECK_TIMEOUT` is not a number of seconds.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout value is not a number of seconds.
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(runtime) = lookup(constants::ENV_RUNTIME) {
            self.runtime = PathBuf::from(runtime);
        }
        if let Some(image) = lookup(constants::ENV_IMAGE) {
            self.image = image;
        }
        if let Some(timeout) = lookup(constants::ENV_TIMEOUT) {
            self.timeout_secs = timeout.trim().parse().map_err(|_| CheckError::Config {
                message: format!("{} must be a number of seconds, got {timeout:?}", constants::ENV_TIMEOUT),
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks the values that would make a run meaningless.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(CheckError::Config {
                message: "timeout must be at least one second".into(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(CheckError::Config {
                message: "poll interval must be positive".into(),
            });
        }
        if self.image.trim().is_empty() {
            return Err(CheckError::Config {
                message: "image must not be empty".into(),
            });
        }
        let _ = self.parsed_extra_skips()?;
        Ok(())
    }

    /// Readiness timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Parses [`extra_skips`](Self::extra_skips) into signals.
    ///
    /// # Errors
    ///
    /// Returns an error for the first entry that names no signal.
    pub fn parsed_extra_skips(&self) -> Result<Vec<Signal>> {
        self.extra_skips.iter().map(|s| s.parse()).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_reference_suite() {
        let config = CheckConfig::default();
        assert_eq!(config.runtime, PathBuf::from("docker"));
        assert_eq!(config.image, "busybox");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.port, PortMapping::tcp(8080, 8080));
        assert!(config.default_skips);
    }

    #[test]
    fn load_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ctcheck.json");
        std::fs::write(&path, r#"{ "image": "alpine:3.20", "extra_skips": ["USR2"] }"#)
            .expect("write");

        let config = CheckConfig::load(&path).expect("load");
        assert_eq!(config.image, "alpine:3.20");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.parsed_extra_skips().expect("skips"), vec![Signal::USR2]);
    }

    #[test]
    fn load_rejects_unknown_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ctcheck.json");
        std::fs::write(&path, r#"{ "imgae": "typo" }"#).expect("write");
        assert!(CheckConfig::load(&path).is_err());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = CheckConfig::load(Path::new("/nonexistent/ctcheck.json")).unwrap_err();
        assert!(matches!(err, CheckError::Io { .. }));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CTCHECK_RUNTIME", "podman"),
            ("CTCHECK_TIMEOUT", "5"),
        ]);
        let config = CheckConfig::default()
            .apply_env_from(|k| env.get(k).map(ToString::to_string))
            .expect("env");
        assert_eq!(config.runtime, PathBuf::from("podman"));
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.image, "busybox");
    }

    #[test]
    fn env_timeout_must_be_numeric() {
        let result = CheckConfig::default().apply_env_from(|k| {
            (k == "CTCHECK_TIMEOUT").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(CheckError::Config { .. })));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = CheckConfig {
            timeout_secs: 0,
            ..CheckConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_extra_skip_is_rejected() {
        let config = CheckConfig {
            extra_skips: vec!["SIGNOPE".into()],
            ..CheckConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
