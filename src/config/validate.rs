//! Config validation logic.
//! Checks values that would otherwise fail late (zero workers, zero timeout, empty tool path).

use anyhow::{bail, Result};
use std::time::Duration;
use tracing::debug;

use super::types::Config;

impl Config {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            bail!("jobs must be at least 1");
        }
        if self.read_timeout == Duration::ZERO {
            bail!("read_timeout_seconds must be greater than 0");
        }
        if self.exiftool_path.as_os_str().is_empty() {
            bail!("exiftool_path must not be empty");
        }

        debug!(
            jobs = self.jobs,
            timeout_s = self.read_timeout.as_secs(),
            exiftool = %self.exiftool_path.display(),
            log_file = %self
                .log_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<none>".into()),
            "Config validated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_jobs_and_timeout() {
        let cfg = Config {
            jobs: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            read_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            exiftool_path: PathBuf::new(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }
}
