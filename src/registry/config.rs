//! Registry configuration

use std::time::Duration;

use crate::error::{Error, Result};

/// Timing knobs for broadcaster liveness
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How long a disconnected broadcaster keeps its entry (and monitor
    /// number) before it is reclaimed
    pub reclaim_grace_period: Duration,

    /// How often the relay looks for expired entries
    pub cleanup_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            reclaim_grace_period: Duration::from_secs(60 * 60),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl RegistryConfig {
    /// Set the reclaim grace period
    pub fn reclaim_grace_period(mut self, period: Duration) -> Self {
        self.reclaim_grace_period = period;
        self
    }

    /// Set the cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Load overrides from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load overrides through an arbitrary key lookup
    ///
    /// Reads `ATMOS_RECLAIM_GRACE_SECS` and `ATMOS_CLEANUP_INTERVAL_SECS`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = lookup("ATMOS_RECLAIM_GRACE_SECS") {
            config.reclaim_grace_period = parse_secs("ATMOS_RECLAIM_GRACE_SECS", &secs)?;
        }
        if let Some(secs) = lookup("ATMOS_CLEANUP_INTERVAL_SECS") {
            config.cleanup_interval = parse_secs("ATMOS_CLEANUP_INTERVAL_SECS", &secs)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.cleanup_interval.is_zero() {
            return Err(Error::Config(
                "cleanup interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| Error::Config(format!("{key}: expected whole seconds, got '{value}'")))
}
