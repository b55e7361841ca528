//! Engine configuration
//!
//! Defines the tunables of the execution engine: per-stage deadlines,
//! run retention and concurrency limits.

use std::time::Duration;

use tokio::sync::Semaphore;

/// Default deadline for a single `fetch`, `infer` or `commit` call
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default time a terminal run stays queryable
pub const DEFAULT_RETENTION_WINDOW: Duration = Duration::from_secs(600);

/// Default maximum number of terminal runs kept in the tracker
pub const DEFAULT_RETENTION_MAX_RUNS: usize = 1000;

/// Default number of runs executing at the same time
pub const DEFAULT_MAX_CONCURRENT_RUNS: usize = 8;

/// Default period of the retention sweeper
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Engine configuration
///
/// Every value has an explicit default; nothing is assumed at call sites.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline applied to each stage call independently
    pub stage_timeout: Duration,

    /// How long a terminal run is retained before eviction
    pub retention_window: Duration,

    /// Maximum number of terminal runs retained at once
    pub retention_max_runs: usize,

    /// Max runs executing concurrently (sync and async combined)
    pub max_concurrent_runs: usize,

    /// Whether synchronous runs are also recorded in the run tracker
    pub audit_sync_runs: bool,

    /// How often the retention sweeper runs
    pub sweep_interval: Duration,
}

impl EngineConfig {
    /// Creates configuration from environment variables
    ///
    /// All variables are optional:
    /// - STAGE_TIMEOUT (seconds, default: 60)
    /// - RUN_RETENTION (seconds, default: 600)
    /// - RUN_RETENTION_MAX (default: 1000)
    /// - MAX_CONCURRENT_RUNS (default: 8)
    /// - AUDIT_SYNC_RUNS (true/false, default: false)
    /// - SWEEP_INTERVAL (seconds, default: 30)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let stage_timeout = env_secs("STAGE_TIMEOUT")?.unwrap_or(defaults.stage_timeout);
        let retention_window = env_secs("RUN_RETENTION")?.unwrap_or(defaults.retention_window);
        let sweep_interval = env_secs("SWEEP_INTERVAL")?.unwrap_or(defaults.sweep_interval);

        let retention_max_runs =
            env_parse::<usize>("RUN_RETENTION_MAX")?.unwrap_or(defaults.retention_max_runs);
        let max_concurrent_runs =
            env_parse::<usize>("MAX_CONCURRENT_RUNS")?.unwrap_or(defaults.max_concurrent_runs);
        let audit_sync_runs =
            env_parse::<bool>("AUDIT_SYNC_RUNS")?.unwrap_or(defaults.audit_sync_runs);

        Ok(Self {
            stage_timeout,
            retention_window,
            retention_max_runs,
            max_concurrent_runs,
            audit_sync_runs,
            sweep_interval,
        })
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn with_audit_sync_runs(mut self, audit: bool) -> Self {
        self.audit_sync_runs = audit;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stage_timeout.is_zero() {
            anyhow::bail!("stage_timeout must be greater than 0");
        }

        if self.retention_window.is_zero() {
            anyhow::bail!("retention_window must be greater than 0");
        }

        if self.retention_max_runs == 0 {
            anyhow::bail!("retention_max_runs must be greater than 0");
        }

        if self.max_concurrent_runs == 0 {
            anyhow::bail!("max_concurrent_runs must be greater than 0");
        }

        if self.max_concurrent_runs > Semaphore::MAX_PERMITS {
            anyhow::bail!(
                "max_concurrent_runs must be at most {}",
                Semaphore::MAX_PERMITS
            );
        }

        if self.sweep_interval.is_zero() {
            anyhow::bail!("sweep_interval must be greater than 0");
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            retention_window: DEFAULT_RETENTION_WINDOW,
            retention_max_runs: DEFAULT_RETENTION_MAX_RUNS,
            max_concurrent_runs: DEFAULT_MAX_CONCURRENT_RUNS,
            audit_sync_runs: false,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

fn env_secs(key: &str) -> anyhow::Result<Option<Duration>> {
    Ok(env_parse::<u64>(key)?.map(Duration::from_secs))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> anyhow::Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: '{}'", key, raw)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.stage_timeout, Duration::from_secs(60));
        assert_eq!(config.retention_window, Duration::from_secs(600));
        assert_eq!(config.retention_max_runs, 1000);
        assert!(!config.audit_sync_runs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        assert!(config.validate().is_ok());

        config.stage_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        config.stage_timeout = Duration::from_millis(250);
        config.max_concurrent_runs = 0;
        assert!(config.validate().is_err());

        config.max_concurrent_runs = Semaphore::MAX_PERMITS + 1;
        assert!(config.validate().is_err());

        config.max_concurrent_runs = Semaphore::MAX_PERMITS;
        assert!(config.validate().is_ok());

        config.max_concurrent_runs = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_stage_timeout(Duration::from_millis(50))
            .with_audit_sync_runs(true);

        assert_eq!(config.stage_timeout, Duration::from_millis(50));
        assert!(config.audit_sync_runs);
    }
}
