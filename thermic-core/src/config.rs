//! Runtime configuration.
//!
//! Defaults come from [`crate::constants`]. Values can be overridden from
//! `THERMIC_*` environment variables or a TOML file; anything unparseable
//! falls back to the default.

use crate::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_CLASSIFICATION_TIMEOUT_MS, DEFAULT_QUIET_PERIOD_SECS,
    DEFAULT_SNAPSHOT_KEY, DEFAULT_TICK_INTERVAL_MS, MAX_ENHANCEMENT_MULTIPLIER,
    MIN_ENHANCEMENT_MULTIPLIER,
};
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Tunables for the cache, the debounce scheduler and the classifier call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThermicConfig {
    /// How long a cached analysis stays valid.
    pub cache_ttl: Duration,
    /// Mutation-free interval before a scheduled analysis fires.
    pub quiet_period: Duration,
    /// Countdown display tick.
    pub tick_interval: Duration,
    /// Upper bound on a single external classification call.
    pub classification_timeout: Duration,
    /// Persistence key the snapshot is stored under.
    pub snapshot_key: String,
}

impl Default for ThermicConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            quiet_period: Duration::from_secs(DEFAULT_QUIET_PERIOD_SECS),
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            classification_timeout: Duration::from_millis(DEFAULT_CLASSIFICATION_TIMEOUT_MS),
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
        }
    }
}

/// On-disk shape: every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ThermicConfigFile {
    cache_ttl_secs: Option<u64>,
    quiet_period_secs: Option<u64>,
    tick_interval_ms: Option<u64>,
    classification_timeout_ms: Option<u64>,
    snapshot_key: Option<String>,
}

impl ThermicConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// The result always passes [`ThermicConfig::validate`]: zero or
    /// unparseable values use the default, and a tick longer than the quiet
    /// period is cut down to it.
    ///
    /// Environment variables:
    /// - `THERMIC_CACHE_TTL_SECS`: Cache record lifetime (default: 86400)
    /// - `THERMIC_QUIET_PERIOD_SECS`: Debounce quiet period (default: 15)
    /// - `THERMIC_TICK_INTERVAL_MS`: Countdown tick (default: 1000)
    /// - `THERMIC_CLASSIFICATION_TIMEOUT_MS`: External call timeout (default: 20000)
    /// - `THERMIC_SNAPSHOT_KEY`: Persistence key (default: "tef_analysis_cache")
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |name: &str| {
            lookup(name)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|n| *n > 0)
        };

        let mut config = Self {
            cache_ttl: number("THERMIC_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            quiet_period: number("THERMIC_QUIET_PERIOD_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.quiet_period),
            tick_interval: number("THERMIC_TICK_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            classification_timeout: number("THERMIC_CLASSIFICATION_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.classification_timeout),
            snapshot_key: lookup("THERMIC_SNAPSHOT_KEY")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.snapshot_key),
        };

        if config.tick_interval > config.quiet_period {
            tracing::warn!(
                tick_ms = config.tick_interval.as_millis() as u64,
                quiet_ms = config.quiet_period.as_millis() as u64,
                "Tick interval exceeds quiet period, clamping"
            );
            config.tick_interval = config.quiet_period;
        }
        config
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: ThermicConfigFile = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        let defaults = Self::default();

        Ok(Self {
            cache_ttl: file
                .cache_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            quiet_period: file
                .quiet_period_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.quiet_period),
            tick_interval: file
                .tick_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            classification_timeout: file
                .classification_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.classification_timeout),
            snapshot_key: file.snapshot_key.unwrap_or(defaults.snapshot_key),
        })
    }

    /// Read, parse and validate a TOML config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_classification_timeout(mut self, timeout: Duration) -> Self {
        self.classification_timeout = timeout;
        self
    }

    pub fn with_snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = key.into();
        self
    }

    /// Lower multiplier bound. Fixed.
    pub fn min_multiplier(&self) -> f64 {
        MIN_ENHANCEMENT_MULTIPLIER
    }

    /// Upper multiplier bound. Fixed.
    pub fn max_multiplier(&self) -> f64 {
        MAX_ENHANCEMENT_MULTIPLIER
    }

    /// Whole countdown ticks in one quiet period (15 with the defaults).
    pub fn countdown_ticks(&self) -> u32 {
        let tick = self.tick_interval.as_millis().max(1);
        let ticks = self.quiet_period.as_millis().div_ceil(tick);
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl.is_zero() {
            return Err(invalid("cache_ttl", &self.cache_ttl, "must be > 0"));
        }
        if self.quiet_period.is_zero() {
            return Err(invalid("quiet_period", &self.quiet_period, "must be > 0"));
        }
        if self.tick_interval.is_zero() {
            return Err(invalid("tick_interval", &self.tick_interval, "must be > 0"));
        }
        if self.tick_interval > self.quiet_period {
            return Err(invalid(
                "tick_interval",
                &self.tick_interval,
                "must be <= quiet_period",
            ));
        }
        if self.classification_timeout.is_zero() {
            return Err(invalid(
                "classification_timeout",
                &self.classification_timeout,
                "must be > 0",
            ));
        }
        if self.snapshot_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "snapshot_key".to_string(),
                value: format!("{:?}", self.snapshot_key),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn invalid(field: &str, value: &Duration, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: format!("{:?}", value),
        reason: reason.to_string(),
    }
}
