//! Configuration types

use crate::protocol::MacAddr;
use crate::telemetry::LogConfig;
use crate::{Error, Result};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;

pub const DEFAULT_CAPACITY: usize = 64;
pub const DEFAULT_QUEUE_CAPACITY: usize = 3;
pub const DEFAULT_REACHABLE_SECS: u64 = 30;
pub const DEFAULT_DELAY_SECS: u64 = 5;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;
pub const DEFAULT_MAX_RETRY_INTERVAL_MS: u64 = 8_000;
pub const DEFAULT_FAILED_GRACE_SECS: u64 = 20;
pub const DEFAULT_STALE_SECS: u64 = 20 * 60;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;

/// Largest accepted `cache.capacity`
pub const MAX_CAPACITY: usize = 1 << 20;
/// Largest accepted `cache.queue_capacity`
pub const MAX_QUEUE_CAPACITY: usize = 1024;

/// User-defined configuration (TOML)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArpConfig {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
    #[serde(default, rename = "static")]
    pub static_entries: Vec<StaticEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSection {
    pub capacity: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub reachable_timeout_secs: Option<u64>,
    pub delay_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_interval_ms: Option<u64>,
    pub backoff_multiplier: Option<u32>,
    pub max_retry_interval_ms: Option<u64>,
    pub failed_grace_secs: Option<u64>,
    pub stale_timeout_secs: Option<u64>,
    pub tick_interval_ms: Option<u64>,
    pub tie_break: Option<TieBreak>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub format: Option<String>,
}

/// A permanent mapping installed at startup
#[derive(Debug, Clone, Deserialize)]
pub struct StaticEntry {
    pub address: Ipv4Addr,
    pub mac: String,
}

/// Ordering among eviction candidates of the same priority tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Least recently confirmed first
    #[default]
    OldestConfirmed,
    /// Least recently created first
    OldestCreated,
}

/// Delay between successive probes for one entry.
///
/// The n-th wait is `initial * multiplier^(n-1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBackoff {
    pub initial: Duration,
    pub multiplier: u32,
    pub max: Duration,
}

impl RetryBackoff {
    /// Wait after the `probes_sent`-th probe before the next one.
    pub fn delay(&self, probes_sent: u32) -> Duration {
        let exp = probes_sent.saturating_sub(1);
        let factor = self.multiplier.max(1).saturating_pow(exp);
        self.initial.saturating_mul(factor).min(self.max)
    }
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max: Duration::from_millis(DEFAULT_MAX_RETRY_INTERVAL_MS),
        }
    }
}

/// Resolved cache configuration, immutable after construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries in the store
    pub capacity: usize,
    /// Maximum packets queued behind one unresolved address
    pub queue_capacity: usize,
    pub reachable_timeout: Duration,
    pub delay_timeout: Duration,
    /// Probes sent before an entry is declared FAILED
    pub max_retries: u32,
    pub retry: RetryBackoff,
    /// How long a FAILED entry answers DROPPED before it is removed
    pub failed_grace: Duration,
    /// Idle time after which a STALE entry is garbage collected
    pub stale_timeout: Duration,
    pub tick_interval: Duration,
    pub tie_break: TieBreak,
    pub static_entries: Vec<(Ipv4Addr, MacAddr)>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            reachable_timeout: Duration::from_secs(DEFAULT_REACHABLE_SECS),
            delay_timeout: Duration::from_secs(DEFAULT_DELAY_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry: RetryBackoff::default(),
            failed_grace: Duration::from_secs(DEFAULT_FAILED_GRACE_SECS),
            stale_timeout: Duration::from_secs(DEFAULT_STALE_SECS),
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            tie_break: TieBreak::default(),
            static_entries: Vec::new(),
        }
    }
}

impl CacheConfig {
    pub fn from_config(config: &ArpConfig) -> Result<Self> {
        let c = &config.cache;
        let defaults = CacheConfig::default();

        let static_entries = config
            .static_entries
            .iter()
            .map(|entry| {
                entry
                    .mac
                    .parse::<MacAddr>()
                    .map(|mac| (entry.address, mac))
                    .map_err(|e| Error::Config(format!("static.{}: {}", entry.address, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CacheConfig {
            capacity: c.capacity.unwrap_or(defaults.capacity),
            queue_capacity: c.queue_capacity.unwrap_or(defaults.queue_capacity),
            reachable_timeout: c
                .reachable_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.reachable_timeout),
            delay_timeout: c
                .delay_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.delay_timeout),
            max_retries: c.max_retries.unwrap_or(defaults.max_retries),
            retry: RetryBackoff {
                initial: c
                    .retry_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.initial),
                multiplier: c.backoff_multiplier.unwrap_or(defaults.retry.multiplier),
                max: c
                    .max_retry_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.max),
            },
            failed_grace: c
                .failed_grace_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.failed_grace),
            stale_timeout: c
                .stale_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.stale_timeout),
            tick_interval: c
                .tick_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            tie_break: c.tie_break.unwrap_or_default(),
            static_entries,
        })
    }
}

impl ArpConfig {
    /// Logging settings, falling back to `LogConfig::new()` defaults
    pub fn log_config(&self) -> LogConfig {
        let mut log = LogConfig::new();
        if let Some(section) = &self.logging {
            if let Some(level) = &section.level {
                log.level = level.clone();
            }
            if let Some(format) = &section.format {
                log.format = format.clone();
            }
        }
        log
    }
}
