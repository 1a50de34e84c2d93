//! Configuration validation

use super::{ArpConfig, CacheConfig, MAX_CAPACITY, MAX_QUEUE_CAPACITY};
use crate::protocol::MacAddr;
use std::collections::HashSet;
use tracing::{error, warn};

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Emit every diagnostic through `tracing`
    pub fn log_diagnostics(&self) {
        for warning in &self.warnings {
            warn!("{}", warning);
        }
        for err in &self.errors {
            error!("{}", err);
        }
    }
}

/// Validate configuration and return warnings/errors
pub fn validate(config: &ArpConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_cache(config, &mut result);
    validate_static(config, &mut result);

    result
}

fn validate_cache(config: &ArpConfig, result: &mut ValidationResult) {
    let c = &config.cache;

    if c.capacity == Some(0) {
        result.error("cache.capacity: must be at least 1");
    }
    if c.queue_capacity == Some(0) {
        result.warn("cache.queue_capacity: 0 rejects every packet sent to an unresolved address");
    }
    if let Some(capacity) = c.capacity.filter(|&n| n > MAX_CAPACITY) {
        result.error(format!(
            "cache.capacity: {} exceeds the limit of {}",
            capacity, MAX_CAPACITY
        ));
    }
    if let Some(queue) = c.queue_capacity.filter(|&n| n > MAX_QUEUE_CAPACITY) {
        result.error(format!(
            "cache.queue_capacity: {} exceeds the limit of {}",
            queue, MAX_QUEUE_CAPACITY
        ));
    }
    if c.max_retries == Some(0) {
        result.error("cache.max_retries: must be at least 1");
    }
    match c.backoff_multiplier {
        Some(0) => result.error("cache.backoff_multiplier: must be at least 1"),
        Some(m) if m > 16 => result.warn(format!(
            "cache.backoff_multiplier: {} grows the retry interval very quickly",
            m
        )),
        _ => {}
    }
    if c.retry_interval_ms == Some(0) || c.tick_interval_ms == Some(0) {
        result.error("cache: retry_interval_ms and tick_interval_ms must be non-zero");
    }

    // Cross-field checks run on the resolved values so defaults count too
    let Ok(resolved) = CacheConfig::from_config(config) else {
        return;
    };
    if resolved.retry.initial > resolved.retry.max {
        result.error(format!(
            "cache.retry_interval_ms: {:?} exceeds max_retry_interval_ms {:?}",
            resolved.retry.initial, resolved.retry.max
        ));
    }
    if resolved.tick_interval > resolved.delay_timeout {
        result.warn(format!(
            "cache.tick_interval_ms: {:?} is longer than delay_timeout {:?}, probes will be late",
            resolved.tick_interval, resolved.delay_timeout
        ));
    }
    if resolved.static_entries.len() > resolved.capacity {
        result.error(format!(
            "static: {} entries do not fit in cache.capacity {}",
            resolved.static_entries.len(),
            resolved.capacity
        ));
    }
}

fn validate_static(config: &ArpConfig, result: &mut ValidationResult) {
    let mut seen = HashSet::new();

    for entry in &config.static_entries {
        if !seen.insert(entry.address) {
            result.error(format!("static.{}: duplicate address", entry.address));
        }
        if entry.address.is_unspecified() || entry.address.is_broadcast() {
            result.error(format!("static.{}: not a unicast address", entry.address));
        }
        match entry.mac.parse::<MacAddr>() {
            Ok(mac) if !mac.is_unicast() => {
                result.error(format!("static.{}: {} is not a unicast MAC", entry.address, mac))
            }
            Ok(_) => {}
            Err(e) => result.error(format!("static.{}: {}", entry.address, e)),
        }
    }
}
