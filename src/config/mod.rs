//! Configuration management
//!
//! `ArpConfig` mirrors the TOML file with every field optional;
//! `CacheConfig` is the resolved form with all defaults filled in.

mod types;
mod validation;

pub use types::*;
pub use validation::{validate, ValidationResult};

use crate::{Error, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load<P: AsRef<Path>>(path: P) -> Result<ArpConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

/// Parse configuration from TOML text
pub fn parse(content: &str) -> Result<ArpConfig> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}
