//! Runtime configuration.
//!
//! Configuration is loaded from a TOML file. The path is taken from the
//! `COOL_CONFIG` environment variable, falling back to
//! `/etc/cool/cool.toml`. A missing default file is not an error.
//!
//! ```toml
//! [rank]
//! omxh264dec = 288
//! fakevdec = 0
//!
//! [decode]
//! in_size = 4
//! out_size = 8
//! ```

use crate::error::{Error, Result};
use crate::registry::{FactoryRegistry, Rank};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV: &str = "COOL_CONFIG";

/// Path used when `COOL_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cool/cool.toml";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoolConfig {
    /// Factory name to rank overrides
    #[serde(default)]
    pub rank: BTreeMap<String, u32>,

    /// Decoder buffering
    #[serde(default)]
    pub decode: DecodeConfig,
}

/// Decoder buffering configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Input buffers handed to real decoders (`input-buffers` property)
    #[serde(default)]
    pub in_size: Option<u32>,

    /// Output buffers handed to real decoders (`output-buffers` property)
    #[serde(default)]
    pub out_size: Option<u32>,
}

impl CoolConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), ranks = config.rank.len(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration from `COOL_CONFIG` or the default path.
    ///
    /// An explicitly named file must exist; a missing default file
    /// yields the default configuration.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(PathBuf::from(path)),
            None => Self::load_or_default(DEFAULT_CONFIG_PATH),
        }
    }

    /// Load a file, returning defaults if it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Apply `[rank]` overrides to a registry.
    ///
    /// Factories that are not registered are skipped. Returns the number
    /// of overrides applied.
    pub fn apply_ranks(&self, registry: &FactoryRegistry) -> usize {
        let mut applied = 0;
        for (name, rank) in &self.rank {
            if !registry.has_factory(name) {
                tracing::info!(factory = %name, rank, "unable to set rank, factory not registered");
                continue;
            }
            registry.set_rank(name.clone(), Rank(*rank));
            applied += 1;
        }
        applied
    }

    /// Validate value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.decode.in_size == Some(0) {
            return Err(Error::Config("decode.in_size must be positive".into()));
        }
        if self.decode.out_size == Some(0) {
            return Err(Error::Config("decode.out_size must be positive".into()));
        }
        Ok(())
    }
}
