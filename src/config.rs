//! Directory configuration

use crate::error::{DirectoryError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay before a freshly published router is worth fetching (seconds)
pub const DEFAULT_DESCRIPTOR_DOWNLOAD_DELAY_SECS: u64 = 10 * 60;

/// Default number of authority signatures a consensus needs
pub const DEFAULT_MIN_AUTHORITY_SIGNATURES: usize = 5;

/// Configuration for the directory state manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Upper bound for `wait_until_loaded_timeout_default` (None = unbounded)
    pub bootstrap_timeout_secs: Option<u64>,

    /// Routers published more recently than this are not downloadable yet
    pub descriptor_download_delay_secs: u64,

    /// Signatures required by `NetworkStatus` verification
    pub min_authority_signatures: usize,

    /// Fixed seed for the directory RNG (tests and simulations)
    pub rng_seed: Option<u64>,

    /// Whether `router_list_by_names` fails on the first unknown name
    pub strict_name_lookup: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            bootstrap_timeout_secs: None,
            descriptor_download_delay_secs: DEFAULT_DESCRIPTOR_DOWNLOAD_DELAY_SECS,
            min_authority_signatures: DEFAULT_MIN_AUTHORITY_SIGNATURES,
            rng_seed: None,
            strict_name_lookup: true,
        }
    }
}

impl DirectoryConfig {
    /// Parse a configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DirectoryError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Create config with a deterministic RNG seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng_seed: Some(seed),
            ..Default::default()
        }
    }

    /// Bootstrap wait bound, if any
    pub fn bootstrap_timeout(&self) -> Option<Duration> {
        self.bootstrap_timeout_secs.map(Duration::from_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.min_authority_signatures == 0 {
            return Err(DirectoryError::Config(
                "min_authority_signatures must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
