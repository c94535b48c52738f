//! Configuration for cloudhook.
//!
//! Config priority: explicit path > `CLOUDHOOK_CONFIG` env var > built-in defaults.
//! Every section is optional in the TOML file; missing keys take their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Operation limit the platform enforces on a single batch write call.
pub const DEFAULT_BATCH_LIMIT: usize = 50;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "CLOUDHOOK_CONFIG";

// ============================================================================
// Batch Configuration
// ============================================================================

/// Batch write settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
  /// Maximum operations per batch write call (default: 50)
  pub limit: usize,
}

impl Default for BatchConfig {
  fn default() -> Self {
    Self {
      limit: DEFAULT_BATCH_LIMIT,
    }
  }
}

// ============================================================================
// Hydration Configuration
// ============================================================================

/// User hydration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrationConfig {
  /// Upper bound on a single fetch-by-id round trip, in seconds (default: 30)
  pub fetch_timeout_secs: u64,

  /// Send the hook user's session token with the fetch when the request
  /// was not made with the primary key (default: true)
  pub forward_session_token: bool,
}

impl Default for HydrationConfig {
  fn default() -> Self {
    Self {
      fetch_timeout_secs: 30,
      forward_session_token: true,
    }
  }
}

impl HydrationConfig {
  pub fn fetch_timeout(&self) -> Duration {
    Duration::from_secs(self.fetch_timeout_secs)
  }
}

// ============================================================================
// Root Configuration
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
  /// Batch write settings
  #[serde(default)]
  pub batch: BatchConfig,

  /// User hydration settings
  #[serde(default)]
  pub hydration: HydrationConfig,
}

impl Config {
  /// Parse and validate a TOML document.
  pub fn from_toml_str(content: &str) -> Result<Self> {
    let config: Config = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  /// Load and validate the config file at `path`.
  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)
      .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
    Self::from_toml_str(&content)
  }

  /// Load the config file at `path`, falling back to defaults when it is
  /// missing or invalid.
  pub fn load_or_default(path: &Path) -> Self {
    if !path.exists() {
      debug!("No config at {}, using defaults", path.display());
      return Self::default();
    }

    match Self::load(path) {
      Ok(config) => config,
      Err(e) => {
        warn!("Ignoring config at {}: {}", path.display(), e);
        Self::default()
      }
    }
  }

  /// Path named by `CLOUDHOOK_CONFIG`, if set.
  pub fn config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from)
  }

  /// Load from `CLOUDHOOK_CONFIG`, or defaults when unset.
  pub fn load_from_env() -> Self {
    match Self::config_path() {
      Some(path) => Self::load_or_default(&path),
      None => Self::default(),
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.batch.limit == 0 {
      return Err(Error::Config("batch.limit must be >= 1".into()));
    }
    if self.hydration.fetch_timeout_secs == 0 {
      return Err(Error::Config("hydration.fetch_timeout_secs must be >= 1".into()));
    }
    Ok(())
  }
}
