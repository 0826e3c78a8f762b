//! Engine configuration, loadable from a TOML file.
//!
//! ```toml
//! data_dir = ".orgweave"
//!
//! [ownership]
//! max_depth = 10
//! min_effective_bps = 100
//! max_paths = 100000
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{EngineError, OrgResult};

/// Default hard bound on ownership chain length.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Default reporting floor for effective ownership (1.00%).
pub const DEFAULT_MIN_EFFECTIVE_BPS: u32 = 100;

/// Default cap on the number of chains a single resolution may expand.
pub const DEFAULT_MAX_PATHS: usize = 100_000;

/// Configuration for the orgweave engine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Data directory for persistence. `None` for memory-only mode.
    pub data_dir: Option<PathBuf>,
    /// Ownership resolution settings.
    pub ownership: OwnershipConfig,
}

/// Settings for effective-ownership resolution.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct OwnershipConfig {
    /// Chains longer than this are cut off. Must be at least 1.
    pub max_depth: usize,
    /// Paths below this many basis points are not reported.
    pub min_effective_bps: u32,
    /// Stop expanding after this many chains, even below `max_depth`.
    pub max_paths: usize,
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            min_effective_bps: DEFAULT_MIN_EFFECTIVE_BPS,
            max_paths: DEFAULT_MAX_PATHS,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> OrgResult<Self> {
        let config: EngineConfig = toml::from_str(text).map_err(|e| EngineError::InvalidConfig {
            message: format!("failed to parse TOML: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_toml_file(path: &Path) -> OrgResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject settings the resolvers cannot honour.
    pub fn validate(&self) -> OrgResult<()> {
        if self.ownership.max_depth == 0 {
            return Err(EngineError::InvalidConfig {
                message: "ownership.max_depth must be > 0".into(),
            }
            .into());
        }
        if self.ownership.min_effective_bps > 10_000 {
            return Err(EngineError::InvalidConfig {
                message: format!(
                    "ownership.min_effective_bps must be <= 10000, got {}",
                    self.ownership.min_effective_bps
                ),
            }
            .into());
        }
        if self.ownership.max_paths == 0 {
            return Err(EngineError::InvalidConfig {
                message: "ownership.max_paths must be > 0".into(),
            }
            .into());
        }
        Ok(())
    }
}
