//! Tool settings (`~/.stackbuild/config.toml`).
//!
//! ```toml
//! secrets_file = "~/.stackbuild/secrets.yaml"
//! secret_env_prefix = "STACKBUILD_SECRET_"
//!
//! [regions]
//! "il-central-1" = "ilc1"
//! ```
//!
//! Every field is optional and a missing file means defaults. `regions` entries extend
//! the built-in abbreviation table and win over it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::constants::{DEFAULT_SECRET_ENV_PREFIX, SETTINGS_DIR_NAME, SETTINGS_FILE_NAME};
use crate::core::StackbuildError;
use crate::naming::RegionTable;
use crate::utils::resolve_path;

/// User-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// YAML file of secret key/value pairs; `~` and `$VAR` are expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets_file: Option<String>,

    /// Prefix of environment variables holding secrets
    #[serde(default = "default_secret_env_prefix")]
    pub secret_env_prefix: String,

    /// Extra region abbreviations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub regions: BTreeMap<String, String>,
}

fn default_secret_env_prefix() -> String {
    DEFAULT_SECRET_ENV_PREFIX.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            secrets_file: None,
            secret_env_prefix: default_secret_env_prefix(),
            regions: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load from `path`, or from [`default_path`](Self::default_path) when `None`.
    ///
    /// A missing file yields [`Settings::default`].
    ///
    /// # Errors
    ///
    /// The file exists but cannot be read or is not valid TOML.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            debug!("No settings file at {}; using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// The file cannot be read or is not valid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings = toml::from_str(&content).map_err(|e| StackbuildError::ConfigError {
            message: format!("invalid settings in {}: {}", path.display(), e),
        })?;
        Ok(settings)
    }

    /// Platform default location.
    ///
    /// - **Unix/macOS**: `~/.stackbuild/config.toml`
    /// - **Windows**: `%LOCALAPPDATA%\stackbuild\config.toml`
    ///
    /// # Errors
    ///
    /// The home (or local data) directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let settings_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("stackbuild")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(SETTINGS_DIR_NAME)
        };

        Ok(settings_dir.join(SETTINGS_FILE_NAME))
    }

    /// Built-in region table with this file's overrides applied.
    #[must_use]
    pub fn region_table(&self) -> RegionTable {
        RegionTable::builtin().with_overrides(&self.regions)
    }

    /// Expanded path of the secrets file, if one is configured.
    ///
    /// # Errors
    ///
    /// Expansion fails, e.g. on an undefined `$VAR`.
    pub fn secrets_path(&self) -> Result<Option<PathBuf>> {
        self.secrets_file.as_deref().map(resolve_path).transpose()
    }
}
