//! Loading shared by the commands.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::CliConfig;
use crate::config::{Settings, StackDocument};
use crate::constants::DEFAULT_DOCUMENT_NAME;
use crate::naming::RegionTable;
use crate::resolver::{ChainedSecretProvider, EnvSecretProvider, FileSecretProvider};

/// Everything a command needs before it starts.
pub struct Workspace {
    pub document_path: PathBuf,
    pub document: StackDocument,
    pub settings: Settings,
    pub regions: RegionTable,
}

impl Workspace {
    /// Load the settings and the stack document named by `config`.
    pub async fn load(config: &CliConfig) -> Result<Self> {
        let settings = Settings::load_with_optional(config.settings_path.clone()).await?;
        let document_path = match &config.document_path {
            Some(path) => path.clone(),
            None => std::env::current_dir()
                .context("Failed to determine current directory")?
                .join(DEFAULT_DOCUMENT_NAME),
        };

        debug!("Loading stack document {}", document_path.display());
        let document = StackDocument::load(&document_path).await?;
        let regions = settings.region_table();
        debug!("Region table has {} entries", regions.len());

        Ok(Self {
            document_path,
            document,
            settings,
            regions,
        })
    }
}

/// Environment variables first, then the secrets file if one is configured.
///
/// `override_file` replaces the file named in the settings.
pub async fn secret_provider(
    settings: &Settings,
    override_file: Option<&Path>,
) -> Result<ChainedSecretProvider> {
    let mut provider =
        ChainedSecretProvider::new().with(EnvSecretProvider::new(settings.secret_env_prefix.clone()));

    let file = match override_file {
        Some(path) => Some(path.to_path_buf()),
        None => settings.secrets_path()?,
    };

    if let Some(path) = file {
        debug!("Reading secrets from {}", path.display());
        provider = provider.with(FileSecretProvider::load(&path).await?);
    }

    Ok(provider)
}
