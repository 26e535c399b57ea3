//! Command-line interface for stackbuild.
//!
//! # Available Commands
//!
//! - `build` - build every declaration of the stack document and print the exported ids
//! - `validate` - check the document without provisioning anything
//! - `names` - print the physical name each declaration would get
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - debug logging, including every stage transition
//! - `--quiet` / `-q` - errors only
//! - `--config` / `-c` - settings file (default `~/.stackbuild/config.toml`, or `STACKBUILD_CONFIG`)
//! - `--file` / `-f` - stack document (default `./stackbuild.yaml`)
//!
//! # Examples
//!
//! ```bash
//! stackbuild validate
//! stackbuild -f stacks/prod.yaml build --format json
//! stackbuild --verbose build --secrets-file ./secrets.yaml
//! ```

pub mod build;
mod common;
pub mod names;
pub mod validate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::constants::SETTINGS_ENV_VAR;

/// Options shared by every command, derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter; `None` defers to `RUST_LOG`, then `info`
    pub log_level: Option<String>,
    /// Settings file override
    pub settings_path: Option<PathBuf>,
    /// Stack document override
    pub document_path: Option<PathBuf>,
}

impl CliConfig {
    /// Configuration with every option at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber, writing to stderr.
    ///
    /// Does nothing if a subscriber is already installed.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Build infrastructure from a declarative stack document.
#[derive(Parser, Debug)]
#[command(
    name = "stackbuild",
    about = "Build infrastructure from a declarative stack document",
    version,
    long_about = "stackbuild resolves names, secrets and cross-resource references in a stack document and builds each resource in document order."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging, including every build stage transition
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the settings file
    #[arg(short, long, global = true, env = SETTINGS_ENV_VAR)]
    config: Option<PathBuf>,

    /// Path to the stack document
    #[arg(short = 'f', long = "file", global = true)]
    file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build every resource and print their ids
    Build(build::BuildCommand),
    /// Check the stack document without provisioning
    Validate(validate::ValidateCommand),
    /// Print the physical name of every resource
    Names(names::NamesCommand),
}

impl Cli {
    /// Run the parsed command.
    ///
    /// # Errors
    ///
    /// Whatever the command fails with.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            settings_path: self.config.clone(),
            document_path: self.file.clone(),
        }
    }

    /// Run the command with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Whatever the command fails with.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Build(cmd) => cmd.execute(&config).await,
            Commands::Validate(cmd) => cmd.execute(&config).await,
            Commands::Names(cmd) => cmd.execute(&config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_sets_debug() {
        let cli = Cli::parse_from(["stackbuild", "--verbose", "build"]);
        assert_eq!(cli.build_config().log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_quiet_sets_error() {
        let cli = Cli::parse_from(["stackbuild", "validate", "-q"]);
        assert_eq!(cli.build_config().log_level.as_deref(), Some("error"));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["stackbuild", "-v", "-q", "names"]).is_err());
    }

    #[test]
    fn test_file_and_config_paths() {
        let cli = Cli::parse_from([
            "stackbuild",
            "-f",
            "stack.yaml",
            "--config",
            "settings.toml",
            "build",
            "--format",
            "json",
        ]);
        let config = cli.build_config();
        assert_eq!(config.document_path, Some(PathBuf::from("stack.yaml")));
        assert_eq!(config.settings_path, Some(PathBuf::from("settings.toml")));
        assert!(matches!(cli.command, Commands::Build(_)));
    }
}
