//! Print the physical name of every declaration.
//!
//! Created resources get their canonical (or `custom_name`) name. Existing resources
//! are looked up by their parameters and are listed without one.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CliConfig;
use super::common::Workspace;
use crate::naming::resource_name;

/// Arguments of `stackbuild names`.
#[derive(Args, Debug, Default)]
pub struct NamesCommand {}

impl NamesCommand {
    /// Print the names.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let workspace = Workspace::load(config).await?;
        let scope = &workspace.document.scope;
        let width = workspace.document.resources.iter().map(|r| r.name.len()).max().unwrap_or(0);

        for declaration in &workspace.document.resources {
            if declaration.existing {
                println!("{:width$}  {}", declaration.name, "(existing)".dimmed());
                continue;
            }
            let name = resource_name(
                scope,
                &workspace.regions,
                &declaration.name,
                declaration.custom_name.as_deref(),
            )?;
            println!("{:width$}  {}", declaration.name, name);
        }

        Ok(())
    }
}
