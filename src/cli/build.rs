//! Build every resource of a stack document.
//!
//! Resources are built in document order with the in-memory provisioning engine.
//! Once every declaration is registered the engine is applied, and each resource's
//! `id` is exported:
//!
//! ```text
//! NAME        TYPE        ORIGIN    ID
//! vpc-01      ec2.Vpc     created   vpc-00000000000000001
//! subnet-01   ec2.Subnet  created   subnet-00000000000000002
//! ```
//!
//! An id that cannot be produced is reported as a warning; the remaining exports are
//! still printed.

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

use super::CliConfig;
use super::common::{Workspace, secret_provider};
use crate::args::ArgValue;
use crate::build::{Orchestrator, Registry};
use crate::provider::HandleOrigin;
use crate::provider::memory::MemoryEngine;

/// Output format for the exports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns
    #[default]
    Table,
    /// JSON document
    Json,
}

/// Arguments of `stackbuild build`.
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Output format for the exported ids
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Secrets file to use instead of the one in the settings
    #[arg(long)]
    secrets_file: Option<PathBuf>,
}

/// One exported resource.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Export {
    /// Declared name
    pub name: String,
    /// Type identifier
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Physical name
    pub physical_name: String,
    /// `created` or `existing`
    pub origin: &'static str,
    /// Resolved id, if it could be produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Why the id is missing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BuildCommand {
    /// Run the build.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let workspace = Workspace::load(config).await?;
        let secrets = secret_provider(&workspace.settings, self.secrets_file.as_deref()).await?;

        let engine = MemoryEngine::new();
        let locator = engine.catalog();
        let registry =
            Orchestrator::new(&workspace.document.scope, &workspace.regions, &locator, &secrets)
                .build_all(workspace.document.resources)?;

        engine.apply();
        let exports = collect_exports(&registry).await;

        for export in &exports {
            if let Some(error) = &export.error {
                eprintln!("{} {}: {}", "warning:".yellow().bold(), export.name, error);
            }
        }

        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "resources": exports });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Table => print_table(&exports),
        }

        Ok(())
    }
}

/// Resolve the `id` of every registered resource, in declaration order.
///
/// Awaits deferred ids, so the engine must have been applied first.
pub async fn collect_exports(registry: &Registry) -> Vec<Export> {
    let mut exports = Vec::with_capacity(registry.len());

    for (name, handle) in registry.iter() {
        let (id, error) = match handle.id() {
            Some(ArgValue::Deferred(deferred)) => match deferred.resolve().await {
                Ok(value) => (Some(value.to_string()), None),
                Err(e) => (None, Some(e.to_string())),
            },
            Some(ArgValue::Literal(value)) => (Some(value.to_string()), None),
            Some(_) => (None, Some("'id' is not a scalar value".to_string())),
            None => (None, Some("resource exposes no 'id' attribute".to_string())),
        };

        if let Some(error) = &error {
            warn!("Could not export '{}': {}", name, error);
        }

        exports.push(Export {
            name: name.to_string(),
            resource_type: handle.resource_type().to_string(),
            physical_name: handle.physical_name().to_string(),
            origin: match handle.origin() {
                HandleOrigin::Created => "created",
                HandleOrigin::LookedUp => "existing",
            },
            id,
            error,
        });
    }

    exports
}

fn print_table(exports: &[Export]) {
    if exports.is_empty() {
        println!("No resources declared");
        return;
    }

    let name_width = column_width(exports.iter().map(|e| e.name.as_str()), "NAME");
    let type_width = column_width(exports.iter().map(|e| e.resource_type.as_str()), "TYPE");
    let origin_width = column_width(exports.iter().map(|e| e.origin), "ORIGIN");

    println!(
        "{}",
        format!("{:name_width$}  {:type_width$}  {:origin_width$}  ID", "NAME", "TYPE", "ORIGIN")
            .bold()
    );
    for export in exports {
        let id = match &export.id {
            Some(id) => id.green().to_string(),
            None => "-".dimmed().to_string(),
        };
        println!(
            "{:name_width$}  {:type_width$}  {:origin_width$}  {}",
            export.name, export.resource_type, export.origin, id
        );
    }
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>, header: &str) -> usize {
    values.map(str::len).fold(header.len(), usize::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{Deferred, DeferredError, Scalar};
    use crate::provider::ResourceHandle;

    #[tokio::test]
    async fn test_export_failure_does_not_stop_listing() {
        let mut registry = Registry::new();
        let failing = Deferred::new("broken.id", async {
            Err(DeferredError {
                label: "broken.id".to_string(),
                reason: "engine failed".to_string(),
            })
        });
        registry
            .insert("broken", ResourceHandle::builder("ec2.Vpc", "b").attribute("id", failing).build())
            .unwrap();
        registry
            .insert(
                "ok",
                ResourceHandle::builder("s3.Bucket", "o")
                    .attribute("id", Deferred::ready("ok.id", Scalar::from("o")))
                    .build(),
            )
            .unwrap();
        registry.insert("no-id", ResourceHandle::builder("iam.Role", "r").build()).unwrap();

        let exports = collect_exports(&registry).await;
        assert_eq!(exports.len(), 3);
        assert!(exports[0].error.as_deref().unwrap().contains("engine failed"));
        assert_eq!(exports[1].id.as_deref(), Some("o"));
        assert!(exports[2].id.is_none());
        assert!(exports[2].error.is_some());
    }
}
