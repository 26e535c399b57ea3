//! Check a stack document without provisioning anything.
//!
//! On top of the checks done while loading (required fields, unique names, type
//! identifier shape, placeholder grammar) this verifies:
//!
//! - the region has an abbreviation
//! - every type is known to the engine in the mode the declaration asks for
//! - lookups have their identifying parameters
//! - every `ref:` names a resource declared above it
//!
//! Common problems that the build would silently work around are reported as warnings.
//!
//! ```bash
//! stackbuild validate
//! stackbuild validate --json
//! ```

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::collections::HashSet;

use super::CliConfig;
use super::common::Workspace;
use crate::build::lookup_parameters;
use crate::config::StackDocument;
use crate::constants::TAGS_PARAM;
use crate::naming::RegionTable;
use crate::provider::memory::MemoryEngine;
use crate::provider::{BuildMode, Implementation, TypeLocator};
use crate::utils::suggest_similar;

/// Arguments of `stackbuild validate`.
#[derive(Args, Debug, Default)]
pub struct ValidateCommand {
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

/// Outcome of validating a document.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct ValidationReport {
    /// No errors were found
    pub valid: bool,
    /// Number of declarations
    pub resources: usize,
    /// Problems that would fail the build
    pub errors: Vec<String>,
    /// Problems the build works around
    pub warnings: Vec<String>,
}

impl ValidateCommand {
    /// Run the validation.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let workspace = Workspace::load(config).await?;
        let locator = MemoryEngine::new().catalog();
        let report = validate_document(&workspace.document, &workspace.regions, &locator);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            for error in &report.errors {
                println!("{} {}", "✗".red(), error);
            }
            for warning in &report.warnings {
                println!("{} {}", "⚠".yellow(), warning);
            }
            if report.valid {
                println!(
                    "{} {} is valid ({} resources)",
                    "✓".green(),
                    workspace.document_path.display(),
                    report.resources
                );
            }
        }

        if !report.valid {
            bail!("Validation failed with {} error(s)", report.errors.len());
        }
        Ok(())
    }
}

/// Run every static check against `document`.
#[must_use]
pub fn validate_document(
    document: &StackDocument,
    regions: &RegionTable,
    locator: &TypeLocator,
) -> ValidationReport {
    let mut report = ValidationReport {
        resources: document.resources.len(),
        ..ValidationReport::default()
    };

    if !regions.contains(&document.scope.region) {
        report.errors.push(format!(
            "Region '{}' has no abbreviation; add it under [regions] in the settings file",
            document.scope.region
        ));
    }

    let all_names: HashSet<&str> = document.resources.iter().map(|r| r.name.as_str()).collect();
    let mut declared_above: Vec<&str> = Vec::new();

    for declaration in &document.resources {
        let name = &declaration.name;
        let mode = BuildMode::for_existing(declaration.existing);

        match locator.locate(&declaration.resource_type, mode) {
            Err(e) => report.errors.push(format!("{name}: {e}")),
            Ok(Implementation::Lookup(lookup)) => {
                if let Err(e) = lookup_parameters(
                    &declaration.resource_type,
                    &lookup.required_params(),
                    &declaration.args,
                ) {
                    report.errors.push(format!("{name}: {e}"));
                }
            }
            Ok(Implementation::Create(factory)) => {
                if !factory.capabilities().tags && declaration.args.contains_key(TAGS_PARAM) {
                    report.warnings.push(format!(
                        "{name}: {} does not support tags; 'tags' will be ignored",
                        declaration.resource_type
                    ));
                }
            }
        }

        if declaration.existing && declaration.custom_name.is_some() {
            report
                .warnings
                .push(format!("{name}: 'custom_name' has no effect on an existing resource"));
        }

        for reference in declaration.args.values().flat_map(|value| value.references()) {
            let target = reference.resource.as_str();
            if declared_above.contains(&target) {
                continue;
            }
            let problem = if target == name {
                format!("{name}: '{reference}' refers to the resource itself")
            } else if all_names.contains(target) {
                format!("{name}: '{reference}' refers to '{target}', which is declared below it")
            } else {
                let suggestions = suggest_similar(target, declared_above.iter().copied());
                if suggestions.is_empty() {
                    format!("{name}: '{reference}' refers to undeclared resource '{target}'")
                } else {
                    format!(
                        "{name}: '{reference}' refers to undeclared resource '{target}' (did you mean {}?)",
                        suggestions.join(", ")
                    )
                }
            };
            report.errors.push(problem);
        }

        declared_above.push(name);
    }

    report.valid = report.errors.is_empty();
    report
}
