//! Stack document model and loader.
//!
//! A stack document is a YAML file with the global scope at the top level and an
//! ordered list of resource declarations:
//!
//! ```yaml
//! team: platform
//! service: payments
//! environment: prod
//! region: us-east-1
//! tags:
//!   cost-center: "1234"
//! resources:
//!   - name: vpc-01
//!     type: ec2.Vpc
//!     args:
//!       cidr_block: 10.0.0.0/16
//!   - name: subnet-01
//!     type: ec2.Subnet
//!     args:
//!       vpc_id: ref:vpc-01.id
//!   - name: shared-logs
//!     type: s3.Bucket
//!     existing: true
//!     args:
//!       bucket: company-shared-logs
//! ```
//!
//! `aws_resources` is accepted as an alias of `resources`.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;
use tokio::fs;

use crate::args::{ArgMap, ArgValue, Scalar, map_from_yaml};
use crate::constants::EXISTING_PARAM;
use crate::core::StackbuildError;

/// `<category>.<Kind>`, possibly with more dotted segments.
static TYPE_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+(\.[A-Za-z0-9_]+)+$").expect("type identifier pattern is valid")
});

/// Fields shared by every resource in a document. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalScope {
    /// Owning team
    pub team: String,
    /// Service name
    pub service: String,
    /// Environment, e.g. `dev` or `prod`
    pub environment: String,
    /// Full region identifier, e.g. `us-east-1`
    pub region: String,
    /// Tags applied to every resource that supports them
    pub tags: BTreeMap<String, String>,
}

impl GlobalScope {
    /// Scope without tags.
    pub fn new(
        team: impl Into<String>,
        service: impl Into<String>,
        environment: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            team: team.into(),
            service: service.into(),
            environment: environment.into(),
            region: region.into(),
            tags: BTreeMap::new(),
        }
    }
}

/// One entry of the resource list.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDeclaration {
    /// Declared name, unique within the document
    pub name: String,
    /// Dotted type identifier
    pub resource_type: String,
    /// Physical name used verbatim instead of the canonical one
    pub custom_name: Option<String>,
    /// Look the resource up instead of creating it
    pub existing: bool,
    /// Argument tree
    pub args: ArgMap,
}

impl ResourceDeclaration {
    /// Declaration with no arguments.
    pub fn new(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_type: resource_type.into(),
            custom_name: None,
            existing: false,
            args: ArgMap::new(),
        }
    }

    /// Replace the arguments.
    #[must_use]
    pub fn with_args(mut self, args: ArgMap) -> Self {
        self.args = args;
        self
    }
}

/// A loaded and validated stack document.
#[derive(Debug, Clone)]
pub struct StackDocument {
    /// Global scope
    pub scope: GlobalScope,
    /// Declarations in document order
    pub resources: Vec<ResourceDeclaration>,
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    team: String,
    #[serde(default)]
    service: String,
    #[serde(default)]
    environment: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    tags: BTreeMap<String, serde_yaml::Value>,
    #[serde(default, alias = "aws_resources")]
    resources: Vec<RawDeclaration>,
}

#[derive(Deserialize)]
struct RawDeclaration {
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    resource_type: String,
    #[serde(default)]
    custom_name: Option<String>,
    #[serde(default)]
    existing: bool,
    #[serde(default)]
    args: serde_yaml::Mapping,
}

impl StackDocument {
    /// Load and validate the document at `path`.
    ///
    /// # Errors
    ///
    /// - [`StackbuildError::DocumentNotFound`] if the file does not exist
    /// - any error of [`from_yaml_str`](Self::from_yaml_str)
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StackbuildError::DocumentNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read stack document {}", path.display()))?;

        Ok(Self::from_yaml_str(&content, path)?)
    }

    /// Parse and validate document text. `source` is only used in messages.
    ///
    /// # Errors
    ///
    /// - [`StackbuildError::DocumentParseError`] for invalid YAML or a wrong shape
    /// - [`StackbuildError::DocumentValidationError`] for missing fields or bad type identifiers
    /// - [`StackbuildError::DuplicateDeclaration`] for repeated names
    /// - [`StackbuildError::MalformedPlaceholder`] for placeholder strings that do not parse
    pub fn from_yaml_str(content: &str, source: &Path) -> Result<Self, StackbuildError> {
        let raw: RawDocument =
            serde_yaml::from_str(content).map_err(|e| StackbuildError::DocumentParseError {
                file: source.display().to_string(),
                reason: e.to_string(),
            })?;

        for (field, value) in [
            ("team", &raw.team),
            ("service", &raw.service),
            ("environment", &raw.environment),
            ("region", &raw.region),
        ] {
            if value.trim().is_empty() {
                return Err(StackbuildError::DocumentValidationError {
                    reason: format!("missing required field '{field}'"),
                });
            }
        }

        let tags = raw
            .tags
            .into_iter()
            .map(|(key, value)| Ok((key.clone(), tag_value(&key, value)?)))
            .collect::<Result<BTreeMap<_, _>, StackbuildError>>()?;

        let mut seen = HashSet::new();
        let mut resources = Vec::with_capacity(raw.resources.len());
        for (index, declaration) in raw.resources.into_iter().enumerate() {
            let declaration = convert_declaration(index, declaration)?;
            if !seen.insert(declaration.name.clone()) {
                return Err(StackbuildError::DuplicateDeclaration {
                    name: declaration.name,
                });
            }
            resources.push(declaration);
        }

        Ok(Self {
            scope: GlobalScope {
                team: raw.team,
                service: raw.service,
                environment: raw.environment,
                region: raw.region,
                tags,
            },
            resources,
        })
    }
}

fn tag_value(key: &str, value: serde_yaml::Value) -> Result<String, StackbuildError> {
    match value {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        _ => Err(StackbuildError::DocumentValidationError {
            reason: format!("tag '{key}' must be a string, number or boolean"),
        }),
    }
}

fn convert_declaration(
    index: usize,
    raw: RawDeclaration,
) -> Result<ResourceDeclaration, StackbuildError> {
    let name = raw.name.trim().to_string();
    if name.is_empty() {
        return Err(StackbuildError::DocumentValidationError {
            reason: format!("resource #{} has no 'name'", index + 1),
        });
    }

    // `ref:` splits the resource name from the attribute at the first '.'
    if name.contains('.') || name.chars().any(char::is_whitespace) {
        return Err(StackbuildError::DocumentValidationError {
            reason: format!(
                "resource name '{name}' cannot be referenced: names may not contain '.' or whitespace"
            ),
        });
    }

    if !TYPE_ID_PATTERN.is_match(&raw.resource_type) {
        return Err(StackbuildError::DocumentValidationError {
            reason: format!(
                "resource '{name}' has invalid type '{}': expected <category>.<Kind>",
                raw.resource_type
            ),
        });
    }

    let mut args = map_from_yaml(raw.args)?;
    let mut existing = raw.existing;
    if let Some(flag) = args.remove(EXISTING_PARAM) {
        match flag {
            ArgValue::Literal(Scalar::Bool(b)) => existing |= b,
            _ => {
                return Err(StackbuildError::DocumentValidationError {
                    reason: format!("resource '{name}': 'args.existing' must be true or false"),
                });
            }
        }
    }

    Ok(ResourceDeclaration {
        name,
        resource_type: raw.resource_type,
        custom_name: raw.custom_name.filter(|custom| !custom.is_empty()),
        existing,
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Reference;
    use tempfile::TempDir;

    const DOCUMENT: &str = r#"
team: platform
service: payments
environment: prod
region: us-east-1
tags:
  cost-center: 1234
  managed: true
resources:
  - name: vpc-01
    type: ec2.Vpc
    args:
      cidr_block: 10.0.0.0/16
  - name: subnet-01
    type: ec2.Subnet
    custom_name: Legacy-Subnet
    args:
      vpc_id: ref:vpc-01.id
  - name: logs
    type: s3.Bucket
    args:
      existing: true
      bucket: shared-logs
"#;

    fn parse(content: &str) -> Result<StackDocument, StackbuildError> {
        StackDocument::from_yaml_str(content, Path::new("stackbuild.yaml"))
    }

    #[test]
    fn test_parse_document() {
        let document = parse(DOCUMENT).unwrap();

        assert_eq!(document.scope.team, "platform");
        assert_eq!(document.scope.tags["cost-center"], "1234");
        assert_eq!(document.scope.tags["managed"], "true");
        assert_eq!(
            document.resources.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            vec!["vpc-01", "subnet-01", "logs"]
        );

        let subnet = &document.resources[1];
        assert_eq!(subnet.custom_name.as_deref(), Some("Legacy-Subnet"));
        assert_eq!(subnet.args["vpc_id"], ArgValue::Reference(Reference::new("vpc-01", "id")));
    }

    #[test]
    fn test_existing_inside_args_is_lifted() {
        let document = parse(DOCUMENT).unwrap();
        let logs = &document.resources[2];
        assert!(logs.existing);
        assert!(!logs.args.contains_key("existing"));
        assert_eq!(logs.args["bucket"], ArgValue::string("shared-logs"));
    }

    #[test]
    fn test_aws_resources_alias() {
        let document = parse(
            "team: t\nservice: s\nenvironment: e\nregion: us-east-1\naws_resources:\n  - name: a\n    type: ec2.Vpc\n",
        )
        .unwrap();
        assert_eq!(document.resources.len(), 1);
    }

    #[test]
    fn test_missing_scope_field() {
        let err = parse("team: t\nservice: s\nregion: us-east-1\n").unwrap_err();
        assert!(
            matches!(err, StackbuildError::DocumentValidationError { ref reason } if reason.contains("environment"))
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = parse(
            "team: t\nservice: s\nenvironment: e\nregion: r\nresources:\n  - {name: a, type: ec2.Vpc}\n  - {name: a, type: ec2.Subnet}\n",
        )
        .unwrap_err();
        assert!(matches!(err, StackbuildError::DuplicateDeclaration { ref name } if name == "a"));
    }

    #[test]
    fn test_invalid_type_identifier() {
        let err = parse(
            "team: t\nservice: s\nenvironment: e\nregion: r\nresources:\n  - {name: a, type: Vpc}\n",
        )
        .unwrap_err();
        assert!(matches!(err, StackbuildError::DocumentValidationError { .. }));
    }

    #[test]
    fn test_unreferenceable_names_rejected() {
        for name in ["db.primary", "'db primary'"] {
            let err = parse(&format!(
                "team: t\nservice: s\nenvironment: e\nregion: r\nresources:\n  - {{name: {name}, type: rds.Instance}}\n"
            ))
            .unwrap_err();
            assert!(
                matches!(&err, StackbuildError::DocumentValidationError { reason } if reason.contains("cannot be referenced")),
                "{name}: {err:?}"
            );
        }
    }

    #[test]
    fn test_malformed_placeholder_rejected_at_load() {
        let err = parse(
            "team: t\nservice: s\nenvironment: e\nregion: r\nresources:\n  - name: a\n    type: ec2.Vpc\n    args: {x: 'secret:'}\n",
        )
        .unwrap_err();
        assert!(matches!(err, StackbuildError::MalformedPlaceholder { .. }));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = parse("team: [unclosed").unwrap_err();
        assert!(matches!(err, StackbuildError::DocumentParseError { .. }));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stackbuild.yaml");
        std::fs::write(&path, DOCUMENT).unwrap();

        let document = StackDocument::load(&path).await.unwrap();
        assert_eq!(document.resources.len(), 3);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = StackDocument::load(&temp.path().join("absent.yaml")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StackbuildError>(),
            Some(StackbuildError::DocumentNotFound { .. })
        ));
    }
}
