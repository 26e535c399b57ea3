//! Resource naming.
//!
//! Every provisioned resource gets a fully-qualified name derived from the
//! document's global scope and the declaration's own name:
//!
//! ```text
//! <team>-<service>-<environment>-<region abbreviation>-<declared name>
//! ```
//!
//! lower-cased and joined with single hyphens. A declaration may instead carry a
//! `custom_name`, which is used verbatim; the author is responsible for meeting the
//! provider's naming restrictions in that case.
//!
//! # Examples
//!
//! ```rust
//! use stackbuild_cli::config::GlobalScope;
//! use stackbuild_cli::naming::{resource_name, RegionTable};
//!
//! let scope = GlobalScope::new("Platform", "payments", "prod", "us-east-1");
//! let regions = RegionTable::builtin();
//!
//! let name = resource_name(&scope, &regions, "vpc-01", None).unwrap();
//! assert_eq!(name, "platform-payments-prod-use1-vpc-01");
//!
//! let custom = resource_name(&scope, &regions, "vpc-01", Some("Legacy_VPC")).unwrap();
//! assert_eq!(custom, "Legacy_VPC");
//! ```

mod regions;

pub use regions::{REGION_ABBREVIATIONS, RegionTable};

use crate::config::GlobalScope;
use crate::core::StackbuildError;

/// Compute the name a declaration is provisioned under.
///
/// Returns `custom_name` unchanged when present, regardless of the scope. Otherwise
/// joins the scope fields, the region's abbreviation and `declared_name`.
///
/// # Errors
///
/// [`StackbuildError::UnknownRegion`] when no override is given and the scope's region
/// has no entry in `regions`.
pub fn resource_name(
    scope: &GlobalScope,
    regions: &RegionTable,
    declared_name: &str,
    custom_name: Option<&str>,
) -> Result<String, StackbuildError> {
    if let Some(custom) = custom_name {
        return Ok(custom.to_string());
    }

    let prefix = name_prefix(scope, regions)?;
    Ok(format!("{prefix}-{declared_name}").to_lowercase())
}

/// The `<team>-<service>-<environment>-<region abbreviation>` part shared by every
/// canonical name in a document.
///
/// # Errors
///
/// [`StackbuildError::UnknownRegion`] when the scope's region is not in `regions`.
pub fn name_prefix(scope: &GlobalScope, regions: &RegionTable) -> Result<String, StackbuildError> {
    let region_abbr = regions.abbreviation(&scope.region).ok_or_else(|| {
        StackbuildError::UnknownRegion {
            region: scope.region.clone(),
        }
    })?;

    Ok([scope.team.trim(), scope.service.trim(), scope.environment.trim(), region_abbr]
        .join("-")
        .to_lowercase())
}
