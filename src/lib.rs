//! stackbuild - build infrastructure from a declarative stack document
//!
//! A stack document lists resources in order. For each one, stackbuild:
//!
//! 1. substitutes `secret:<key>` placeholders from a secret provider
//! 2. substitutes `ref:<name>.<attribute>` placeholders from resources built earlier
//! 3. locates the create or lookup implementation for the resource type
//! 4. names the resource `<team>-<service>-<environment>-<region>-<name>` (or uses
//!    its `custom_name`), injects the global tags and region where the kind accepts
//!    them, and calls the provisioning engine
//! 5. registers the resulting handle for later references
//!
//! The first failure aborts the run and names the declaration and stage it failed in.
//!
//! # Modules
//!
//! - [`args`] - argument trees with placeholders parsed into variants, deferred values
//! - [`naming`] - region abbreviations and the naming rule
//! - [`resolver`] - secret and reference resolution
//! - [`provider`] - provisioning traits, the type locator, the in-memory engine
//! - [`build`] - the registry and the build orchestrator
//! - [`config`] - stack document and settings loading
//! - [`cli`] - the `stackbuild` command line
//!
//! # Example
//!
//! ```rust
//! use stackbuild_cli::args::{ArgMap, ArgValue, Reference};
//! use stackbuild_cli::build::Orchestrator;
//! use stackbuild_cli::config::{GlobalScope, ResourceDeclaration};
//! use stackbuild_cli::naming::RegionTable;
//! use stackbuild_cli::provider::memory::MemoryEngine;
//! use stackbuild_cli::resolver::StaticSecretProvider;
//!
//! let scope = GlobalScope::new("platform", "payments", "prod", "eu-west-1");
//! let regions = RegionTable::builtin();
//! let engine = MemoryEngine::new();
//! let locator = engine.catalog();
//! let secrets = StaticSecretProvider::new();
//!
//! let mut subnet_args = ArgMap::new();
//! subnet_args.insert("vpc_id".into(), ArgValue::Reference(Reference::new("vpc-01", "id")));
//!
//! let registry = Orchestrator::new(&scope, &regions, &locator, &secrets)
//!     .build_all([
//!         ResourceDeclaration::new("vpc-01", "ec2.Vpc"),
//!         ResourceDeclaration::new("subnet-01", "ec2.Subnet").with_args(subnet_args),
//!     ])
//!     .unwrap();
//!
//! assert_eq!(
//!     registry.get("vpc-01").unwrap().physical_name(),
//!     "platform-payments-prod-euw1-vpc-01"
//! );
//! ```

pub mod args;
pub mod build;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod naming;
pub mod provider;
pub mod resolver;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
