//! Provisioning capabilities.
//!
//! The build core does not know any concrete resource kind. It talks to the
//! provisioning engine through two small traits, registered per dotted type
//! identifier in a [`TypeLocator`]:
//!
//! - [`ResourceFactory`] - create a resource from a name and an argument mapping
//! - [`ResourceLookup`] - find an existing resource from identifying parameters
//!
//! Each implementation reports a [`CapabilitySet`] saying which common parameters
//! (global tags, region) it accepts. A new resource kind only needs an implementation
//! and a registration; the orchestrator does not change.
//!
//! [`memory::MemoryEngine`] is the engine shipped with the CLI. It records what would
//! be provisioned and hands out identifiers as [`Deferred`](crate::args::Deferred)
//! values that complete when the engine is applied.

mod handle;
mod locator;
pub mod memory;

pub use handle::{HandleOrigin, ResourceHandle, ResourceHandleBuilder};
pub use locator::{BuildMode, Implementation, TypeLocator};

use crate::args::ArgMap;

/// Optional common parameters a resource kind accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    /// Accepts a `tags` mapping
    pub tags: bool,
    /// Accepts a per-resource `region`
    pub region: bool,
}

impl CapabilitySet {
    /// Accepts neither tags nor region.
    pub const NONE: Self = Self {
        tags: false,
        region: false,
    };

    /// Accepts tags only.
    pub const TAGS: Self = Self {
        tags: true,
        region: false,
    };

    /// Accepts tags and region.
    pub const TAGS_AND_REGION: Self = Self {
        tags: true,
        region: true,
    };
}

/// Creates resources of one kind.
pub trait ResourceFactory: Send + Sync {
    /// Common parameters the kind accepts.
    fn capabilities(&self) -> CapabilitySet;

    /// Provision a resource named `name` from fully resolved `args`.
    ///
    /// # Errors
    ///
    /// Any failure reported by the provisioning engine.
    fn create(&self, name: &str, args: ArgMap) -> anyhow::Result<ResourceHandle>;
}

/// Finds existing resources of one kind.
pub trait ResourceLookup: Send + Sync {
    /// Parameters the lookup requires, in the provider's own (camelCase) spelling.
    fn required_params(&self) -> Vec<String>;

    /// Common parameters the lookup accepts.
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::NONE
    }

    /// Look up the resource identified by `params`.
    ///
    /// # Errors
    ///
    /// Any failure reported by the provisioning engine, including "not found".
    fn lookup(&self, params: ArgMap) -> anyhow::Result<ResourceHandle>;
}
