//! Resource type locator.
//!
//! Maps dotted type identifiers (`ec2.Vpc`) to the implementation that builds them.
//! The two tables are independent: a kind may be creatable, look-up-able, or both.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use super::{CapabilitySet, ResourceFactory, ResourceLookup};
use crate::core::StackbuildError;
use crate::utils::suggest_similar;

/// Whether a declaration is created or looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Provision a new resource
    Create,
    /// Find an existing resource (`existing: true`)
    Lookup,
}

impl BuildMode {
    /// Mode for a declaration's `existing` flag.
    #[must_use]
    pub const fn for_existing(existing: bool) -> Self {
        if existing { Self::Lookup } else { Self::Create }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Lookup => "lookup",
        })
    }
}

/// The implementation selected for one declaration.
#[derive(Clone, Copy)]
pub enum Implementation<'a> {
    /// Create path
    Create(&'a dyn ResourceFactory),
    /// Lookup path
    Lookup(&'a dyn ResourceLookup),
}

impl Implementation<'_> {
    /// Capabilities of the selected implementation.
    #[must_use]
    pub fn capabilities(&self) -> CapabilitySet {
        match self {
            Self::Create(factory) => factory.capabilities(),
            Self::Lookup(lookup) => lookup.capabilities(),
        }
    }

    /// Mode of the selected implementation.
    #[must_use]
    pub const fn mode(&self) -> BuildMode {
        match self {
            Self::Create(_) => BuildMode::Create,
            Self::Lookup(_) => BuildMode::Lookup,
        }
    }
}

/// Registry of provisioning implementations, populated once at startup.
#[derive(Default, Clone)]
pub struct TypeLocator {
    factories: BTreeMap<String, Arc<dyn ResourceFactory>>,
    lookups: BTreeMap<String, Arc<dyn ResourceLookup>>,
}

impl TypeLocator {
    /// Locator with no registered kinds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the create path for `resource_type`, replacing any earlier one.
    pub fn register_factory(
        &mut self,
        resource_type: impl Into<String>,
        factory: impl ResourceFactory + 'static,
    ) -> &mut Self {
        self.factories.insert(resource_type.into(), Arc::new(factory));
        self
    }

    /// Register the lookup path for `resource_type`, replacing any earlier one.
    pub fn register_lookup(
        &mut self,
        resource_type: impl Into<String>,
        lookup: impl ResourceLookup + 'static,
    ) -> &mut Self {
        self.lookups.insert(resource_type.into(), Arc::new(lookup));
        self
    }

    /// Implementation for `resource_type` in `mode`.
    ///
    /// A lookup never falls back to the create path, and vice versa.
    ///
    /// # Errors
    ///
    /// [`StackbuildError::UnknownResourceType`] when nothing is registered for the type in
    /// that mode.
    pub fn locate(
        &self,
        resource_type: &str,
        mode: BuildMode,
    ) -> Result<Implementation<'_>, StackbuildError> {
        let found = match mode {
            BuildMode::Create => {
                self.factories.get(resource_type).map(|f| Implementation::Create(f.as_ref()))
            }
            BuildMode::Lookup => {
                self.lookups.get(resource_type).map(|l| Implementation::Lookup(l.as_ref()))
            }
        };

        match found {
            Some(implementation) => {
                trace!("Located {} implementation for '{}'", mode, resource_type);
                Ok(implementation)
            }
            None => Err(StackbuildError::UnknownResourceType {
                resource_type: resource_type.to_string(),
                mode: mode.to_string(),
                suggestions: suggest_similar(resource_type, self.types_for(mode)),
            }),
        }
    }

    /// Whether `resource_type` can be built in `mode`.
    #[must_use]
    pub fn supports(&self, resource_type: &str, mode: BuildMode) -> bool {
        match mode {
            BuildMode::Create => self.factories.contains_key(resource_type),
            BuildMode::Lookup => self.lookups.contains_key(resource_type),
        }
    }

    /// Type identifiers registered for `mode`, sorted.
    pub fn types_for(&self, mode: BuildMode) -> Box<dyn Iterator<Item = &str> + '_> {
        match mode {
            BuildMode::Create => Box::new(self.factories.keys().map(String::as_str)),
            BuildMode::Lookup => Box::new(self.lookups.keys().map(String::as_str)),
        }
    }

    /// Every registered type identifier, sorted and deduplicated.
    #[must_use]
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .factories
            .keys()
            .chain(self.lookups.keys())
            .map(String::as_str)
            .collect();
        types.sort_unstable();
        types.dedup();
        types
    }
}

impl fmt::Debug for TypeLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeLocator")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .field("lookups", &self.lookups.keys().collect::<Vec<_>>())
            .finish()
    }
}
