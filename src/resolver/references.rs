//! Reference resolution.
//!
//! `ref:<name>.<attribute>` placeholders are replaced by the attribute of the handle
//! registered under `name`. The registry only ever holds declarations that appear
//! earlier in the document and have finished building, so forward references, self
//! references and typos all fail the same way, with
//! [`StackbuildError::UnresolvedReference`].
//!
//! The attribute is copied as-is. If the provisioning engine has not produced it yet
//! it is an [`ArgValue::Deferred`], and it stays deferred: resolution never waits.

use tracing::trace;

use crate::args::{ArgMap, ArgValue, Reference};
use crate::build::Registry;
use crate::core::StackbuildError;
use crate::utils::suggest_similar;

/// Replaces `ref:` placeholders using a read-only view of the registry.
pub struct ReferenceResolver<'a> {
    registry: &'a Registry,
}

impl<'a> ReferenceResolver<'a> {
    /// Resolver over `registry`.
    #[must_use]
    pub const fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
        }
    }

    /// Value of a single reference.
    ///
    /// # Errors
    ///
    /// - [`StackbuildError::UnresolvedReference`] when nothing is registered under the name
    /// - [`StackbuildError::MissingAttribute`] when the handle lacks the attribute
    pub fn lookup(&self, reference: &Reference) -> Result<ArgValue, StackbuildError> {
        let handle = self.registry.get(&reference.resource).ok_or_else(|| {
            StackbuildError::UnresolvedReference {
                resource: reference.resource.clone(),
                attribute: reference.attribute.clone(),
                suggestions: suggest_similar(&reference.resource, self.registry.names()),
            }
        })?;

        let value = handle.attribute(&reference.attribute).ok_or_else(|| {
            StackbuildError::MissingAttribute {
                resource: reference.resource.clone(),
                attribute: reference.attribute.clone(),
                available: handle.attribute_names().map(str::to_string).collect(),
            }
        })?;

        trace!("Resolved {} to {:?}", reference, value);
        Ok(value.clone())
    }

    /// Replace every `ref:` leaf in `value`, depth-first. Other nodes are rebuilt unchanged.
    ///
    /// # Errors
    ///
    /// The first failure of [`lookup`](Self::lookup).
    pub fn resolve(&self, value: ArgValue) -> Result<ArgValue, StackbuildError> {
        Ok(match value {
            ArgValue::Reference(reference) => self.lookup(&reference)?,
            ArgValue::Sequence(items) => ArgValue::Sequence(
                items.into_iter().map(|item| self.resolve(item)).collect::<Result<_, _>>()?,
            ),
            ArgValue::Mapping(map) => ArgValue::Mapping(self.resolve_map(map)?),
            other => other,
        })
    }

    /// [`resolve`](Self::resolve) applied to every value of a mapping.
    ///
    /// # Errors
    ///
    /// The first failure of [`lookup`](Self::lookup).
    pub fn resolve_map(&self, map: ArgMap) -> Result<ArgMap, StackbuildError> {
        map.into_iter().map(|(key, value)| Ok((key, self.resolve(value)?))).collect()
    }
}
