//! Registry of built resources.

use std::collections::HashMap;

use crate::core::StackbuildError;
use crate::provider::ResourceHandle;

/// Append-only mapping from declared name to [`ResourceHandle`].
///
/// Iteration follows insertion order, which is declaration order. A name can be
/// inserted once; the registry never holds two handles under the same name.
#[derive(Debug, Default)]
pub struct Registry {
    order: Vec<String>,
    handles: HashMap<String, ResourceHandle>,
}

impl Registry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` under `name`.
    ///
    /// # Errors
    ///
    /// [`StackbuildError::DuplicateDeclaration`] if `name` is already registered; the
    /// registry is left unchanged.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        handle: ResourceHandle,
    ) -> Result<(), StackbuildError> {
        let name = name.into();
        if self.handles.contains_key(&name) {
            return Err(StackbuildError::DuplicateDeclaration {
                name,
            });
        }
        self.order.push(name.clone());
        self.handles.insert(name, handle);
        Ok(())
    }

    /// Handle registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResourceHandle> {
        self.handles.get(name)
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    /// Registered names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// `(name, handle)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceHandle)> {
        self.order
            .iter()
            .filter_map(|name| self.handles.get(name).map(|handle| (name.as_str(), handle)))
    }

    /// Number of registered handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str) -> ResourceHandle {
        ResourceHandle::builder("ec2.Vpc", name).build()
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut registry = Registry::new();
        registry.insert("zeta", handle("z")).unwrap();
        registry.insert("alpha", handle("a")).unwrap();
        registry.insert("mid", handle("m")).unwrap();

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(
            registry.iter().map(|(_, h)| h.physical_name()).collect::<Vec<_>>(),
            vec!["z", "a", "m"]
        );
    }

    #[test]
    fn test_duplicate_rejected_without_change() {
        let mut registry = Registry::new();
        registry.insert("vpc", handle("first")).unwrap();
        let err = registry.insert("vpc", handle("second")).unwrap_err();

        assert!(matches!(err, StackbuildError::DuplicateDeclaration { ref name } if name == "vpc"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("vpc").unwrap().physical_name(), "first");
    }
}
