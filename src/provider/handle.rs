//! Resource handles.

use crate::args::{ArgMap, ArgValue};
use crate::constants::DEFAULT_REF_ATTRIBUTE;

/// How a handle came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOrigin {
    /// Provisioned by this run
    Created,
    /// Looked up as an existing resource
    LookedUp,
}

/// The in-process result of building one declaration.
///
/// Exposes named attributes for later `ref:` placeholders. Attributes may be
/// [`ArgValue::Deferred`] when the provisioning engine has not produced them yet.
///
/// Handles are owned by the [`Registry`](crate::build::Registry) and are not `Clone`.
#[derive(Debug)]
pub struct ResourceHandle {
    resource_type: String,
    physical_name: String,
    origin: HandleOrigin,
    attributes: ArgMap,
}

impl ResourceHandle {
    /// Start building a handle for a created resource.
    pub fn builder(
        resource_type: impl Into<String>,
        physical_name: impl Into<String>,
    ) -> ResourceHandleBuilder {
        ResourceHandleBuilder {
            handle: Self {
                resource_type: resource_type.into(),
                physical_name: physical_name.into(),
                origin: HandleOrigin::Created,
                attributes: ArgMap::new(),
            },
        }
    }

    /// Dotted type identifier, e.g. `ec2.Vpc`.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Name the resource was provisioned or found under.
    #[must_use]
    pub fn physical_name(&self) -> &str {
        &self.physical_name
    }

    /// Whether the handle was created or looked up.
    #[must_use]
    pub const fn origin(&self) -> HandleOrigin {
        self.origin
    }

    /// A named attribute. Names are case-sensitive.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&ArgValue> {
        self.attributes.get(name)
    }

    /// The `id` attribute, if exposed.
    #[must_use]
    pub fn id(&self) -> Option<&ArgValue> {
        self.attribute(DEFAULT_REF_ATTRIBUTE)
    }

    /// Names of all attributes, sorted.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// All attributes.
    #[must_use]
    pub const fn attributes(&self) -> &ArgMap {
        &self.attributes
    }
}

/// Builder for [`ResourceHandle`].
#[derive(Debug)]
pub struct ResourceHandleBuilder {
    handle: ResourceHandle,
}

impl ResourceHandleBuilder {
    /// Mark the handle as looked up rather than created.
    #[must_use]
    pub const fn looked_up(mut self) -> Self {
        self.handle.origin = HandleOrigin::LookedUp;
        self
    }

    /// Add or replace one attribute.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.handle.attributes.insert(name.into(), value.into());
        self
    }

    /// Add or replace several attributes.
    #[must_use]
    pub fn attributes(mut self, attributes: ArgMap) -> Self {
        self.handle.attributes.extend(attributes);
        self
    }

    /// Finish the handle.
    #[must_use]
    pub fn build(self) -> ResourceHandle {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let handle = ResourceHandle::builder("s3.Bucket", "logs")
            .attribute("id", "logs")
            .attribute("arn", "arn:aws:s3:::logs")
            .looked_up()
            .build();

        assert_eq!(handle.resource_type(), "s3.Bucket");
        assert_eq!(handle.physical_name(), "logs");
        assert_eq!(handle.origin(), HandleOrigin::LookedUp);
        assert_eq!(handle.id(), Some(&ArgValue::string("logs")));
        assert_eq!(handle.attribute_names().collect::<Vec<_>>(), vec!["arn", "id"]);
        assert!(handle.attribute("ID").is_none());
    }
}
