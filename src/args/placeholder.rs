//! Placeholder grammar.
//!
//! Two placeholder forms are recognized, and only when they make up the whole
//! string value:
//!
//! - `ref:<name>.<attribute>` - an attribute of a resource declared earlier.
//!   The name ends at the first `.`; `ref:<name>` alone means `ref:<name>.id`.
//! - `secret:<key>` - a value from the secret provider. The key is passed on verbatim.
//!
//! Strings that merely contain a placeholder (`"arn:ref:x.y"`) are ordinary literals.

use std::fmt;

use crate::constants::{DEFAULT_REF_ATTRIBUTE, REF_PREFIX, SECRET_PREFIX};
use crate::core::StackbuildError;

/// A `ref:<name>.<attribute>` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Declared name of the referenced resource
    pub resource: String,
    /// Case-sensitive attribute of the referenced handle
    pub attribute: String,
}

impl Reference {
    /// Reference to `attribute` of `resource`.
    pub fn new(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{REF_PREFIX}{}.{}", self.resource, self.attribute)
    }
}

/// A `secret:<key>` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretRef {
    /// Key handed to the secret provider
    pub key: String,
}

impl SecretRef {
    /// Placeholder for `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
        }
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SECRET_PREFIX}{}", self.key)
    }
}

/// A parsed placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// `ref:` form
    Reference(Reference),
    /// `secret:` form
    Secret(SecretRef),
}

impl Placeholder {
    /// Parse `value` as a placeholder.
    ///
    /// Returns `Ok(None)` for strings that do not start with a placeholder prefix.
    ///
    /// # Errors
    ///
    /// [`StackbuildError::MalformedPlaceholder`] when the prefix is present but the rest
    /// does not follow the grammar.
    pub fn parse(value: &str) -> Result<Option<Self>, StackbuildError> {
        if let Some(rest) = value.strip_prefix(REF_PREFIX) {
            return parse_reference(value, rest).map(|r| Some(Self::Reference(r)));
        }

        if let Some(key) = value.strip_prefix(SECRET_PREFIX) {
            if key.is_empty() {
                return Err(malformed(value, "missing secret key after 'secret:'"));
            }
            return Ok(Some(Self::Secret(SecretRef::new(key))));
        }

        Ok(None)
    }
}

fn parse_reference(value: &str, rest: &str) -> Result<Reference, StackbuildError> {
    if rest.chars().any(char::is_whitespace) {
        return Err(malformed(value, "references may not contain whitespace"));
    }

    let (resource, attribute) = match rest.split_once('.') {
        Some((resource, attribute)) => (resource, attribute),
        None => (rest, DEFAULT_REF_ATTRIBUTE),
    };

    if resource.is_empty() {
        return Err(malformed(value, "missing resource name after 'ref:'"));
    }
    if attribute.is_empty() {
        return Err(malformed(value, "missing attribute after '.'"));
    }

    Ok(Reference::new(resource, attribute))
}

fn malformed(value: &str, reason: &str) -> StackbuildError {
    StackbuildError::MalformedPlaceholder {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
