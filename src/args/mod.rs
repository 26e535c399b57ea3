//! Argument trees.
//!
//! A declaration's `args` mapping is parsed once, when the stack document is loaded,
//! into an [`ArgValue`] tree. Placeholder strings become dedicated variants at that
//! point, so a malformed placeholder is reported at load time instead of being passed
//! through as a literal, and the resolvers never re-parse strings.
//!
//! # Variants
//!
//! - [`ArgValue::Literal`] - a plain scalar ([`Scalar`])
//! - [`ArgValue::Reference`] - `ref:<name>.<attribute>`, replaced by the reference resolver
//! - [`ArgValue::Secret`] - `secret:<key>`, replaced by the secret resolver
//! - [`ArgValue::Sequence`] / [`ArgValue::Mapping`] - nested structure
//! - [`ArgValue::Deferred`] - a value the provisioning engine has not produced yet;
//!   only appears after references have been resolved
//!
//! # Examples
//!
//! ```rust
//! use stackbuild_cli::args::{ArgValue, Reference};
//!
//! let yaml: serde_yaml::Value = serde_yaml::from_str(
//!     "vpc_id: ref:vpc-01.id\ncidr_block: 10.0.1.0/24\n",
//! ).unwrap();
//! let tree = ArgValue::from_yaml(yaml).unwrap();
//!
//! assert_eq!(tree.references(), vec![&Reference::new("vpc-01", "id")]);
//! ```

mod deferred;
mod placeholder;
mod secret_value;

pub use deferred::{Deferred, DeferredError};
pub use placeholder::{Placeholder, Reference, SecretRef};
pub use secret_value::SecretValue;

use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;

use crate::core::StackbuildError;

/// A mapping node of an argument tree.
pub type ArgMap = BTreeMap<String, ArgValue>;

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// `null` / `~`
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Integer(i64),
    /// Floating point
    Float(f64),
    /// String
    String(String),
    /// A resolved secret; prints as `***`
    Sensitive(SecretValue),
}

impl Scalar {
    /// The string content, if this is a string or a secret.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Sensitive(secret) => Some(secret.expose()),
            _ => None,
        }
    }

    /// JSON rendering with secrets redacted.
    #[must_use]
    pub fn to_redacted_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => json!(b),
            Self::Integer(i) => json!(i),
            Self::Float(f) => json!(f),
            Self::String(s) => json!(s),
            Self::Sensitive(_) => json!("***"),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::Sensitive(secret) => write!(f, "{secret}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A node of an argument tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Plain value
    Literal(Scalar),
    /// `ref:` placeholder
    Reference(Reference),
    /// `secret:` placeholder
    Secret(SecretRef),
    /// List of values
    Sequence(Vec<ArgValue>),
    /// String-keyed mapping
    Mapping(ArgMap),
    /// Value produced later by the provisioning engine
    Deferred(Deferred),
}

impl ArgValue {
    /// Convert a parsed YAML value, recognizing placeholders in string leaves.
    ///
    /// # Errors
    ///
    /// - [`StackbuildError::MalformedPlaceholder`] for a string that starts with a
    ///   placeholder prefix but does not follow the grammar
    /// - [`StackbuildError::DocumentValidationError`] for mapping keys that are not
    ///   strings, integers beyond `i64`, or tagged YAML values
    pub fn from_yaml(value: serde_yaml::Value) -> Result<Self, StackbuildError> {
        use serde_yaml::Value;

        Ok(match value {
            Value::Null => Self::Literal(Scalar::Null),
            Value::Bool(b) => Self::Literal(Scalar::Bool(b)),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::Literal(Scalar::Integer(i)),
                (None, Some(f)) if n.is_f64() => Self::Literal(Scalar::Float(f)),
                _ => {
                    return Err(StackbuildError::DocumentValidationError {
                        reason: format!("integer {n} is out of range; quote it to pass it as a string"),
                    });
                }
            },
            Value::String(s) => match Placeholder::parse(&s)? {
                Some(Placeholder::Reference(reference)) => Self::Reference(reference),
                Some(Placeholder::Secret(secret)) => Self::Secret(secret),
                None => Self::Literal(Scalar::String(s)),
            },
            Value::Sequence(items) => {
                Self::Sequence(items.into_iter().map(Self::from_yaml).collect::<Result<_, _>>()?)
            }
            Value::Mapping(mapping) => Self::Mapping(map_from_yaml(mapping)?),
            Value::Tagged(tagged) => {
                return Err(StackbuildError::DocumentValidationError {
                    reason: format!("tagged YAML values are not supported (found !{})", tagged.tag),
                });
            }
        })
    }

    /// Plain string literal.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Scalar::String(value.into()))
    }

    /// The scalar, if this is a literal.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Literal(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// The string content, if this is a string literal or a resolved secret.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    /// The mapping, if this is a mapping node.
    #[must_use]
    pub const fn as_mapping(&self) -> Option<&ArgMap> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Every `ref:` placeholder in the tree, depth-first.
    #[must_use]
    pub fn references(&self) -> Vec<&Reference> {
        let mut found = Vec::new();
        self.visit(&mut |node| {
            if let Self::Reference(reference) = node {
                found.push(reference);
            }
        });
        found
    }

    /// Whether any placeholder remains in the tree.
    #[must_use]
    pub fn has_placeholders(&self) -> bool {
        let mut found = false;
        self.visit(&mut |node| {
            found |= matches!(node, Self::Reference(_) | Self::Secret(_));
        });
        found
    }

    /// JSON rendering for display and logs.
    ///
    /// Secrets print as `***`, pending deferred values as `<pending:label>`, and
    /// unresolved placeholders in their source form.
    #[must_use]
    pub fn to_redacted_json(&self) -> serde_json::Value {
        match self {
            Self::Literal(scalar) => scalar.to_redacted_json(),
            Self::Reference(reference) => json!(reference.to_string()),
            Self::Secret(secret) => json!(secret.to_string()),
            Self::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_redacted_json).collect())
            }
            Self::Mapping(map) => map_to_redacted_json(map),
            Self::Deferred(deferred) => match deferred.peek() {
                Some(Ok(scalar)) => scalar.to_redacted_json(),
                Some(Err(_)) => json!(format!("<failed:{}>", deferred.label())),
                None => json!(format!("<pending:{}>", deferred.label())),
            },
        }
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Self)) {
        f(self);
        match self {
            Self::Sequence(items) => {
                for item in items {
                    item.visit(f);
                }
            }
            Self::Mapping(map) => {
                for value in map.values() {
                    value.visit(f);
                }
            }
            _ => {}
        }
    }
}

impl From<Scalar> for ArgValue {
    fn from(value: Scalar) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<Deferred> for ArgValue {
    fn from(value: Deferred) -> Self {
        Self::Deferred(value)
    }
}

impl From<ArgMap> for ArgValue {
    fn from(value: ArgMap) -> Self {
        Self::Mapping(value)
    }
}

/// Convert a YAML mapping whose keys must all be strings.
///
/// # Errors
///
/// See [`ArgValue::from_yaml`].
pub fn map_from_yaml(mapping: serde_yaml::Mapping) -> Result<ArgMap, StackbuildError> {
    mapping
        .into_iter()
        .map(|(key, value)| {
            let key = match key {
                serde_yaml::Value::String(key) => key,
                other => {
                    return Err(StackbuildError::DocumentValidationError {
                        reason: format!("argument keys must be strings, found {other:?}"),
                    });
                }
            };
            Ok((key, ArgValue::from_yaml(value)?))
        })
        .collect()
}

/// JSON rendering of a mapping; see [`ArgValue::to_redacted_json`].
#[must_use]
pub fn map_to_redacted_json(map: &ArgMap) -> serde_json::Value {
    serde_json::Value::Object(
        map.iter().map(|(key, value)| (key.clone(), value.to_redacted_json())).collect(),
    )
}
