//! Secret providers and the secret resolver.
//!
//! A `secret:<key>` placeholder is replaced by the value a [`SecretProvider`] holds for
//! `key`. A missing key fails the enclosing build; there is no default and no empty
//! fallback. Resolved values are wrapped in [`SecretValue`], which never prints its
//! content, and only keys are ever logged.
//!
//! # Providers
//!
//! - [`StaticSecretProvider`] - an in-memory map, also used to back the file provider
//! - [`EnvSecretProvider`] - `secret:db-password` reads `STACKBUILD_SECRET_DB_PASSWORD`
//! - [`FileSecretProvider`] - a YAML mapping of key to value loaded from disk
//! - [`ChainedSecretProvider`] - asks several providers in order

use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::args::{ArgMap, ArgValue, Scalar, SecretValue};
use crate::core::StackbuildError;

/// Source of secret values.
pub trait SecretProvider: Send + Sync {
    /// The value stored under `key`, or `None` if the provider has no such key.
    fn get(&self, key: &str) -> Option<SecretValue>;

    /// Short description used in error messages, e.g. `secrets file ./secrets.yaml`.
    fn describe(&self) -> String;
}

/// Secrets held in memory.
#[derive(Debug, Default, Clone)]
pub struct StaticSecretProvider {
    values: HashMap<String, SecretValue>,
}

impl StaticSecretProvider {
    /// Provider with no secrets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret.
    #[must_use]
    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add a secret in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), SecretValue::new(value));
    }

    /// Number of secrets held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no secrets are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticSecretProvider {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut provider = Self::new();
        for (key, value) in iter {
            provider.insert(key, value);
        }
        provider
    }
}

impl SecretProvider for StaticSecretProvider {
    fn get(&self, key: &str) -> Option<SecretValue> {
        self.values.get(key).cloned()
    }

    fn describe(&self) -> String {
        "in-memory secrets".to_string()
    }
}

/// Secrets read from environment variables.
///
/// The variable name is the prefix followed by the key upper-cased, with every
/// character that is not ASCII alphanumeric replaced by `_`.
///
/// The mapping is not injective: `db-password`, `db_password`, `db.password` and
/// `DB-Password` all read `STACKBUILD_SECRET_DB_PASSWORD`. Keys that must stay distinct
/// belong in the secrets file, which matches keys exactly.
#[derive(Debug, Clone)]
pub struct EnvSecretProvider {
    prefix: String,
}

impl EnvSecretProvider {
    /// Provider reading `<prefix><KEY>` variables.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable consulted for `key`.
    #[must_use]
    pub fn variable_name(&self, key: &str) -> String {
        let suffix: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{suffix}", self.prefix)
    }
}

impl SecretProvider for EnvSecretProvider {
    fn get(&self, key: &str) -> Option<SecretValue> {
        std::env::var(self.variable_name(key)).ok().map(SecretValue::new)
    }

    fn describe(&self) -> String {
        format!("environment ({}*)", self.prefix)
    }
}

/// Secrets loaded from a YAML file of `key: value` pairs.
#[derive(Debug, Clone)]
pub struct FileSecretProvider {
    path: PathBuf,
    values: StaticSecretProvider,
}

impl FileSecretProvider {
    /// Read and parse the secrets file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not a mapping of strings to scalars.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read secrets file {}", path.display()))?;
        Self::from_yaml_str(path, &content)
    }

    /// Parse secrets from YAML text; `path` is only used for messages.
    ///
    /// # Errors
    ///
    /// Fails when the text is not a mapping of strings to scalars.
    pub fn from_yaml_str(path: &Path, content: &str) -> anyhow::Result<Self> {
        let raw: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(content)
            .with_context(|| format!("Failed to parse secrets file {}", path.display()))?;

        let mut values = StaticSecretProvider::new();
        for (key, value) in raw {
            let text = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => anyhow::bail!(
                    "Secret '{key}' in {} must be a string, number or boolean",
                    path.display()
                ),
            };
            values.insert(key, text);
        }

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }
}

impl SecretProvider for FileSecretProvider {
    fn get(&self, key: &str) -> Option<SecretValue> {
        self.values.get(key)
    }

    fn describe(&self) -> String {
        format!("secrets file {}", self.path.display())
    }
}

/// Providers consulted in order; the first that has the key wins.
#[derive(Default)]
pub struct ChainedSecretProvider {
    providers: Vec<Box<dyn SecretProvider>>,
}

impl ChainedSecretProvider {
    /// Empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider with lower priority than those already added.
    #[must_use]
    pub fn with(mut self, provider: impl SecretProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl SecretProvider for ChainedSecretProvider {
    fn get(&self, key: &str) -> Option<SecretValue> {
        self.providers.iter().find_map(|provider| provider.get(key))
    }

    fn describe(&self) -> String {
        if self.providers.is_empty() {
            return "no secret providers".to_string();
        }
        self.providers.iter().map(|p| p.describe()).collect::<Vec<_>>().join(", ")
    }
}

/// Replaces `secret:` placeholders with provider values.
pub struct SecretResolver<'a> {
    provider: &'a dyn SecretProvider,
}

impl<'a> SecretResolver<'a> {
    /// Resolver backed by `provider`.
    pub fn new(provider: &'a dyn SecretProvider) -> Self {
        Self {
            provider,
        }
    }

    /// Value for a single key.
    ///
    /// # Errors
    ///
    /// [`StackbuildError::SecretNotFound`] when the provider has no such key.
    pub fn lookup(&self, key: &str) -> Result<SecretValue, StackbuildError> {
        let value = self.provider.get(key).ok_or_else(|| StackbuildError::SecretNotFound {
            key: key.to_string(),
            provider: self.provider.describe(),
        })?;
        debug!("Resolved secret '{}'", key);
        Ok(value)
    }

    /// Replace every `secret:` leaf in `value`. Other nodes are rebuilt unchanged.
    ///
    /// # Errors
    ///
    /// [`StackbuildError::SecretNotFound`] for the first missing key.
    pub fn resolve(&self, value: ArgValue) -> Result<ArgValue, StackbuildError> {
        Ok(match value {
            ArgValue::Secret(secret) => {
                ArgValue::Literal(Scalar::Sensitive(self.lookup(&secret.key)?))
            }
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
    /// [`StackbuildError::SecretNotFound`] for the first missing key.
    pub fn resolve_map(&self, map: ArgMap) -> Result<ArgMap, StackbuildError> {
        map.into_iter().map(|(key, value)| Ok((key, self.resolve(value)?))).collect()
    }
}
