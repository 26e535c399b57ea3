//! Error handling for stackbuild
//!
//! This module provides the error types and user-friendly error reporting for the
//! stackbuild infrastructure builder. The error system is designed around two core
//! principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! The error system consists of three types:
//! - [`StackbuildError`] - Enumerated error kinds for every failure in stackbuild
//! - [`BuildError`] - A [`StackbuildError`] tagged with the declaration and [`BuildStage`]
//!   it failed in, produced by the build orchestrator
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Naming**: [`StackbuildError::UnknownRegion`]
//! - **Placeholders**: [`StackbuildError::SecretNotFound`], [`StackbuildError::UnresolvedReference`],
//!   [`StackbuildError::MissingAttribute`], [`StackbuildError::MalformedPlaceholder`]
//! - **Provisioning**: [`StackbuildError::UnknownResourceType`],
//!   [`StackbuildError::MissingLookupParameters`], [`StackbuildError::ProvisioningError`]
//! - **Documents**: [`StackbuildError::DocumentNotFound`], [`StackbuildError::DocumentParseError`],
//!   [`StackbuildError::DocumentValidationError`], [`StackbuildError::DuplicateDeclaration`]
//! - **Settings**: [`StackbuildError::ConfigError`]
//!
//! Every error is fatal to the run. Nothing here is meant to be logged and ignored.
//!
//! # Examples
//!
//! ```rust,no_run
//! use stackbuild_cli::core::{StackbuildError, ErrorContext};
//!
//! let context = ErrorContext::new(StackbuildError::UnknownRegion {
//!     region: "mars-north-1".to_string(),
//! })
//! .with_suggestion("Add the region to the [regions] table in ~/.stackbuild/config.toml");
//!
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use super::stage::BuildStage;

/// The main error type for stackbuild operations
///
/// Each variant represents one specific failure mode. Variants carry the names,
/// keys and identifiers needed to locate the faulting line in the stack document.
///
/// # Examples
///
/// ```rust,no_run
/// use stackbuild_cli::core::StackbuildError;
///
/// fn describe(error: &StackbuildError) -> &'static str {
///     match error {
///         StackbuildError::SecretNotFound { .. } => "secret missing",
///         StackbuildError::UnresolvedReference { .. } => "reference to an unbuilt resource",
///         _ => "other failure",
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum StackbuildError {
    /// The document's region has no entry in the region abbreviation table
    ///
    /// Names are built from the short region code, so an unknown region is
    /// never passed through verbatim.
    #[error("Unknown region '{region}': no abbreviation is registered for it")]
    UnknownRegion {
        /// The region identifier as written in the document
        region: String,
    },

    /// A `secret:<key>` placeholder named a key the secret provider does not hold
    #[error("Secret '{key}' not found in {provider}")]
    SecretNotFound {
        /// The key passed to the provider
        key: String,
        /// Description of the provider that was asked
        provider: String,
    },

    /// A `ref:` placeholder named a resource that has not been built yet
    ///
    /// This covers typos, self references and forward references: a resource
    /// may only reference resources declared above it.
    #[error("Reference to '{resource}.{attribute}' cannot be resolved: '{resource}' has not been built")]
    UnresolvedReference {
        /// The referenced declaration name
        resource: String,
        /// The requested attribute
        attribute: String,
        /// Already-built names that look similar
        suggestions: Vec<String>,
    },

    /// The referenced resource exists but does not expose the requested attribute
    #[error("Resource '{resource}' has no attribute '{attribute}'")]
    MissingAttribute {
        /// The referenced declaration name
        resource: String,
        /// The attribute that was requested
        attribute: String,
        /// The attributes the handle does expose
        available: Vec<String>,
    },

    /// A placeholder string does not follow the placeholder grammar
    #[error("Malformed placeholder '{value}': {reason}")]
    MalformedPlaceholder {
        /// The raw placeholder string
        value: String,
        /// What is wrong with it
        reason: String,
    },

    /// No implementation is registered for the type identifier in the requested mode
    #[error("Unknown resource type '{resource_type}' ({mode})")]
    UnknownResourceType {
        /// The dotted type identifier
        resource_type: String,
        /// `create` or `lookup`
        mode: String,
        /// Registered type identifiers that look similar
        suggestions: Vec<String>,
    },

    /// A lookup of an existing resource is missing required identifying parameters
    #[error("Lookup of '{resource_type}' is missing required parameters: {}", missing.join(", "))]
    MissingLookupParameters {
        /// The dotted type identifier
        resource_type: String,
        /// Parameter names that could not be found in the arguments
        missing: Vec<String>,
    },

    /// The provisioning engine rejected a create or lookup call
    #[error("Provisioning of '{resource_type}' failed: {reason}")]
    ProvisioningError {
        /// The dotted type identifier
        resource_type: String,
        /// The engine's reason
        reason: String,
    },

    /// Two declarations share the same name
    #[error("Resource '{name}' is declared more than once")]
    DuplicateDeclaration {
        /// The duplicated declaration name
        name: String,
    },

    /// Stack document not found
    #[error("Stack document not found: {path}")]
    DocumentNotFound {
        /// Path that was searched
        path: String,
    },

    /// Stack document could not be parsed
    #[error("Invalid stack document syntax in {file}")]
    DocumentParseError {
        /// Path to the document
        file: String,
        /// Parser message
        reason: String,
    },

    /// Stack document parsed but is not valid
    #[error("Stack document validation failed: {reason}")]
    DocumentValidationError {
        /// Why validation failed
        reason: String,
    },

    /// Tool settings error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for StackbuildError {
    fn clone(&self) -> Self {
        match self {
            Self::UnknownRegion {
                region,
            } => Self::UnknownRegion {
                region: region.clone(),
            },
            Self::SecretNotFound {
                key,
                provider,
            } => Self::SecretNotFound {
                key: key.clone(),
                provider: provider.clone(),
            },
            Self::UnresolvedReference {
                resource,
                attribute,
                suggestions,
            } => Self::UnresolvedReference {
                resource: resource.clone(),
                attribute: attribute.clone(),
                suggestions: suggestions.clone(),
            },
            Self::MissingAttribute {
                resource,
                attribute,
                available,
            } => Self::MissingAttribute {
                resource: resource.clone(),
                attribute: attribute.clone(),
                available: available.clone(),
            },
            Self::MalformedPlaceholder {
                value,
                reason,
            } => Self::MalformedPlaceholder {
                value: value.clone(),
                reason: reason.clone(),
            },
            Self::UnknownResourceType {
                resource_type,
                mode,
                suggestions,
            } => Self::UnknownResourceType {
                resource_type: resource_type.clone(),
                mode: mode.clone(),
                suggestions: suggestions.clone(),
            },
            Self::MissingLookupParameters {
                resource_type,
                missing,
            } => Self::MissingLookupParameters {
                resource_type: resource_type.clone(),
                missing: missing.clone(),
            },
            Self::ProvisioningError {
                resource_type,
                reason,
            } => Self::ProvisioningError {
                resource_type: resource_type.clone(),
                reason: reason.clone(),
            },
            Self::DuplicateDeclaration {
                name,
            } => Self::DuplicateDeclaration {
                name: name.clone(),
            },
            Self::DocumentNotFound {
                path,
            } => Self::DocumentNotFound {
                path: path.clone(),
            },
            Self::DocumentParseError {
                file,
                reason,
            } => Self::DocumentParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::DocumentValidationError {
                reason,
            } => Self::DocumentValidationError {
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// A failure of one declaration during a build run
///
/// The orchestrator wraps every [`StackbuildError`] it encounters in a `BuildError`
/// so that operators can find the declaration in the stack document and see how far
/// it got before failing.
#[derive(Error, Debug, Clone)]
#[error("Failed to build '{declaration}' while {stage}: {source}")]
pub struct BuildError {
    /// Declared name of the resource being built
    pub declaration: String,
    /// Stage the declaration was in when it failed
    pub stage: BuildStage,
    /// The originating error
    #[source]
    pub source: StackbuildError,
}

impl BuildError {
    /// Create a build error for `declaration` failing in `stage`.
    pub fn new(declaration: impl Into<String>, stage: BuildStage, source: StackbuildError) -> Self {
        Self {
            declaration: declaration.into(),
            stage,
            source,
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps a [`StackbuildError`] and adds optional suggestions for
/// resolution and additional details. When displayed, errors show:
/// 1. **Error**: The main error message in red
/// 2. **Details**: Additional context about the error in yellow (optional)
/// 3. **Suggestion**: Actionable steps to resolve the issue in green (optional)
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: StackbuildError,
    /// Declaration and stage the error occurred in, when it came from a build
    pub location: Option<(String, BuildStage)>,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from a [`StackbuildError`]
    #[must_use]
    pub const fn new(error: StackbuildError) -> Self {
        Self {
            error,
            location: None,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Record the declaration and stage the error came from
    pub fn with_location(mut self, declaration: impl Into<String>, stage: BuildStage) -> Self {
        self.location = Some((declaration.into(), stage));
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some((declaration, stage)) = &self.location {
            eprintln!("{}: resource '{}' while {}", "location".cyan(), declaration, stage);
        }

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some((declaration, stage)) = &self.location {
            write!(f, "\nLocation: resource '{declaration}' while {stage}")?;
        }

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`BuildError`], [`StackbuildError`] and [`std::io::Error`]; anything
/// else is rendered with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(build_error) = error.downcast_ref::<BuildError>() {
        return create_error_context(build_error.source.clone())
            .with_location(build_error.declaration.clone(), build_error.stage);
    }

    if let Some(stack_error) = error.downcast_ref::<StackbuildError>() {
        return create_error_context(stack_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::NotFound
    {
        return ErrorContext::new(StackbuildError::Other {
            message: error.to_string(),
        })
        .with_suggestion("Check that the file exists and the path is correct");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(StackbuildError::Other {
        message,
    })
}

/// Map each [`StackbuildError`] variant to a context with tailored suggestions.
fn create_error_context(error: StackbuildError) -> ErrorContext {
    match &error {
        StackbuildError::UnknownRegion { region } => {
            let details = format!(
                "Resource names embed a short region code; '{region}' is not in the abbreviation table"
            );
            ErrorContext::new(error)
                .with_suggestion("Fix the 'region' key, or add it under [regions] in the stackbuild settings file")
                .with_details(details)
        }

        StackbuildError::SecretNotFound { key, .. } => {
            let suggestion = format!(
                "Provide '{key}' via the secrets file or the {}<KEY> environment variable",
                crate::constants::DEFAULT_SECRET_ENV_PREFIX
            );
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("Builds never continue with a missing secret")
        }

        StackbuildError::UnresolvedReference { resource, suggestions, .. } => {
            let suggestion = if suggestions.is_empty() {
                format!("Declare '{resource}' above the resource that references it")
            } else {
                format!("Did you mean: {}?", suggestions.join(", "))
            };
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("Resources are built in document order; a 'ref:' may only name a resource declared earlier")
        }

        StackbuildError::MissingAttribute { available, .. } => {
            let details = if available.is_empty() {
                "The resource exposes no attributes".to_string()
            } else {
                format!("Available attributes: {}", available.join(", "))
            };
            ErrorContext::new(error)
                .with_suggestion("Attribute names are case-sensitive; check the spelling after the '.'")
                .with_details(details)
        }

        StackbuildError::MalformedPlaceholder { .. } => ErrorContext::new(error)
            .with_suggestion("Use 'ref:<resource>.<attribute>' or 'secret:<key>' as the whole value"),

        StackbuildError::UnknownResourceType { mode, suggestions, .. } => {
            let suggestion = if suggestions.is_empty() {
                "Run 'stackbuild validate' to list problems with resource types".to_string()
            } else {
                format!("Did you mean: {}?", suggestions.join(", "))
            };
            let details = if mode == "lookup" {
                "Resources marked 'existing: true' need a type that supports lookup by identifier"
            } else {
                "Type identifiers have the form <category>.<Kind>, e.g. ec2.Vpc"
            };
            ErrorContext::new(error).with_suggestion(suggestion).with_details(details)
        }

        StackbuildError::MissingLookupParameters { .. } => ErrorContext::new(error)
            .with_suggestion("Add the identifying parameters to 'args' (snake_case or the provider's own spelling)")
            .with_details("Existing resources are looked up, never created"),

        StackbuildError::DuplicateDeclaration { .. } => ErrorContext::new(error)
            .with_suggestion("Give every entry under 'resources' a unique name"),

        StackbuildError::DocumentNotFound { .. } => ErrorContext::new(error)
            .with_suggestion(format!(
                "Create a {} file or pass --file <path>",
                crate::constants::DEFAULT_DOCUMENT_NAME
            )),

        StackbuildError::DocumentParseError { file, reason } => {
            let details = reason.clone();
            let suggestion = format!("Check the YAML syntax in {file}");
            ErrorContext::new(error).with_suggestion(suggestion).with_details(details)
        }

        StackbuildError::ConfigError { .. } => ErrorContext::new(error).with_suggestion(format!(
            "Fix the settings file or point {} at another one",
            crate::constants::SETTINGS_ENV_VAR
        )),

        _ => ErrorContext::new(error),
    }
}
