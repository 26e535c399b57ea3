//! Core types for stackbuild
//!
//! This module holds the types every other module shares: the error kinds a build can
//! fail with and the stages a declaration passes through while it is built.
//!
//! # Error Management
//!
//! - **Strongly-typed errors** ([`StackbuildError`]) for precise error handling in code
//! - **Located errors** ([`BuildError`]) naming the declaration and [`BuildStage`] that failed
//! - **User-friendly contexts** ([`ErrorContext`]) with actionable suggestions for CLI users
//!
//! # Examples
//!
//! ```rust,no_run
//! use stackbuild_cli::core::{user_friendly_error, StackbuildError};
//!
//! fn example_operation() -> anyhow::Result<()> {
//!     Err(StackbuildError::DuplicateDeclaration { name: "vpc-01".to_string() }.into())
//! }
//!
//! if let Err(e) = example_operation() {
//!     user_friendly_error(e).display();
//! }
//! ```

pub mod error;
mod stage;

pub use error::{user_friendly_error, BuildError, ErrorContext, StackbuildError};
pub use stage::BuildStage;
