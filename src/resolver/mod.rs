//! Placeholder resolution for argument trees.
//!
//! Two resolvers run over every declaration's arguments, secrets first and then
//! references:
//!
//! - [`SecretResolver`] replaces `secret:<key>` leaves with values from a
//!   [`SecretProvider`]
//! - [`ReferenceResolver`] replaces `ref:<name>.<attribute>` leaves with attributes of
//!   handles already in the [`Registry`](crate::build::Registry)
//!
//! Both walk the tree depth-first, rebuild mappings and sequences, and leave every
//! other node untouched. A tree with no placeholders comes back structurally equal.

mod references;
mod secrets;

pub use references::ReferenceResolver;
pub use secrets::{
    ChainedSecretProvider, EnvSecretProvider, FileSecretProvider, SecretProvider, SecretResolver,
    StaticSecretProvider,
};
