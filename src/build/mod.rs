//! Building declarations into resource handles.
//!
//! [`Orchestrator`] drives each declaration through the resolvers, the type locator
//! and the provisioning engine, and collects the results in a [`Registry`].
//! Declaration order is the only dependency signal: a resource can reference only
//! resources declared above it, and there is no graph sort that could change that.

mod orchestrator;
mod params;
mod registry;

pub use orchestrator::Orchestrator;
pub use params::{inject_common_parameters, lookup_parameters, to_snake_case};
pub use registry::Registry;
