//! Configuration inputs.
//!
//! Two files feed a run:
//!
//! 1. **Stack document** (`stackbuild.yaml`) - the global scope and the ordered
//!    resource declarations, see [`StackDocument`]
//! 2. **Settings** (`~/.stackbuild/config.toml`) - user-wide options such as the
//!    secrets file and extra region abbreviations, see [`Settings`]
//!
//! The document is validated as it is loaded: required scope fields, unique names,
//! well-formed type identifiers and placeholders. Anything that depends on other
//! resources (references, types being available) is checked by the build itself.

mod document;
mod settings;

pub use document::{GlobalScope, ResourceDeclaration, StackDocument};
pub use settings::Settings;
