//! Per-declaration build stages.

use serde::Serialize;
use std::fmt;

/// Where a single declaration is in its build.
///
/// A declaration moves through the stages in order:
///
/// ```text
/// Pending -> ArgsResolving -> TypeResolving -> Constructing -> Registered
/// ```
///
/// Any stage before `Registered` may instead end in `Failed`. The stage recorded
/// in a [`BuildError`](super::BuildError) is the one that was active when the
/// failure happened, never `Failed` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    /// Not started
    Pending,
    /// Substituting secrets and references in the argument tree
    ArgsResolving,
    /// Locating the create or lookup implementation for the type identifier
    TypeResolving,
    /// Naming, injecting common parameters and calling the provisioning engine
    Constructing,
    /// Handle stored in the registry
    Registered,
    /// Build aborted
    Failed,
}

impl BuildStage {
    /// Whether `next` is a legal successor of this stage.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::ArgsResolving)
                | (Self::ArgsResolving, Self::TypeResolving)
                | (Self::TypeResolving, Self::Constructing)
                | (Self::Constructing, Self::Registered)
                | (Self::Pending | Self::ArgsResolving | Self::TypeResolving | Self::Constructing, Self::Failed)
        )
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Pending => "pending",
            Self::ArgsResolving => "resolving arguments",
            Self::TypeResolving => "resolving resource type",
            Self::Constructing => "constructing",
            Self::Registered => "registered",
            Self::Failed => "failed",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(BuildStage::Pending.can_advance_to(BuildStage::ArgsResolving));
        assert!(BuildStage::ArgsResolving.can_advance_to(BuildStage::TypeResolving));
        assert!(BuildStage::TypeResolving.can_advance_to(BuildStage::Constructing));
        assert!(BuildStage::Constructing.can_advance_to(BuildStage::Registered));
    }

    #[test]
    fn test_no_skipping_or_reversing() {
        assert!(!BuildStage::Pending.can_advance_to(BuildStage::Constructing));
        assert!(!BuildStage::Constructing.can_advance_to(BuildStage::ArgsResolving));
        assert!(!BuildStage::Registered.can_advance_to(BuildStage::Failed));
        assert!(!BuildStage::Failed.can_advance_to(BuildStage::Pending));
    }

    #[test]
    fn test_failed_reachable_from_active_stages() {
        for stage in [
            BuildStage::Pending,
            BuildStage::ArgsResolving,
            BuildStage::TypeResolving,
            BuildStage::Constructing,
        ] {
            assert!(stage.can_advance_to(BuildStage::Failed), "{stage:?}");
        }
    }
}
