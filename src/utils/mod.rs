//! Small helpers shared across modules.
//!
//! - [`suggest_similar`] - "did you mean" candidates for unknown names
//! - [`resolve_path`] - `~` and environment variable expansion for settings paths

use anyhow::{Context, Result};
use std::path::PathBuf;
use strsim::levenshtein;

use crate::constants::SIMILARITY_THRESHOLD_PERCENT;

/// Up to three candidates closest to `target`, nearest first.
///
/// Candidates further than half the target's length (in edit distance) are dropped.
///
/// # Examples
///
/// ```rust
/// use stackbuild_cli::utils::suggest_similar;
///
/// let known = ["vpc-01", "subnet-01", "bucket"];
/// assert_eq!(suggest_similar("vpc-1", known), vec!["vpc-01".to_string()]);
/// assert!(suggest_similar("zzzzzz", known).is_empty());
/// ```
pub fn suggest_similar<I, S>(target: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let max_distance = target.len() * SIMILARITY_THRESHOLD_PERCENT / 100;

    let mut scored: Vec<(String, usize)> = candidates
        .into_iter()
        .map(|candidate| {
            let candidate = candidate.as_ref();
            (candidate.to_string(), levenshtein(target, candidate))
        })
        .filter(|(candidate, distance)| *distance <= max_distance && candidate != target)
        .collect();

    scored.sort_by(|(a, da), (b, db)| da.cmp(db).then_with(|| a.cmp(b)));
    scored.into_iter().take(3).map(|(candidate, _)| candidate).collect()
}

/// Expand `~` and `$VAR` / `${VAR}` in a user-supplied path.
///
/// # Errors
///
/// Fails when a referenced environment variable is not set.
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path).with_context(|| {
        format!(
            "Failed to expand path: {path}\n\n\
            Common issues:\n\
            - Undefined environment variable (e.g., $UNDEFINED_VAR)\n\
            - Invalid variable syntax (use $VAR or ${{VAR}})"
        )
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestions_sorted_by_distance() {
        let known = ["subnet-02", "subnet-01", "vpc-01"];
        assert_eq!(suggest_similar("subnet-1", known), vec!["subnet-01", "subnet-02"]);
    }

    #[test]
    fn test_exact_match_not_suggested() {
        assert!(suggest_similar("vpc", ["vpc"]).is_empty());
    }

    #[test]
    fn test_suggestions_capped_at_three() {
        let known = ["ab1", "ab2", "ab3", "ab4"];
        assert_eq!(suggest_similar("ab", known).len(), 3);
    }

    #[test]
    fn test_resolve_plain_path() {
        assert_eq!(resolve_path("/tmp/secrets.yaml").unwrap(), PathBuf::from("/tmp/secrets.yaml"));
    }

    #[test]
    fn test_resolve_tilde() {
        let resolved = resolve_path("~/secrets.yaml").unwrap();
        assert!(!resolved.to_string_lossy().starts_with('~'));
        assert!(resolved.ends_with("secrets.yaml"));
    }

    #[test]
    fn test_resolve_undefined_variable_fails() {
        assert!(resolve_path("$STACKBUILD_SURELY_UNDEFINED_VAR/x").is_err());
    }
}
