//! Region abbreviation table.
//!
//! Canonical resource names embed a short region code (`use1`, `euc1`, ...)
//! instead of the full region identifier to keep names short and consistent.

use std::collections::BTreeMap;

/// Built-in region abbreviations.
pub const REGION_ABBREVIATIONS: &[(&str, &str)] = &[
    ("us-east-1", "use1"),
    ("us-east-2", "use2"),
    ("us-west-1", "usw1"),
    ("us-west-2", "usw2"),
    ("af-south-1", "afs1"),
    ("ap-east-1", "ape1"),
    ("ap-south-1", "aps1"),
    ("ap-northeast-1", "apne1"),
    ("ap-northeast-2", "apne2"),
    ("ap-northeast-3", "apne3"),
    ("ap-southeast-1", "apse1"),
    ("ap-southeast-2", "apse2"),
    ("ca-central-1", "cac1"),
    ("ca-west-1", "caw1"),
    ("eu-central-1", "euc1"),
    ("eu-west-1", "euw1"),
    ("eu-west-2", "euw2"),
    ("eu-west-3", "euw3"),
    ("eu-north-1", "eun1"),
    ("eu-south-1", "eus1"),
    ("me-south-1", "mes1"),
    ("sa-east-1", "sae1"),
    ("us-gov-east-1", "usge1"),
    ("us-gov-west-1", "usgw1"),
    ("cn-north-1", "cnn1"),
    ("cn-northwest-1", "cnnw1"),
];

/// Mapping from full region identifiers to short codes.
///
/// Starts from [`REGION_ABBREVIATIONS`]; entries from the settings file can extend
/// or override it. Lookups are case-insensitive and ignore surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionTable {
    entries: BTreeMap<String, String>,
}

impl RegionTable {
    /// Table with only the built-in regions.
    #[must_use]
    pub fn builtin() -> Self {
        let entries = REGION_ABBREVIATIONS
            .iter()
            .map(|(region, abbr)| ((*region).to_string(), (*abbr).to_string()))
            .collect();
        Self {
            entries,
        }
    }

    /// Add or replace entries. Later entries win.
    #[must_use]
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (region, abbr) in overrides {
            self.entries.insert(normalize(region.as_ref()), abbr.as_ref().trim().to_lowercase());
        }
        self
    }

    /// Short code for `region`, if known.
    #[must_use]
    pub fn abbreviation(&self, region: &str) -> Option<&str> {
        self.entries.get(&normalize(region)).map(String::as_str)
    }

    /// Whether `region` has an entry.
    #[must_use]
    pub fn contains(&self, region: &str) -> bool {
        self.abbreviation(region).is_some()
    }

    /// Number of known regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RegionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(region: &str) -> String {
    region.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let table = RegionTable::builtin();
        assert_eq!(table.abbreviation("us-east-1"), Some("use1"));
        assert_eq!(table.abbreviation("cn-northwest-1"), Some("cnnw1"));
        assert_eq!(table.len(), REGION_ABBREVIATIONS.len());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = RegionTable::builtin();
        assert_eq!(table.abbreviation(" EU-Central-1 "), Some("euc1"));
    }

    #[test]
    fn test_unknown_region() {
        let table = RegionTable::builtin();
        assert_eq!(table.abbreviation("mars-north-1"), None);
        assert!(!table.contains("us-east"));
    }

    #[test]
    fn test_overrides_extend_and_replace() {
        let table = RegionTable::builtin()
            .with_overrides([("mx-central-1", "mxc1"), ("us-east-1", "ue1")]);
        assert_eq!(table.abbreviation("mx-central-1"), Some("mxc1"));
        assert_eq!(table.abbreviation("us-east-1"), Some("ue1"));
    }
}
