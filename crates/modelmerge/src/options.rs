//! Merge configuration.

use modelmerge_core::{ConfigError, Error, Result};
use serde::{Deserialize, Serialize};

/// Options controlling a merge.
///
/// # Example
///
/// ```
/// use modelmerge::MergeOptions;
///
/// let opts = MergeOptions::from_json(r#"{"migrate_related": true}"#).unwrap();
/// assert!(opts.migrate_related);
/// assert!(!opts.keep_aliases);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeOptions {
    /// Also re-point undeclared foreign key columns and polymorphic
    /// references. Declared relationships are always re-pointed.
    pub migrate_related: bool,

    /// Keep alias records instead of deleting them.
    pub keep_aliases: bool,
}

impl MergeOptions {
    /// Defaults: no extra migration, aliases deleted.
    pub const fn new() -> Self {
        Self {
            migrate_related: false,
            keep_aliases: false,
        }
    }

    #[must_use]
    pub const fn migrate_related(mut self, value: bool) -> Self {
        self.migrate_related = value;
        self
    }

    #[must_use]
    pub const fn keep_aliases(mut self, value: bool) -> Self {
        self.keep_aliases = value;
        self
    }

    /// Parse options from JSON. Missing keys take their defaults; unknown
    /// keys are rejected.
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| {
            Error::Config(ConfigError {
                message: format!("invalid merge options: {e}"),
                source: Some(Box::new(e)),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_new() {
        assert_eq!(MergeOptions::default(), MergeOptions::new());
        assert!(!MergeOptions::new().migrate_related);
        assert!(!MergeOptions::new().keep_aliases);
    }

    #[test]
    fn builder_chain() {
        let opts = MergeOptions::new().migrate_related(true).keep_aliases(true);
        assert!(opts.migrate_related);
        assert!(opts.keep_aliases);
    }

    #[test]
    fn from_json_fills_defaults() {
        let opts = MergeOptions::from_json(r#"{"keep_aliases": true}"#).unwrap();
        assert!(opts.keep_aliases);
        assert!(!opts.migrate_related);
        assert_eq!(MergeOptions::from_json("{}").unwrap(), MergeOptions::new());
    }

    #[test]
    fn from_json_rejects_unknown_keys() {
        let err = MergeOptions::from_json(r#"{"keep_old": true}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().starts_with("Configuration error: invalid merge options"));
    }

    #[test]
    fn from_json_rejects_malformed_input() {
        assert!(matches!(
            MergeOptions::from_json("not json"),
            Err(Error::Config(_))
        ));
    }
}
