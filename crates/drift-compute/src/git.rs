// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use drift_core::DriftError;

/// Revision-range expansion seam.
///
/// Implementations resolve the commit hashes between a stable revision and a
/// suspect revision, newest first, excluding the stable one.
pub trait GitHistoryResolver: Send + Sync {
    fn resolve(&self, older: &str, newer: &str) -> Result<Vec<String>, DriftError>;
}

/// Tries a primary (local) resolver, then a secondary (remote) one, and
/// degrades to an empty list when both fail.
pub struct FallbackResolver {
    primary: Box<dyn GitHistoryResolver>,
    secondary: Box<dyn GitHistoryResolver>,
}

impl FallbackResolver {
    pub fn new(primary: Box<dyn GitHistoryResolver>, secondary: Box<dyn GitHistoryResolver>) -> Self {
        Self { primary, secondary }
    }
}

impl GitHistoryResolver for FallbackResolver {
    fn resolve(&self, older: &str, newer: &str) -> Result<Vec<String>, DriftError> {
        if let Ok(revisions) = self.primary.resolve(older, newer) {
            return Ok(revisions);
        }
        match self.secondary.resolve(older, newer) {
            Ok(revisions) => Ok(revisions),
            Err(_) => Ok(vec![]),
        }
    }
}

/// Resolver backed by a fixed, oldest-to-newest revision log. Used by tests
/// and by the CLI, where the series snapshot itself is the only history
/// available.
pub struct StaticResolver {
    log: Vec<String>,
}

impl StaticResolver {
    pub fn new(log: Vec<String>) -> Self {
        Self { log }
    }

    /// Builds the log straight from a series' revision column.
    pub fn from_revisions(revisions: &[String]) -> Self {
        Self::new(revisions.to_vec())
    }

    fn position(&self, revision: &str) -> Result<usize, DriftError> {
        self.log
            .iter()
            .position(|known| known == revision)
            .ok_or_else(|| {
                DriftError::git_resolution(format!("revision '{revision}' not in history"))
            })
    }
}

impl GitHistoryResolver for StaticResolver {
    fn resolve(&self, older: &str, newer: &str) -> Result<Vec<String>, DriftError> {
        let older_at = self.position(older)?;
        let newer_at = self.position(newer)?;
        if newer_at <= older_at {
            return Err(DriftError::git_resolution(format!(
                "revision '{newer}' is not newer than '{older}'"
            )));
        }
        Ok(self.log[older_at + 1..=newer_at]
            .iter()
            .rev()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{FallbackResolver, GitHistoryResolver, StaticResolver};
    use drift_core::DriftError;

    struct FailingResolver;

    impl GitHistoryResolver for FailingResolver {
        fn resolve(&self, _older: &str, _newer: &str) -> Result<Vec<String>, DriftError> {
            Err(DriftError::git_resolution("lookup unavailable"))
        }
    }

    fn log() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()]
    }

    #[test]
    fn static_resolver_returns_newest_first_excluding_the_stable_revision() {
        let resolver = StaticResolver::new(log());
        let revisions = resolver.resolve("a", "d").expect("range should resolve");
        assert_eq!(revisions, vec!["d", "c", "b"]);

        let adjacent = resolver.resolve("b", "c").expect("adjacent pair should resolve");
        assert_eq!(adjacent, vec!["c"]);
    }

    #[test]
    fn static_resolver_rejects_unknown_and_reversed_ranges() {
        let resolver = StaticResolver::new(log());
        let err = resolver
            .resolve("a", "zz")
            .expect_err("unknown revision must fail");
        assert!(err.to_string().contains("not in history"));

        let err = resolver
            .resolve("c", "a")
            .expect_err("reversed range must fail");
        assert!(err.to_string().contains("not newer"));
    }

    #[test]
    fn fallback_uses_the_secondary_when_the_primary_fails() {
        let fallback = FallbackResolver::new(
            Box::new(FailingResolver),
            Box::new(StaticResolver::new(log())),
        );
        let revisions = fallback.resolve("a", "c").expect("fallback should resolve");
        assert_eq!(revisions, vec!["c", "b"]);
    }

    #[test]
    fn fallback_degrades_to_empty_when_both_fail() {
        let fallback = FallbackResolver::new(Box::new(FailingResolver), Box::new(FailingResolver));
        let revisions = fallback
            .resolve("a", "c")
            .expect("double failure degrades, never aborts");
        assert!(revisions.is_empty());
    }
}
