//! Ordered collection of migrations loaded from disk

use std::collections::HashSet;

use super::definitions::Migration;
use crate::error::{MigrationError, MigrationResult};

/// Migrations sorted ascending by timestamp
#[derive(Debug, Clone, Default)]
pub struct MigrationSet {
    migrations: Vec<Migration>,
}

impl MigrationSet {
    /// Build a set, sorting by timestamp. The sort is stable, so migrations
    /// sharing a timestamp keep the order they were given in.
    pub fn new(mut migrations: Vec<Migration>) -> Self {
        migrations.sort_by_key(|m| m.timestamp);
        Self { migrations }
    }

    /// Every migration whose identity is not in `applied`, in set order.
    ///
    /// This is a set difference, not a watermark: a migration older than the
    /// newest applied one is still pending if it was never recorded.
    pub fn pending(&self, applied: &HashSet<String>) -> Vec<&Migration> {
        self.migrations
            .iter()
            .filter(|m| !applied.contains(&m.identity))
            .collect()
    }

    /// Exact lookup by identity
    pub fn by_identity(&self, identity: &str) -> MigrationResult<&Migration> {
        self.migrations
            .iter()
            .find(|m| m.identity == identity)
            .ok_or_else(|| MigrationError::NotFound {
                identity: identity.to_string(),
            })
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.migrations.iter().any(|m| m.identity == identity)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Migration> {
        self.migrations.iter()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

impl<'a> IntoIterator for &'a MigrationSet {
    type Item = &'a Migration;
    type IntoIter = std::slice::Iter<'a, Migration>;

    fn into_iter(self) -> Self::IntoIter {
        self.migrations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::definitions::checksum;
    use chrono::NaiveDateTime;
    use std::path::PathBuf;

    fn migration(identity: &str) -> Migration {
        let up_sql = format!("SELECT '{}';", identity);
        Migration {
            identity: identity.to_string(),
            timestamp: NaiveDateTime::parse_from_str(&identity[..14], "%Y%m%d%H%M%S").unwrap(),
            checksum: checksum(&up_sql),
            up_sql,
            down_sql: String::new(),
            source_path: PathBuf::from(format!("{}.up.sql", identity)),
        }
    }

    fn applied(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn ids<'a>(migrations: &[&'a Migration]) -> Vec<&'a str> {
        migrations.iter().map(|m| m.identity.as_str()).collect()
    }

    fn sample() -> MigrationSet {
        MigrationSet::new(vec![
            migration("20230103000000_c"),
            migration("20230101000000_a"),
            migration("20230102000000_b"),
        ])
    }

    #[test]
    fn test_new_sorts_by_timestamp() {
        let set = sample();
        let order: Vec<_> = set.iter().map(|m| m.identity.as_str()).collect();
        assert_eq!(
            order,
            vec!["20230101000000_a", "20230102000000_b", "20230103000000_c"]
        );
    }

    #[test]
    fn test_ties_keep_input_order() {
        let set = MigrationSet::new(vec![
            migration("20230101000000_zeta"),
            migration("20230101000000_alpha"),
        ]);
        let order: Vec<_> = set.iter().map(|m| m.identity.as_str()).collect();
        assert_eq!(order, vec!["20230101000000_zeta", "20230101000000_alpha"]);
    }

    #[test]
    fn test_pending_nothing_applied() {
        let set = sample();
        assert_eq!(
            ids(&set.pending(&HashSet::new())),
            vec!["20230101000000_a", "20230102000000_b", "20230103000000_c"]
        );
    }

    #[test]
    fn test_pending_contiguous_prefix() {
        let set = sample();
        assert_eq!(
            ids(&set.pending(&applied(&["20230101000000_a", "20230102000000_b"]))),
            vec!["20230103000000_c"]
        );
    }

    #[test]
    fn test_pending_fills_gaps() {
        let set = sample();
        // The newest migration is applied but the middle one never was.
        let pending = set.pending(&applied(&["20230101000000_a", "20230103000000_c"]));
        assert_eq!(ids(&pending), vec!["20230102000000_b"]);
    }

    #[test]
    fn test_pending_ignores_unknown_applied() {
        let set = sample();
        let pending = set.pending(&applied(&["19990101000000_gone"]));
        assert_eq!(pending.len(), 3);
    }

    #[test]
    fn test_pending_all_applied() {
        let set = sample();
        let all = applied(&[
            "20230101000000_a",
            "20230102000000_b",
            "20230103000000_c",
        ]);
        assert!(set.pending(&all).is_empty());
    }

    #[test]
    fn test_by_identity() {
        let set = sample();
        assert_eq!(
            set.by_identity("20230102000000_b").unwrap().identity,
            "20230102000000_b"
        );
        match set.by_identity("20230102000000") {
            Err(MigrationError::NotFound { identity }) => assert_eq!(identity, "20230102000000"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }
}
