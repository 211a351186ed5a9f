//! Migration Manager - File system operations for migrations
//!
//! Handles discovering migration files, pairing `.up.sql` / `.down.sql`
//! scripts into [`Migration`] records, and generating new migration pairs.

use chrono::{Local, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tinytemplate::TinyTemplate;

use super::definitions::{checksum, CreatedMigration, Migration, MigrationConfig};
use super::set::MigrationSet;
use crate::error::{LoadError, MigrationError, MigrationResult};

static MIGRATION_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{14})_(.+)\.(up|down)\.sql$").expect("migration file pattern is valid")
});

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

const UP_TEMPLATE: &str = "-- Migration: {name}
-- Created: {created}
-- Description: Add your up migration here

-- Example:
-- CREATE TABLE users (
--     id SERIAL PRIMARY KEY,
--     email VARCHAR(255) UNIQUE NOT NULL,
--     created_at TIMESTAMP DEFAULT NOW()
-- );
";

const DOWN_TEMPLATE: &str = "-- Migration: {name} (Down)
-- Created: {created}
-- Description: Add your down migration here

-- Example:
-- DROP TABLE IF EXISTS users;
";

#[derive(Serialize)]
struct TemplateContext<'a> {
    name: &'a str,
    created: String,
}

/// Record under construction while scanning the directory
#[derive(Default)]
struct PartialMigration {
    timestamp: Option<NaiveDateTime>,
    up: Option<(String, PathBuf)>,
    down: Option<String>,
}

/// Migration manager for creating and loading migrations
#[derive(Debug, Clone)]
pub struct MigrationManager {
    config: MigrationConfig,
}

impl MigrationManager {
    /// Create a new migration manager with default configuration
    pub fn new() -> Self {
        Self::with_config(MigrationConfig::default())
    }

    /// Create a new migration manager with custom configuration
    pub fn with_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Load all migrations from the migrations directory.
    ///
    /// A missing directory yields an empty set. Files that do not follow the
    /// `<14 digits>_<name>.(up|down).sql` convention are ignored.
    pub fn load_migrations(&self) -> Result<MigrationSet, LoadError> {
        let dir = &self.config.migrations_dir;
        if !dir.exists() {
            tracing::debug!(path = %dir.display(), "migrations directory does not exist");
            return Ok(MigrationSet::default());
        }

        let entries = fs::read_dir(dir).map_err(|source| LoadError::DirectoryUnreadable {
            path: dir.clone(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LoadError::DirectoryUnreadable {
                path: dir.clone(),
                source,
            })?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file {
                files.push(entry.path());
            }
        }
        files.sort();

        // Insertion order of identities, so ties on timestamp stay stable.
        let mut order: Vec<String> = Vec::new();
        let mut partials: HashMap<String, PartialMigration> = HashMap::new();

        for path in files {
            let Some((timestamp, identity, is_up)) = parse_file_name(&path) else {
                continue;
            };

            let content = fs::read_to_string(&path).map_err(|source| LoadError::FileUnreadable {
                path: path.clone(),
                source,
            })?;

            let partial = partials.entry(identity.clone()).or_insert_with(|| {
                order.push(identity.clone());
                PartialMigration {
                    timestamp: parse_timestamp(&timestamp),
                    ..Default::default()
                }
            });

            if is_up {
                partial.up = Some((content, path));
            } else {
                partial.down = Some(content);
            }
        }

        let mut migrations = Vec::with_capacity(order.len());
        for identity in order {
            let Some(partial) = partials.remove(&identity) else {
                continue;
            };
            let (up_sql, source_path) = match partial.up {
                Some((sql, path)) if !sql.is_empty() => (sql, path),
                _ => return Err(LoadError::MissingUpScript { identity }),
            };

            if partial.timestamp.is_none() {
                tracing::warn!(%identity, "migration timestamp is not a valid date, ordering it first");
            }

            migrations.push(Migration {
                checksum: checksum(&up_sql),
                timestamp: partial.timestamp.unwrap_or(NaiveDateTime::MIN),
                identity,
                up_sql,
                down_sql: partial.down.unwrap_or_default(),
                source_path,
            });
        }

        tracing::debug!(count = migrations.len(), path = %dir.display(), "loaded migrations");
        Ok(MigrationSet::new(migrations))
    }

    /// Create a new up/down migration pair named after `name`
    pub fn create_migration(&self, name: &str) -> MigrationResult<CreatedMigration> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(MigrationError::Template(
                "migration name must not be empty".to_string(),
            ));
        }

        let dir = &self.config.migrations_dir;
        fs::create_dir_all(dir)?;

        let now = Local::now();
        let identity = format!("{}_{}", now.format(TIMESTAMP_FORMAT), slug);
        let up_path = dir.join(format!("{}.up.sql", identity));
        let down_path = dir.join(format!("{}.down.sql", identity));

        for path in [&up_path, &down_path] {
            if path.exists() {
                return Err(MigrationError::AlreadyExists { path: path.clone() });
            }
        }

        let context = TemplateContext {
            name,
            created: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        let (up, down) = render_templates(&context)?;

        fs::write(&up_path, up)?;
        fs::write(&down_path, down)?;

        tracing::info!(%identity, "created migration");
        Ok(CreatedMigration {
            identity,
            up_path,
            down_path,
        })
    }
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Lower-case the name and replace spaces with underscores
pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Split a migration file name into (timestamp digits, identity, is_up)
fn parse_file_name(path: &Path) -> Option<(String, String, bool)> {
    let file_name = path.file_name()?.to_str()?;
    let caps = MIGRATION_FILE.captures(file_name)?;
    let timestamp = caps[1].to_string();
    let identity = format!("{}_{}", timestamp, &caps[2]);
    Some((timestamp, identity, &caps[3] == "up"))
}

fn parse_timestamp(digits: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(digits, TIMESTAMP_FORMAT).ok()
}

fn render_templates(context: &TemplateContext<'_>) -> MigrationResult<(String, String)> {
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("up", UP_TEMPLATE)
        .map_err(|e| MigrationError::Template(e.to_string()))?;
    tt.add_template("down", DOWN_TEMPLATE)
        .map_err(|e| MigrationError::Template(e.to_string()))?;

    let up = tt
        .render("up", context)
        .map_err(|e| MigrationError::Template(e.to_string()))?;
    let down = tt
        .render("down", context)
        .map_err(|e| MigrationError::Template(e.to_string()))?;
    Ok((up, down))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager_for(dir: &Path) -> MigrationManager {
        MigrationManager::with_config(MigrationConfig {
            migrations_dir: dir.to_path_buf(),
            ..MigrationConfig::default()
        })
    }

    #[test]
    fn test_load_pairs_up_and_down() {
        let temp_dir = TempDir::new().unwrap();
        let up = "CREATE TABLE users (id INTEGER PRIMARY KEY);";
        let down = "DROP TABLE users;";
        fs::write(temp_dir.path().join("20230101120000_create_users.up.sql"), up).unwrap();
        fs::write(temp_dir.path().join("20230101120000_create_users.down.sql"), down).unwrap();

        let set = manager_for(temp_dir.path()).load_migrations().unwrap();
        assert_eq!(set.len(), 1);

        let migration = set.by_identity("20230101120000_create_users").unwrap();
        assert_eq!(migration.up_sql, up);
        assert_eq!(migration.down_sql, down);
        assert_eq!(migration.checksum, checksum(up));
        assert_eq!(
            migration.source_path,
            temp_dir.path().join("20230101120000_create_users.up.sql")
        );
        assert_eq!(
            migration.timestamp,
            NaiveDateTime::parse_from_str("20230101120000", TIMESTAMP_FORMAT).unwrap()
        );
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let set = manager_for(&temp_dir.path().join("nope")).load_migrations().unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_directory_that_is_a_file_is_unreadable() {
        let temp_dir = TempDir::new().unwrap();
        let not_a_dir = temp_dir.path().join("migrations");
        fs::write(&not_a_dir, "not a directory").unwrap();

        let err = manager_for(&not_a_dir).load_migrations().unwrap_err();
        match err {
            LoadError::DirectoryUnreadable { path, .. } => assert_eq!(path, not_a_dir),
            other => panic!("expected DirectoryUnreadable, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let set = manager_for(temp_dir.path()).load_migrations().unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_down_without_up_is_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("20230101120000_orphan.down.sql"), "DROP TABLE x;").unwrap();

        let err = manager_for(temp_dir.path()).load_migrations().unwrap_err();
        match err {
            LoadError::MissingUpScript { identity } => {
                assert_eq!(identity, "20230101120000_orphan")
            }
            other => panic!("expected MissingUpScript, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_up_is_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("20230101120000_blank.up.sql"), "").unwrap();

        let err = manager_for(temp_dir.path()).load_migrations().unwrap_err();
        assert!(matches!(err, LoadError::MissingUpScript { .. }));
    }

    #[test]
    fn test_ignores_non_matching_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("README.md"), "notes").unwrap();
        fs::write(temp_dir.path().join("2023_short.up.sql"), "SELECT 1;").unwrap();
        fs::write(temp_dir.path().join("20230101120000_x.sql"), "SELECT 1;").unwrap();
        fs::write(temp_dir.path().join("20230101120000_x.sideways.sql"), "SELECT 1;").unwrap();
        fs::write(temp_dir.path().join("２０２３０１０１１２００００_wide.up.sql"), "SELECT 1;").unwrap();
        fs::create_dir(temp_dir.path().join("20230101120000_dir.up.sql")).unwrap();
        fs::write(temp_dir.path().join("20230101120000_real.up.sql"), "SELECT 1;").unwrap();

        let set = manager_for(temp_dir.path()).load_migrations().unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains("20230101120000_real"));
    }

    #[test]
    fn test_sorted_by_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        for id in [
            "20240301000000_third",
            "20230101000000_first",
            "20231231235959_second",
        ] {
            fs::write(temp_dir.path().join(format!("{}.up.sql", id)), "SELECT 1;").unwrap();
        }

        let set = manager_for(temp_dir.path()).load_migrations().unwrap();
        let ids: Vec<_> = set.iter().map(|m| m.identity.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "20230101000000_first",
                "20231231235959_second",
                "20240301000000_third"
            ]
        );
    }

    #[test]
    fn test_missing_down_is_irreversible() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("20230101120000_oneway.up.sql"), "SELECT 1;").unwrap();

        let set = manager_for(temp_dir.path()).load_migrations().unwrap();
        let migration = set.by_identity("20230101120000_oneway").unwrap();
        assert!(!migration.is_reversible());
    }

    #[test]
    fn test_create_migration_writes_pair() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("migrations");
        let manager = manager_for(&dir);

        let created = manager.create_migration("Create Users Table").unwrap();
        assert!(created.identity.ends_with("_create_users_table"));
        assert_eq!(created.identity.find('_'), Some(14));
        assert!(created.up_path.exists());
        assert!(created.down_path.exists());
        assert!(created.up_path.ends_with(format!("{}.up.sql", created.identity)));
        assert!(created.down_path.ends_with(format!("{}.down.sql", created.identity)));

        let up = fs::read_to_string(&created.up_path).unwrap();
        assert!(up.starts_with("-- Migration: Create Users Table\n"));
        let down = fs::read_to_string(&created.down_path).unwrap();
        assert!(down.contains("(Down)"));
        assert!(down.contains("DROP TABLE IF EXISTS users;"));

        // Templates are comments only, which still count as an up script.
        let set = manager.load_migrations().unwrap();
        assert!(set.contains(&created.identity));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Add Index"), "add_index");
        assert_eq!(slugify("  spaced  "), "spaced");
        assert_eq!(slugify("already_slug"), "already_slug");
    }
}
