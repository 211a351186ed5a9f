use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use migr8_core::Config;
use migr8_engine::{AnyDatabasePool, DatabasePool};

pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "configuration file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    let document = Config::sample_document()?;
    fs::write(path, document)
        .with_context(|| format!("failed to write config file {}", path.display()))?;

    println!("Configuration file created: {}", path.display());
    println!("Please edit the file to match your environment settings.");
    Ok(())
}

pub fn show(config: &Config) {
    print!("{}", render(config));
}

pub async fn test(config: &Config) -> Result<()> {
    let url = config.database_url()?;
    let db = &config.database;

    println!("Testing database connection...");
    println!("Driver: {}", db.driver);
    if db.url.is_none() {
        if let Some(port) = db.port() {
            println!("Host: {}:{}", db.host, port);
        }
        println!("Database: {}", db.database);
    }

    let pool = AnyDatabasePool::connect(&url)
        .await
        .context("connection failed")?;
    let latency = pool.health_check().await.context("connection failed")?;
    if let Err(e) = pool.close().await {
        tracing::warn!("failed to close database pool: {}", e);
    }

    println!("✓ Connection successful! ({} ms)", latency.as_millis());
    Ok(())
}

fn render(config: &Config) -> String {
    let db = &config.database;
    let mut out = String::from("Current Configuration:\n=====================\n\n");

    match &config.source {
        Some(path) => out.push_str(&format!("Loaded from: {}\n\n", path.display())),
        None => out.push_str("Loaded from: defaults and environment\n\n"),
    }

    out.push_str("Database:\n");
    out.push_str(&format!("  Driver:   {}\n", db.driver));
    if db.url.is_some() {
        out.push_str("  URL:      set (overrides the fields below)\n");
    }
    out.push_str(&format!("  Host:     {}\n", db.host));
    out.push_str(&format!(
        "  Port:     {}\n",
        db.port().map(|port| port.to_string()).unwrap_or_default()
    ));
    out.push_str(&format!("  Database: {}\n", db.database));
    out.push_str(&format!("  Username: {}\n", db.username));
    out.push_str(&format!("  Password: {}\n", db.masked_password()));
    out.push_str(&format!("  SSL Mode: {}\n", db.sslmode));

    out.push_str("\nMigration:\n");
    out.push_str(&format!("  Directory: {}\n", config.migration.directory.display()));
    out.push_str(&format!("  Table:     {}\n", config.migration.table));
    out.push_str(&format!("  Splitter:  {}\n", config.migration.splitter));

    out.push_str("\nOther:\n");
    out.push_str(&format!("  Verbose: {}\n", config.verbose));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_sample() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".migr8.yaml");

        init(&path, false).unwrap();

        let written = Config::from_file(&path).unwrap();
        assert_eq!(written.database, Config::sample().database);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".migr8.yaml");
        fs::write(&path, "verbose: true\n").unwrap();

        assert!(init(&path, false).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "verbose: true\n");

        init(&path, true).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("your_database"));
    }

    #[test]
    fn test_render_masks_password() {
        let rendered = render(&Config::sample());
        assert!(rendered.contains("  Password: yo****rd\n"));
        assert!(!rendered.contains("your_password"));
        assert!(rendered.contains("  Port:     5432\n"));
        assert!(rendered.contains("Loaded from: defaults and environment"));
    }
}
