use anyhow::{bail, Context, Result};
use migr8_core::Config;
use migr8_engine::{
    MigrationConfig, MigrationManager, MigrationStatus, Migrator, StatementSplitter, StatusReport,
    VerifyReport,
};

/// How many migrations `migrate down` rolls back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Steps {
    Count(i64),
    All,
}

impl Steps {
    /// Value passed to the engine, where anything non-positive means all
    fn as_engine_steps(self) -> i64 {
        match self {
            Steps::Count(n) => n,
            Steps::All => 0,
        }
    }
}

pub fn parse_steps(value: &str) -> Result<Steps, String> {
    if value.eq_ignore_ascii_case("all") {
        return Ok(Steps::All);
    }
    match value.parse::<i64>() {
        Ok(n) if n > 0 => Ok(Steps::Count(n)),
        Ok(_) => Err("steps must be a positive number".to_string()),
        Err(_) => Err(format!("invalid steps argument: {}", value)),
    }
}

pub fn migration_config(config: &Config) -> Result<MigrationConfig> {
    let splitter = config
        .migration
        .splitter
        .parse::<StatementSplitter>()
        .map_err(anyhow::Error::msg)?;

    Ok(MigrationConfig {
        migrations_dir: config.migration.directory.clone(),
        migrations_table: config.migration.table.clone(),
        splitter,
    })
}

async fn connect(config: &Config) -> Result<Migrator> {
    if let Some(source) = &config.source {
        tracing::debug!("using config file: {}", source.display());
    }

    let url = config.database_url()?;
    Migrator::connect(migration_config(config)?, &url)
        .await
        .with_context(|| format!("failed to connect to {} database", config.database.driver))
}

async fn close(migrator: &Migrator) {
    if let Err(e) = migrator.pool().close().await {
        tracing::warn!("failed to close database pool: {}", e);
    }
}

pub async fn up(config: &Config) -> Result<()> {
    let migrator = connect(config).await?;
    let outcome = migrator.up().await;
    close(&migrator).await;
    let result = outcome.context("migration failed")?;

    if result.applied_count == 0 {
        println!("No pending migrations found.");
        return Ok(());
    }

    for identity in &result.applied_migrations {
        println!("Applied migration: {}", identity);
    }
    println!(
        "All migrations applied successfully! ({} applied in {} ms)",
        result.applied_count, result.execution_time_ms
    );
    Ok(())
}

pub async fn down(config: &Config, steps: Steps) -> Result<()> {
    let migrator = connect(config).await?;
    let outcome = migrator.down(steps.as_engine_steps()).await;
    close(&migrator).await;
    let result = outcome.context("rollback failed")?;

    if result.rolled_back_count == 0 {
        println!("No migrations to rollback.");
        return Ok(());
    }

    for identity in &result.rolled_back_migrations {
        println!("Rolled back migration: {}", identity);
    }
    println!(
        "Rollback completed successfully! ({} rolled back in {} ms)",
        result.rolled_back_count, result.execution_time_ms
    );
    Ok(())
}

pub async fn status(config: &Config, json: bool) -> Result<()> {
    let migrator = connect(config).await?;
    let outcome = migrator.status().await;
    close(&migrator).await;
    let report = outcome.context("failed to read migration status")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_status(&report));
    }
    Ok(())
}

/// Create does not touch the database
pub fn create(config: &Config, name: &str) -> Result<()> {
    let manager = MigrationManager::with_config(migration_config(config)?);
    let created = manager
        .create_migration(name)
        .context("failed to create migration")?;

    println!("Created new migration: {}", created.identity);
    println!("  {}", created.up_path.display());
    println!("  {}", created.down_path.display());
    Ok(())
}

pub async fn verify(config: &Config) -> Result<()> {
    let migrator = connect(config).await?;
    let outcome = migrator.verify().await;
    close(&migrator).await;
    let report = outcome.context("failed to verify migrations")?;

    print!("{}", render_verify(&report));
    if !report.is_clean() {
        bail!(
            "{} modified and {} missing migration(s)",
            report.mismatched.len(),
            report.missing.len()
        );
    }
    Ok(())
}

fn render_status(report: &StatusReport) -> String {
    let mut out = String::from("Migration Status:\n================\n\n");

    if report.migrations.is_empty() {
        out.push_str("No migrations found.\n");
    }
    for entry in &report.migrations {
        let mark = match entry.status {
            MigrationStatus::Applied => "[✓]",
            MigrationStatus::Pending => "[ ]",
        };
        out.push_str(&format!("{} {}\n", mark, entry.identity));
    }

    if !report.orphaned.is_empty() {
        out.push_str("\nApplied but missing on disk:\n");
        for identity in &report.orphaned {
            out.push_str(&format!("[!] {}\n", identity));
        }
    }

    out.push_str(&format!(
        "\nTotal: {} migrations, {} applied, {} pending\n",
        report.total, report.applied, report.pending
    ));
    out
}

fn render_verify(report: &VerifyReport) -> String {
    let mut out = format!("Verified {} migration(s)\n", report.verified);
    for mismatch in &report.mismatched {
        out.push_str(&format!(
            "Modified: {} (recorded {}, on disk {})\n",
            mismatch.identity, mismatch.recorded, mismatch.current
        ));
    }
    for identity in &report.missing {
        out.push_str(&format!("Missing:  {}\n", identity));
    }
    out
}
