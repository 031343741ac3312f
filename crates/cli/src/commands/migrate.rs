use tidemark_migrate::{
    MigrateConfig, MigrationCatalog, MigrationRollback, MigrationRunner, MigrationStatus,
    RollbackOptions,
};

pub async fn create(config: &MigrateConfig, name: &str) -> anyhow::Result<()> {
    let catalog = MigrationCatalog::new(&config.migrations_dir);
    let unit = catalog.create_unit(name)?;

    println!("Created migration: {}", unit.path.display());
    Ok(())
}

pub async fn run(config: &MigrateConfig) -> anyhow::Result<()> {
    let runner = MigrationRunner::from_config(config).await?;
    let result = runner.migrate().await?;

    if result.applied.is_empty() {
        println!("Nothing to migrate");
    } else {
        println!("Applied {} migration(s)", result.applied.len());
    }
    if !result.skipped_empty.is_empty() {
        println!(
            "Skipped {} migration(s) with an empty up script",
            result.skipped_empty.len()
        );
    }

    runner.database().close().await;
    Ok(())
}

pub async fn rollback(config: &MigrateConfig, all: bool) -> anyhow::Result<()> {
    let runner = MigrationRunner::from_config(config).await?;
    let result = runner.rollback(RollbackOptions { all }).await?;

    if result.reverted.is_empty() {
        println!("Nothing to roll back");
    } else {
        println!("Reverted {} migration(s)", result.reverted.len());
    }
    if !result.skipped_empty.is_empty() {
        println!(
            "Skipped {} migration(s) with an empty down script",
            result.skipped_empty.len()
        );
    }

    runner.database().close().await;
    Ok(())
}

pub async fn status(config: &MigrateConfig, json: bool) -> anyhow::Result<()> {
    let runner = MigrationRunner::from_config(config).await?;
    let statuses = runner.status().await?;
    runner.database().close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    println!("Migration Status:");
    println!("================");

    if statuses.is_empty() {
        println!("No migrations found");
        return Ok(());
    }

    for status in &statuses {
        println!("  {} {}-{}", marker(status), status.key, status.name);
    }
    println!(
        "\n✅ = Applied   ⏳ = Pending   ⚠️ = Applied, missing from {}",
        config.migrations_dir.display()
    );

    Ok(())
}

fn marker(status: &MigrationStatus) -> &'static str {
    match (status.applied, status.missing) {
        (true, true) => "⚠️",
        (true, false) => "✅",
        _ => "⏳",
    }
}
