//! Migration command handlers

use anyhow::{Context, Result};

use sketchstore_core::{MigrationOutcome, MigrationService, StepStatus, StorageManager};

use crate::output::{Output, OutputFormat};

/// Migrate the legacy layout if that has not happened yet
pub async fn migrate(manager: &StorageManager, output: &Output) -> Result<()> {
    let outcome = MigrationService::new(manager)
        .check_and_migrate()
        .await
        .context("Migration failed")?;

    match output.format {
        OutputFormat::Json => output.json(&outcome)?,
        OutputFormat::Quiet => {}
        OutputFormat::Human => match outcome {
            MigrationOutcome::AlreadyMigrated => println!("Already migrated."),
            MigrationOutcome::LegacyUnavailable => {
                println!("Legacy data could not be read; nothing migrated.")
            }
            MigrationOutcome::Migrated(report) => {
                println!("Migration report:");
                for step in &report.steps {
                    println!(
                        "  {:<13} {:<9} {} copied",
                        format!("{:?}", step.step),
                        status_label(step.status),
                        step.copied.len()
                    );
                    for error in &step.errors {
                        println!("    error: {}", error);
                    }
                }
            }
        },
    }
    Ok(())
}

/// Remove legacy keys after a migration
pub async fn cleanup(manager: &StorageManager, output: &Output) -> Result<()> {
    if MigrationService::new(manager).cleanup_old_data().await? {
        output.success("Legacy data removed");
    } else {
        anyhow::bail!("Not migrated yet; run `sketchstore migrate` first");
    }
    Ok(())
}

/// Write files back to the legacy layout and clear the migration flag
pub async fn rollback(manager: &StorageManager, output: &Output) -> Result<()> {
    let report = MigrationService::new(manager)
        .rollback_to_local_storage()
        .await
        .context("Rollback failed")?;

    match output.format {
        OutputFormat::Json => output.json(&report)?,
        _ => output.success(&format!(
            "Rolled back {} file(s) to the legacy layout",
            report.files_restored
        )),
    }
    Ok(())
}

fn status_label(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Completed => "completed",
        StepStatus::Partial => "partial",
        StepStatus::Failed => "failed",
        StepStatus::Skipped => "skipped",
    }
}
