//! Export, import and clear handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use sketchstore_core::{Snapshot, StorageManager};

use crate::output::Output;
use crate::prompt::confirm;

/// Export every namespace to stdout or a file
pub async fn export(
    manager: &StorageManager,
    path: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let snapshot = manager.export_data().await?;

    match path {
        Some(path) => {
            let json = serde_json::to_string_pretty(&snapshot)?;
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write export file: {:?}", path))?;
            output.success(&format!(
                "Exported {} record(s) to {}",
                snapshot.record_count(),
                path.display()
            ));
        }
        None => output.json(&snapshot)?,
    }
    Ok(())
}

/// Merge an exported snapshot into storage
pub async fn import(manager: &StorageManager, path: PathBuf, output: &Output) -> Result<()> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read import file: {:?}", path))?;
    let snapshot = Snapshot::from_json(&content)
        .with_context(|| format!("Invalid export file: {:?}", path))?;

    let written = manager
        .import_data(&snapshot)
        .await
        .context("Failed to import data")?;

    output.success(&format!("Imported {} record(s)", written));
    Ok(())
}

/// Clear every namespace
pub async fn clear(manager: &StorageManager, yes: bool, output: &Output) -> Result<()> {
    if !yes {
        if !output.should_prompt() {
            anyhow::bail!("Refusing to clear all data without --yes");
        }
        println!("This deletes all files, settings, cache and queued operations.");
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    manager
        .clear_all_data()
        .await
        .context("Failed to clear data")?;

    output.success("All data cleared");
    Ok(())
}
