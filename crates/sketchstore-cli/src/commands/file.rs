//! File command handlers

use anyhow::{Context, Result};

use sketchstore_core::StorageManager;

use crate::output::Output;
use crate::prompt::confirm;

/// List all files, newest first
pub async fn list(manager: &StorageManager, output: &Output) -> Result<()> {
    let files = manager.get_all_files().await?;
    output.print_files(&files)
}

/// Show a single file
pub async fn show(manager: &StorageManager, name: String, output: &Output) -> Result<()> {
    let file = manager
        .get_file(&name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("File not found: {}", name))?;

    output.print_file(&file)
}

/// Delete a file
pub async fn delete(manager: &StorageManager, name: String, output: &Output) -> Result<()> {
    if manager.get_file(&name).await?.is_none() {
        anyhow::bail!("File not found: {}", name);
    }

    if output.should_prompt() {
        println!("Delete file: {}", name);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    manager
        .delete_file(&name)
        .await
        .context("Failed to delete file")?;

    output.success(&format!("Deleted file: {}", name));
    Ok(())
}
