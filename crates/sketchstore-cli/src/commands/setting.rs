//! Setting command handlers

use anyhow::{Context, Result};

use sketchstore_core::StorageManager;

use crate::commands::parse_value;
use crate::output::Output;

/// Print a setting
pub async fn get(manager: &StorageManager, key: String, output: &Output) -> Result<()> {
    let value = manager
        .get_setting_value(&key)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Setting not found: {}", key))?;

    output.print_value(&value)
}

/// Store a setting
pub async fn set(manager: &StorageManager, key: String, raw: String, output: &Output) -> Result<()> {
    let value = parse_value(&raw);
    manager
        .save_setting(&key, &value)
        .await
        .context("Failed to save setting")?;

    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}
