//! Cache command handlers

use anyhow::{Context, Result};

use sketchstore_core::StorageManager;

use crate::commands::parse_value;
use crate::output::Output;

/// Print a cached resource if it is still fresh
pub async fn get(manager: &StorageManager, url: String, output: &Output) -> Result<()> {
    match manager.get_cached_resource(&url).await? {
        Some(value) => output.print_value(&value),
        None => anyhow::bail!("No fresh cache entry for {}", url),
    }
}

/// Cache a resource for 24 hours
pub async fn put(manager: &StorageManager, url: String, raw: String, output: &Output) -> Result<()> {
    manager
        .cache_resource(&url, parse_value(&raw))
        .await
        .context("Failed to cache resource")?;

    output.success(&format!("Cached {}", url));
    Ok(())
}
