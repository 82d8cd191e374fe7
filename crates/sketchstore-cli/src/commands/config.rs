//! Config command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use sketchstore_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "force_fallback": config.force_fallback,
                    "max_retries": config.max_retries,
                    "sqlite_path": config.sqlite_path(),
                    "local_store_path": config.local_store_path()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:       {}", config.data_dir.display());
            println!("  force_fallback: {}", config.force_fallback);
            println!("  max_retries:    {}", config.max_retries);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}
