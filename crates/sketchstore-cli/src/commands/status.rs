//! Status command handler

use anyhow::Result;

use sketchstore_core::{MigrationService, Namespace, StorageManager};

use crate::output::{human_size, Output, OutputFormat};

/// Show backend, usage and queue state
pub async fn show(manager: &StorageManager, output: &Output) -> Result<()> {
    let migration = MigrationService::new(manager);
    let stats = migration.storage_stats().await?;
    let migrated = migration.is_migrated().await?;
    let pending = manager.get_offline_queue().await?.len();
    let dead = manager.get_dead_letters().await?.len();
    let config = manager.config();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "backend": manager.backend(),
                    "data_dir": config.data_dir,
                    "migrated": migrated,
                    "legacy_available": manager.local_store_available(),
                    "queue": {
                        "pending": pending,
                        "dead_letters": dead
                    },
                    "storage": stats
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", manager.backend());
        }
        OutputFormat::Human => {
            println!("SketchStore Status");
            println!("==================");
            println!();
            println!("Storage:");
            println!("  Backend:  {}", manager.backend());
            println!("  Location: {}", config.data_dir.display());
            println!("  Migrated: {}", if migrated { "yes" } else { "no" });
            println!();
            println!("Namespaces:");
            for ns in Namespace::ALL {
                let usage = stats.enhanced.get(&ns).copied().unwrap_or_default();
                println!(
                    "  {:<13} {:>5} item(s)  {:>10}",
                    ns.as_str(),
                    usage.item_count,
                    human_size(usage.size_bytes)
                );
            }
            println!();
            println!("Legacy data:");
            if manager.local_store_available() {
                println!(
                    "  {} key(s), {} MB",
                    stats.legacy.item_count,
                    stats.legacy.size_mb()
                );
            } else {
                println!("  unavailable (local store could not be read)");
            }
            println!();
            println!("Offline queue:");
            println!("  Pending:      {}", pending);
            println!("  Dead letters: {}", dead);
        }
    }

    Ok(())
}
