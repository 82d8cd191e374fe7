//! Offline queue command handlers

use anyhow::{Context, Result};

use sketchstore_core::{replay_offline_queue, LoggingReplayHandler, ReplaySummary, StorageManager};

use crate::output::{Output, OutputFormat};

/// List pending operations, oldest first
pub async fn list(manager: &StorageManager, output: &Output) -> Result<()> {
    let entries = manager.get_offline_queue().await?;
    output.print_queue(&entries, "Offline queue is empty.")
}

/// Replay pending operations
///
/// There is no remote end to push to, so operations are only logged and
/// drained.
pub async fn replay(manager: &StorageManager, output: &Output) -> Result<()> {
    let summary = replay_offline_queue(manager, &mut LoggingReplayHandler)
        .await
        .context("Failed to replay offline queue")?;

    if summary == ReplaySummary::default() {
        output.message("Offline queue is empty.");
        return Ok(());
    }

    match output.format {
        OutputFormat::Json => output.json(&summary)?,
        OutputFormat::Quiet => {}
        OutputFormat::Human => {
            println!("Replayed offline queue:");
            println!("  Processed:     {}", summary.processed);
            println!("  Skipped:       {}", summary.skipped);
            println!("  Failed:        {}", summary.failed);
            println!("  Dead-lettered: {}", summary.dead_lettered);
        }
    }
    Ok(())
}

/// Remove one pending operation
pub async fn remove(manager: &StorageManager, id: String, output: &Output) -> Result<()> {
    manager.remove_from_offline_queue(&id).await?;
    output.success(&format!("Removed {}", id));
    Ok(())
}

/// Drop every pending operation
pub async fn clear(manager: &StorageManager, output: &Output) -> Result<()> {
    manager.clear_offline_queue().await?;
    output.success("Offline queue cleared");
    Ok(())
}

/// List dead-lettered operations
pub async fn dead_letters(manager: &StorageManager, output: &Output) -> Result<()> {
    let entries = manager.get_dead_letters().await?;
    output.print_queue(&entries, "No dead letters.")
}

/// Move a dead letter back into the queue
pub async fn requeue(manager: &StorageManager, id: String, output: &Output) -> Result<()> {
    if !manager.requeue_dead_letter(&id).await? {
        anyhow::bail!("Dead letter not found: {}", id);
    }
    output.success(&format!("Requeued {}", id));
    Ok(())
}

/// Drop a dead letter
pub async fn discard(manager: &StorageManager, id: String, output: &Output) -> Result<()> {
    manager.discard_dead_letter(&id).await?;
    output.success(&format!("Discarded {}", id));
    Ok(())
}
