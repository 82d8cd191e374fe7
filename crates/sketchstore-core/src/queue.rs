//! Offline operation queue
//!
//! Operations recorded while offline are kept in the `offlineQueue`
//! namespace until a replay applies them. An entry that keeps failing is
//! moved to the `deadLetter` namespace once it reaches the configured
//! retry ceiling, where it waits for manual inspection.
//!
//! Replay is driven by the caller through [`replay_offline_queue`] and a
//! [`ReplayHandler`]; the storage manager itself never talks to a server.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::manager::{load_prefixed, load_record, StorageManager};
use crate::models::{KnownOperation, OfflineOperation, QueueEntry};
use crate::storage::{Namespace, StorageResult};

/// Key prefix of queue entry ids
pub const QUEUE_ID_PREFIX: &str = "queue_";

const QUEUE_ID_SUFFIX_LEN: usize = 9;

/// What happened to an entry after a failed replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum QueueDisposition {
    /// Still queued, with this many failed attempts
    Retrying { retries: u32 },
    /// Moved to the dead-letter namespace
    DeadLettered,
    /// No queued entry had that id
    Missing,
}

impl StorageManager {
    /// Append an operation to the offline queue
    pub async fn add_to_offline_queue(
        &self,
        operation: OfflineOperation,
    ) -> StorageResult<QueueEntry> {
        let timestamp = self.now_millis();
        let store = self.store(Namespace::OfflineQueue);

        let mut id = new_queue_id(timestamp);
        while store.get_item(&id).await?.is_some() {
            debug!("Queue id {} already taken, regenerating", id);
            id = new_queue_id(timestamp);
        }

        let entry = QueueEntry {
            id,
            operation,
            timestamp,
            retries: 0,
            last_error: None,
        };
        store.set_item(&entry.id, &serde_json::to_value(&entry)?).await?;

        info!(
            "Queued offline {} operation as {}",
            entry.operation.kind(),
            entry.id
        );
        Ok(entry)
    }

    /// Pending operations, oldest first
    ///
    /// Entries queued in the same millisecond keep their insertion order.
    pub async fn get_offline_queue(&self) -> StorageResult<Vec<QueueEntry>> {
        let store = self.store(Namespace::OfflineQueue);
        let mut entries: Vec<QueueEntry> = load_prefixed(store, "").await?;
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }

    /// Remove one queued operation
    pub async fn remove_from_offline_queue(&self, id: &str) -> StorageResult<()> {
        self.store(Namespace::OfflineQueue).remove_item(id).await
    }

    /// Drop every queued operation
    pub async fn clear_offline_queue(&self) -> StorageResult<()> {
        self.store(Namespace::OfflineQueue).clear().await?;
        info!("Offline queue cleared");
        Ok(())
    }

    /// Record a failed replay of `id`
    ///
    /// The entry moves to the dead-letter namespace once its retry count
    /// reaches `max_retries`.
    pub async fn record_queue_failure(
        &self,
        id: &str,
        reason: &str,
    ) -> StorageResult<QueueDisposition> {
        let queue = self.store(Namespace::OfflineQueue);
        let Some(mut entry) = load_record::<QueueEntry>(queue, id).await? else {
            return Ok(QueueDisposition::Missing);
        };

        entry.retries += 1;
        entry.last_error = Some(reason.to_string());

        if entry.retries >= self.config().max_retries {
            self.store(Namespace::DeadLetter)
                .set_item(id, &serde_json::to_value(&entry)?)
                .await?;
            queue.remove_item(id).await?;
            warn!(
                "Queue entry {} dead-lettered after {} attempts: {}",
                id, entry.retries, reason
            );
            return Ok(QueueDisposition::DeadLettered);
        }

        queue.set_item(id, &serde_json::to_value(&entry)?).await?;
        Ok(QueueDisposition::Retrying {
            retries: entry.retries,
        })
    }

    /// Dead-lettered entries, oldest first
    pub async fn get_dead_letters(&self) -> StorageResult<Vec<QueueEntry>> {
        let store = self.store(Namespace::DeadLetter);
        let mut entries: Vec<QueueEntry> = load_prefixed(store, "").await?;
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }

    /// Move a dead-lettered entry back into the queue with its retries reset
    ///
    /// Returns `false` if no dead letter has that id.
    pub async fn requeue_dead_letter(&self, id: &str) -> StorageResult<bool> {
        let dead = self.store(Namespace::DeadLetter);
        let Some(mut entry) = load_record::<QueueEntry>(dead, id).await? else {
            return Ok(false);
        };

        entry.retries = 0;
        self.store(Namespace::OfflineQueue)
            .set_item(id, &serde_json::to_value(&entry)?)
            .await?;
        dead.remove_item(id).await?;

        info!("Dead letter {} requeued", id);
        Ok(true)
    }

    /// Permanently drop a dead-lettered entry
    pub async fn discard_dead_letter(&self, id: &str) -> StorageResult<()> {
        self.store(Namespace::DeadLetter).remove_item(id).await
    }

    /// Permanently drop every dead-lettered entry
    pub async fn clear_dead_letters(&self) -> StorageResult<()> {
        self.store(Namespace::DeadLetter).clear().await
    }
}

/// `queue_<millis>_<random>`
fn new_queue_id(timestamp: i64) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}{}_{}",
        QUEUE_ID_PREFIX,
        timestamp,
        &random[..QUEUE_ID_SUFFIX_LEN]
    )
}

/// Applies queued operations during replay
pub trait ReplayHandler {
    /// Apply one operation. An error leaves the entry queued.
    fn apply(
        &mut self,
        operation: &KnownOperation,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Replay handler that only logs each operation
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingReplayHandler;

impl ReplayHandler for LoggingReplayHandler {
    async fn apply(&mut self, operation: &KnownOperation) -> anyhow::Result<()> {
        match operation {
            KnownOperation::Save { data, .. } => info!("Replaying save of {}", data.name),
            KnownOperation::Delete {
                file_id, file_name, ..
            } => info!(
                "Replaying delete of {}",
                file_name.as_deref().unwrap_or(file_id)
            ),
        }
        Ok(())
    }
}

/// Counts from one replay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    /// Applied and removed from the queue
    pub processed: usize,
    /// Unrecognized kinds, removed without applying
    pub skipped: usize,
    /// Failed to apply or malformed, still queued or dead-lettered
    pub failed: usize,
    /// Subset of `failed` that hit the retry ceiling
    pub dead_lettered: usize,
}

/// Replay every queued operation in order
///
/// Operations are dispatched on their `type` tag. A `save` or `delete` whose
/// payload cannot be completed counts as a failure, like a handler error: it
/// is recorded against the entry and the pass continues. Only kinds replay
/// does not handle are skipped. Storage errors abort the pass.
pub async fn replay_offline_queue<H: ReplayHandler>(
    manager: &StorageManager,
    handler: &mut H,
) -> StorageResult<ReplaySummary> {
    let entries = manager.get_offline_queue().await?;
    let mut summary = ReplaySummary::default();

    if !entries.is_empty() {
        info!("Processing {} offline operations", entries.len());
    }

    for entry in entries {
        let operation = match entry.operation.resolve(manager.clock().now()) {
            Ok(Some(operation)) => operation,
            Ok(None) => {
                warn!(
                    "Skipping queue entry {} with unsupported operation {}",
                    entry.id,
                    entry.operation.kind()
                );
                debug!("Unsupported operation: {:?}", entry.operation);
                manager.remove_from_offline_queue(&entry.id).await?;
                summary.skipped += 1;
                continue;
            }
            Err(reason) => {
                error!(
                    "Malformed {} operation in {}: {}",
                    entry.operation.kind(),
                    entry.id,
                    reason
                );
                record_failure(manager, &entry.id, &reason, &mut summary).await?;
                continue;
            }
        };

        match handler.apply(&operation).await {
            Ok(()) => {
                manager.remove_from_offline_queue(&entry.id).await?;
                summary.processed += 1;
            }
            Err(e) => {
                error!("Failed to replay {}: {:#}", entry.id, e);
                record_failure(manager, &entry.id, &format!("{:#}", e), &mut summary).await?;
            }
        }
    }

    Ok(summary)
}

async fn record_failure(
    manager: &StorageManager,
    id: &str,
    reason: &str,
    summary: &mut ReplaySummary,
) -> StorageResult<()> {
    summary.failed += 1;
    if manager.record_queue_failure(id, reason).await? == QueueDisposition::DeadLettered {
        summary.dead_lettered += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::models::FileRecord;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;

    async fn manager_with_retries(max_retries: u32) -> (StorageManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let mut config = Config::default();
        config.max_retries = max_retries;
        let manager = StorageManager::in_memory(config, clock.clone())
            .await
            .unwrap();
        (manager, clock)
    }

    fn delete_op(id: &str) -> OfflineOperation {
        OfflineOperation::delete(id, None)
    }

    /// Fails every operation whose file id is listed
    struct FailingHandler {
        fail: HashSet<String>,
        applied: Vec<String>,
    }

    impl ReplayHandler for FailingHandler {
        async fn apply(&mut self, operation: &KnownOperation) -> anyhow::Result<()> {
            let id = match operation {
                KnownOperation::Save { data, .. } => data.id.clone(),
                KnownOperation::Delete { file_id, .. } => file_id.clone(),
            };
            if self.fail.contains(&id) {
                anyhow::bail!("server rejected {}", id);
            }
            self.applied.push(id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_same_millisecond_ids_are_distinct() {
        let (manager, _) = manager_with_retries(5).await;

        let a = manager.add_to_offline_queue(delete_op("a")).await.unwrap();
        let b = manager.add_to_offline_queue(delete_op("b")).await.unwrap();

        assert_eq!(a.timestamp, b.timestamp);
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("queue_0_"));
        assert_eq!(a.id.len(), "queue_0_".len() + QUEUE_ID_SUFFIX_LEN);
        assert_eq!(manager.get_offline_queue().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_queue_is_ordered_by_timestamp() {
        let (manager, clock) = manager_with_retries(5).await;

        for t in [5, 2, 9] {
            clock.set(t);
            manager.add_to_offline_queue(delete_op("x")).await.unwrap();
        }

        let order: Vec<i64> = manager
            .get_offline_queue()
            .await
            .unwrap()
            .iter()
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(order, vec![2, 5, 9]);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let (manager, _) = manager_with_retries(5).await;

        let a = manager.add_to_offline_queue(delete_op("a")).await.unwrap();
        manager.add_to_offline_queue(delete_op("b")).await.unwrap();

        manager.remove_from_offline_queue(&a.id).await.unwrap();
        assert_eq!(manager.get_offline_queue().await.unwrap().len(), 1);

        manager.clear_offline_queue().await.unwrap();
        assert!(manager.get_offline_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failures_dead_letter_at_ceiling() {
        let (manager, _) = manager_with_retries(2).await;
        let entry = manager.add_to_offline_queue(delete_op("a")).await.unwrap();

        assert_eq!(
            manager.record_queue_failure(&entry.id, "offline").await.unwrap(),
            QueueDisposition::Retrying { retries: 1 }
        );
        assert_eq!(
            manager.record_queue_failure(&entry.id, "still offline").await.unwrap(),
            QueueDisposition::DeadLettered
        );
        assert_eq!(
            manager.record_queue_failure(&entry.id, "gone").await.unwrap(),
            QueueDisposition::Missing
        );

        assert!(manager.get_offline_queue().await.unwrap().is_empty());
        let dead = manager.get_dead_letters().await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].retries, 2);
        assert_eq!(dead[0].last_error.as_deref(), Some("still offline"));
    }

    #[tokio::test]
    async fn test_requeue_and_discard_dead_letters() {
        let (manager, _) = manager_with_retries(1).await;
        let a = manager.add_to_offline_queue(delete_op("a")).await.unwrap();
        let b = manager.add_to_offline_queue(delete_op("b")).await.unwrap();
        manager.record_queue_failure(&a.id, "x").await.unwrap();
        manager.record_queue_failure(&b.id, "x").await.unwrap();

        assert!(manager.requeue_dead_letter(&a.id).await.unwrap());
        assert!(!manager.requeue_dead_letter("queue_missing").await.unwrap());

        let queue = manager.get_offline_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, a.id);
        assert_eq!(queue[0].retries, 0);

        manager.discard_dead_letter(&b.id).await.unwrap();
        assert!(manager.get_dead_letters().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_dead_letters() {
        let (manager, _) = manager_with_retries(1).await;
        let a = manager.add_to_offline_queue(delete_op("a")).await.unwrap();
        manager.record_queue_failure(&a.id, "x").await.unwrap();

        manager.clear_dead_letters().await.unwrap();
        assert!(manager.store(Namespace::DeadLetter).keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_operation_survives_storage() {
        let (manager, _) = manager_with_retries(5).await;
        let raw = json!({ "type": "rename", "fileId": "1", "to": "New" });

        manager
            .add_to_offline_queue(OfflineOperation::Other(raw.clone()))
            .await
            .unwrap();

        let queue = manager.get_offline_queue().await.unwrap();
        assert_eq!(queue[0].operation, OfflineOperation::Other(raw));
        assert_eq!(queue[0].operation.kind(), "rename");
    }

    #[tokio::test]
    async fn test_replay_applies_in_order_and_skips_unknown() {
        let (manager, clock) = manager_with_retries(5).await;

        clock.set(3);
        manager.add_to_offline_queue(delete_op("late")).await.unwrap();
        clock.set(1);
        let record = FileRecord::new("Plan");
        let record_id = record.id.clone();
        manager
            .add_to_offline_queue(OfflineOperation::save(record))
            .await
            .unwrap();
        clock.set(2);
        manager
            .add_to_offline_queue(OfflineOperation::Other(json!({ "type": "sync" })))
            .await
            .unwrap();

        let mut handler = FailingHandler {
            fail: HashSet::new(),
            applied: Vec::new(),
        };
        let summary = replay_offline_queue(&manager, &mut handler).await.unwrap();

        assert_eq!(
            summary,
            ReplaySummary {
                processed: 2,
                skipped: 1,
                failed: 0,
                dead_lettered: 0
            }
        );
        assert_eq!(handler.applied, vec![record_id, "late".to_string()]);
        assert!(manager.get_offline_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replay_failures_are_retried_then_dead_lettered() {
        let (manager, _) = manager_with_retries(2).await;
        manager.add_to_offline_queue(delete_op("bad")).await.unwrap();
        manager.add_to_offline_queue(delete_op("good")).await.unwrap();

        let mut handler = FailingHandler {
            fail: HashSet::from(["bad".to_string()]),
            applied: Vec::new(),
        };

        let first = replay_offline_queue(&manager, &mut handler).await.unwrap();
        assert_eq!(first.processed, 1);
        assert_eq!(first.failed, 1);
        assert_eq!(first.dead_lettered, 0);

        let queue = manager.get_offline_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].retries, 1);
        assert!(queue[0]
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("server rejected bad")));

        let second = replay_offline_queue(&manager, &mut handler).await.unwrap();
        assert_eq!(second.failed, 1);
        assert_eq!(second.dead_lettered, 1);
        assert!(manager.get_offline_queue().await.unwrap().is_empty());
        assert_eq!(manager.get_dead_letters().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replay_fills_in_partial_save() {
        let (manager, _) = manager_with_retries(5).await;
        manager
            .add_to_offline_queue(OfflineOperation::Other(json!({
                "type": "save",
                "fileId": "f1",
                "data": { "id": "f1", "name": "Plan", "elements": [] }
            })))
            .await
            .unwrap();

        let mut handler = FailingHandler {
            fail: HashSet::new(),
            applied: Vec::new(),
        };
        let summary = replay_offline_queue(&manager, &mut handler).await.unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(handler.applied, vec!["f1".to_string()]);
        assert!(manager.get_offline_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replay_keeps_malformed_save_for_retry() {
        let (manager, _) = manager_with_retries(2).await;
        let raw = json!({ "type": "save", "fileId": "f1", "data": { "id": "f1" } });
        let entry = manager
            .add_to_offline_queue(OfflineOperation::Other(raw.clone()))
            .await
            .unwrap();

        let first = replay_offline_queue(&manager, &mut LoggingReplayHandler)
            .await
            .unwrap();
        assert_eq!(
            first,
            ReplaySummary {
                processed: 0,
                skipped: 0,
                failed: 1,
                dead_lettered: 0
            }
        );

        let queue = manager.get_offline_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].operation, OfflineOperation::Other(raw));
        assert_eq!(queue[0].retries, 1);

        let second = replay_offline_queue(&manager, &mut LoggingReplayHandler)
            .await
            .unwrap();
        assert_eq!(second.dead_lettered, 1);
        assert_eq!(manager.get_dead_letters().await.unwrap()[0].id, entry.id);
    }

    #[tokio::test]
    async fn test_fallback_queue_keeps_same_millisecond_order() {
        let mut config = Config::default();
        config.force_fallback = true;
        let manager = StorageManager::in_memory(config, Arc::new(ManualClock::new(0)))
            .await
            .unwrap();

        let ids: Vec<String> = (0..8).map(|i| format!("f{}", i)).collect();
        for id in &ids {
            manager.add_to_offline_queue(delete_op(id)).await.unwrap();
        }

        let mut handler = FailingHandler {
            fail: HashSet::new(),
            applied: Vec::new(),
        };
        replay_offline_queue(&manager, &mut handler).await.unwrap();
        assert_eq!(handler.applied, ids);
    }

    #[tokio::test]
    async fn test_logging_handler_drains_queue() {
        let (manager, _) = manager_with_retries(5).await;
        manager
            .add_to_offline_queue(OfflineOperation::save(FileRecord::new("Plan")))
            .await
            .unwrap();
        manager
            .add_to_offline_queue(OfflineOperation::delete("1", Some("Old".to_string())))
            .await
            .unwrap();

        let summary = replay_offline_queue(&manager, &mut LoggingReplayHandler)
            .await
            .unwrap();
        assert_eq!(summary.processed, 2);
        assert!(manager.get_offline_queue().await.unwrap().is_empty());
    }
}
