//! Migration from the legacy flat layout
//!
//! Before namespaced storage existed the application kept three flat keys
//! in the local store:
//!
//! - `sketch-files`: JSON array of file entries
//! - `sketch-last-file`: id of the last opened file (plain string)
//! - `sketch-offline-changes`: JSON array of queued operations
//!
//! [`MigrationService::check_and_migrate`] copies them into the namespaced
//! store once, guarded by the `storage_migrated_v1` setting. Each step runs
//! on its own; a failing step is reported and the others still run. The
//! legacy keys are left in place until [`MigrationService::cleanup_old_data`]
//! is called explicitly.
//!
//! Concurrent migrations on one manager are serialized. Two processes
//! migrating the same data directory at the same time are not.
//!
//! When the local store file could not be loaded the legacy keys cannot be
//! read, so the migration is postponed and the flag stays unset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::manager::{StorageManager, FILE_PREFIX};
use crate::models::{FileRecord, NamespaceUsage, OfflineOperation};
use crate::storage::{LocalStore, Namespace, StorageError, StorageResult};

/// Setting that marks the migration as done
pub const MIGRATION_FLAG_KEY: &str = "storage_migrated_v1";

/// Setting holding the report of the last migration
pub const MIGRATION_REPORT_KEY: &str = "storage_migration_report_v1";

/// Setting holding the last opened file id
pub const LAST_OPENED_FILE_KEY: &str = "lastOpenedFile";

/// Setting holding the raw legacy file list
pub const FILES_LIST_KEY: &str = "filesList";

pub const LEGACY_FILES_KEY: &str = "sketch-files";
pub const LEGACY_LAST_FILE_KEY: &str = "sketch-last-file";
pub const LEGACY_OFFLINE_CHANGES_KEY: &str = "sketch-offline-changes";

/// Prefix shared by every legacy key
pub const LEGACY_PREFIX: &str = "sketch-";

/// One migration step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MigrationStep {
    Files,
    Settings,
    OfflineQueue,
}

/// How a step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepStatus {
    /// Everything present was copied
    Completed,
    /// Some entries were copied, some failed
    Partial,
    /// Nothing could be copied
    Failed,
    /// No legacy data for this step
    Skipped,
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub step: MigrationStep,
    pub status: StepStatus,
    /// Identifiers of the records written
    pub copied: Vec<String>,
    pub errors: Vec<String>,
}

impl StepReport {
    fn new(step: MigrationStep) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            copied: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn finish(mut self, found_data: bool) -> Self {
        self.status = match (found_data, self.copied.is_empty(), self.errors.is_empty()) {
            (false, _, true) => StepStatus::Skipped,
            (_, _, true) => StepStatus::Completed,
            (_, true, false) => StepStatus::Failed,
            (_, false, false) => StepStatus::Partial,
        };
        self
    }
}

/// Per-step results of a migration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Run start (epoch millis)
    pub started_at: i64,
    pub steps: Vec<StepReport>,
}

impl MigrationReport {
    /// Whether every step completed or had nothing to do
    pub fn is_clean(&self) -> bool {
        self.steps
            .iter()
            .all(|s| matches!(s.status, StepStatus::Completed | StepStatus::Skipped))
    }
}

/// Result of [`MigrationService::check_and_migrate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "outcome", content = "report")]
pub enum MigrationOutcome {
    AlreadyMigrated,
    /// The local store could not be loaded; nothing was done
    LegacyUnavailable,
    Migrated(MigrationReport),
}

/// Result of [`MigrationService::rollback_to_local_storage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackReport {
    /// Files written back to the legacy list
    pub files_restored: usize,
}

/// Usage of the namespaced store next to the legacy layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    pub enhanced: BTreeMap<Namespace, NamespaceUsage>,
    pub legacy: NamespaceUsage,
}

/// Moves data between the legacy layout and the namespaced store
pub struct MigrationService<'a> {
    manager: &'a StorageManager,
    legacy: LocalStore,
}

impl<'a> MigrationService<'a> {
    /// Service reading the legacy keys from the manager's local store
    pub fn new(manager: &'a StorageManager) -> Self {
        Self {
            manager,
            legacy: manager.local_store().clone(),
        }
    }

    /// Whether the migration flag is set
    pub async fn is_migrated(&self) -> StorageResult<bool> {
        self.manager.get_setting(MIGRATION_FLAG_KEY, false).await
    }

    /// Run the migration unless it has already happened
    ///
    /// The flag is set once the steps have run, whatever their outcome, and
    /// before the report is stored. A report that cannot be stored is only
    /// logged.
    pub async fn check_and_migrate(&self) -> StorageResult<MigrationOutcome> {
        let _guard = self.manager.migration_lock().lock().await;

        if self.is_migrated().await? {
            info!("StorageMigration: already migrated to namespaced storage");
            return Ok(MigrationOutcome::AlreadyMigrated);
        }

        if !self.manager.local_store_available() {
            warn!("StorageMigration: local store unavailable, migration postponed");
            return Ok(MigrationOutcome::LegacyUnavailable);
        }

        info!("StorageMigration: starting migration from legacy layout");
        let report = MigrationReport {
            started_at: self.manager.now_millis(),
            steps: vec![
                self.migrate_files().await,
                self.migrate_settings().await,
                self.migrate_offline_queue().await,
            ],
        };

        self.manager.save_setting(MIGRATION_FLAG_KEY, &true).await?;
        if let Err(e) = self
            .manager
            .save_setting(MIGRATION_REPORT_KEY, &report)
            .await
        {
            error!("StorageMigration: could not store migration report: {}", e);
        }

        if report.is_clean() {
            info!("StorageMigration: migration completed");
        } else {
            warn!("StorageMigration: migration completed with errors");
        }
        Ok(MigrationOutcome::Migrated(report))
    }

    /// The report stored by the last migration, if any
    pub async fn last_report(&self) -> StorageResult<Option<MigrationReport>> {
        self.manager.get_setting(MIGRATION_REPORT_KEY, None).await
    }

    /// Copy legacy files into `appData`
    pub async fn migrate_files(&self) -> StepReport {
        let mut report = StepReport::new(MigrationStep::Files);
        let Some(raw) = self.legacy.get(LEGACY_FILES_KEY).await else {
            return report.finish(false);
        };

        if let Err(e) = self.copy_files(&raw, &mut report).await {
            error!("StorageMigration: error migrating files: {}", e);
            report.errors.push(e.to_string());
        }
        report.finish(true)
    }

    async fn copy_files(&self, raw: &str, report: &mut StepReport) -> StorageResult<()> {
        let files: Vec<Value> = serde_json::from_str(raw)?;
        info!("StorageMigration: migrating {} files", files.len());

        let now = self.manager.clock().now();
        for (index, entry) in files.iter().enumerate() {
            let Some(record) = FileRecord::from_loose(entry, now) else {
                report
                    .errors
                    .push(format!("file entry {} has no name", index));
                continue;
            };

            match self.manager.save_file(&record.name, &record).await {
                Ok(_) => report.copied.push(record.name),
                Err(e) => {
                    error!("StorageMigration: failed to migrate {}: {}", record.name, e);
                    report.errors.push(format!("{}: {}", record.name, e));
                }
            }
        }

        self.manager
            .save_setting(FILES_LIST_KEY, &Value::Array(files))
            .await
    }

    /// Copy the last opened file into settings
    pub async fn migrate_settings(&self) -> StepReport {
        let mut report = StepReport::new(MigrationStep::Settings);
        let Some(last_file) = self.legacy.get(LEGACY_LAST_FILE_KEY).await else {
            return report.finish(false);
        };

        match self
            .manager
            .save_setting(LAST_OPENED_FILE_KEY, &last_file)
            .await
        {
            Ok(()) => report.copied.push(LAST_OPENED_FILE_KEY.to_string()),
            Err(e) => {
                error!("StorageMigration: error migrating settings: {}", e);
                report.errors.push(e.to_string());
            }
        }
        report.finish(true)
    }

    /// Copy legacy offline changes into the queue
    pub async fn migrate_offline_queue(&self) -> StepReport {
        let mut report = StepReport::new(MigrationStep::OfflineQueue);
        let Some(raw) = self.legacy.get(LEGACY_OFFLINE_CHANGES_KEY).await else {
            return report.finish(false);
        };

        if let Err(e) = self.copy_offline_changes(&raw, &mut report).await {
            error!("StorageMigration: error migrating offline queue: {}", e);
            report.errors.push(e.to_string());
        }
        report.finish(true)
    }

    async fn copy_offline_changes(&self, raw: &str, report: &mut StepReport) -> StorageResult<()> {
        let changes: Vec<OfflineOperation> = serde_json::from_str(raw)?;
        info!(
            "StorageMigration: migrating {} offline operations",
            changes.len()
        );

        // Entries share a timestamp; the queue keeps their insertion order
        let now = self.manager.clock().now();
        for change in changes {
            let entry = self
                .manager
                .add_to_offline_queue(change.normalized(now))
                .await?;
            report.copied.push(entry.id);
        }
        Ok(())
    }

    /// Remove the legacy keys, but only after a migration
    ///
    /// Returns whether anything was done.
    pub async fn cleanup_old_data(&self) -> StorageResult<bool> {
        self.require_local_store()?;
        if !self.is_migrated().await? {
            warn!("StorageMigration: refusing to clean up before migration");
            return Ok(false);
        }

        for key in [
            LEGACY_FILES_KEY,
            LEGACY_LAST_FILE_KEY,
            LEGACY_OFFLINE_CHANGES_KEY,
        ] {
            self.legacy.remove(key).await?;
        }
        info!("StorageMigration: legacy data removed");
        Ok(true)
    }

    /// Write the files back to the legacy list and clear the flag
    ///
    /// Only files are restored; settings and the queue stay namespaced.
    pub async fn rollback_to_local_storage(&self) -> StorageResult<RollbackReport> {
        let _guard = self.manager.migration_lock().lock().await;
        self.require_local_store()?;
        info!("StorageMigration: rolling back to legacy layout");

        let snapshot = self.manager.export_data().await?;
        let files: Vec<Value> = snapshot
            .data
            .get(Namespace::AppData.as_str())
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|records| records.iter())
            .filter(|(key, _)| key.starts_with(FILE_PREFIX))
            .filter_map(|(_, value)| value.get("data").cloned())
            .collect();

        self.legacy
            .set(LEGACY_FILES_KEY, serde_json::to_string(&files)?)
            .await?;
        self.manager.save_setting(MIGRATION_FLAG_KEY, &false).await?;

        info!("StorageMigration: rollback restored {} files", files.len());
        Ok(RollbackReport {
            files_restored: files.len(),
        })
    }

    /// Count and size of legacy keys
    pub async fn legacy_storage_usage(&self) -> NamespaceUsage {
        let mut usage = NamespaceUsage::default();
        for key in self.legacy.keys_with_prefix(LEGACY_PREFIX).await {
            if let Some(value) = self.legacy.get(&key).await {
                usage.item_count += 1;
                usage.size_bytes += value.len();
            }
        }
        usage
    }

    /// Usage of both layouts
    pub async fn storage_stats(&self) -> StorageResult<StorageStats> {
        Ok(StorageStats {
            enhanced: self.manager.get_storage_usage().await?,
            legacy: self.legacy_storage_usage().await,
        })
    }

    fn require_local_store(&self) -> StorageResult<()> {
        if self.manager.local_store_available() {
            return Ok(());
        }
        Err(StorageError::LocalStoreUnavailable {
            path: self.manager.config().local_store_path(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::models::KnownOperation;
    use crate::storage::BackendKind;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn manager() -> StorageManager {
        StorageManager::in_memory(Config::default(), Arc::new(ManualClock::new(1_000)))
            .await
            .unwrap()
    }

    async fn seed_legacy(manager: &StorageManager) {
        let local = manager.local_store();
        local
            .set(
                LEGACY_FILES_KEY,
                json!([
                    {
                        "id": "f1",
                        "name": "Plan",
                        "elements": [{ "type": "ellipse" }],
                        "createdAt": "2024-03-01T10:00:00Z",
                        "updatedAt": "not a date"
                    },
                    { "id": 2, "name": "Notes" },
                    { "id": "f3" }
                ])
                .to_string(),
            )
            .await
            .unwrap();
        local.set(LEGACY_LAST_FILE_KEY, "f1").await.unwrap();
        local
            .set(
                LEGACY_OFFLINE_CHANGES_KEY,
                json!([
                    { "type": "delete", "fileId": "f9" },
                    { "type": "rename", "fileId": "f1", "to": "Roadmap" }
                ])
                .to_string(),
            )
            .await
            .unwrap();
    }

    async fn app_data_items(manager: &StorageManager) -> usize {
        manager.get_storage_usage().await.unwrap()[&Namespace::AppData].item_count
    }

    fn step(report: &MigrationReport, step: MigrationStep) -> &StepReport {
        report.steps.iter().find(|s| s.step == step).unwrap()
    }

    #[tokio::test]
    async fn test_fresh_install_migrates_nothing() {
        let manager = manager().await;
        let service = MigrationService::new(&manager);

        let MigrationOutcome::Migrated(report) = service.check_and_migrate().await.unwrap() else {
            panic!("expected a migration");
        };
        assert!(report.steps.iter().all(|s| s.status == StepStatus::Skipped));
        assert!(service.is_migrated().await.unwrap());
    }

    #[tokio::test]
    async fn test_migrates_legacy_layout() {
        let manager = manager().await;
        seed_legacy(&manager).await;
        let service = MigrationService::new(&manager);

        let MigrationOutcome::Migrated(report) = service.check_and_migrate().await.unwrap() else {
            panic!("expected a migration");
        };

        let files = step(&report, MigrationStep::Files);
        assert_eq!(files.status, StepStatus::Partial);
        assert_eq!(files.copied, vec!["Plan", "Notes"]);
        assert_eq!(files.errors.len(), 1);

        let plan = manager.get_file("Plan").await.unwrap().unwrap().data;
        assert_eq!(plan.id, "f1");
        assert_eq!(plan.elements.len(), 1);
        assert_eq!(plan.app_state, json!({}));
        assert_eq!(plan.created_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert_eq!(plan.updated_at.timestamp_millis(), 1_000);

        let notes = manager.get_file("Notes").await.unwrap().unwrap().data;
        assert_eq!(notes.id, "2");

        let files_list = manager.get_setting_value(FILES_LIST_KEY).await.unwrap().unwrap();
        assert_eq!(files_list.as_array().map(Vec::len), Some(3));

        assert_eq!(
            step(&report, MigrationStep::Settings).status,
            StepStatus::Completed
        );
        assert_eq!(
            manager
                .get_setting(LAST_OPENED_FILE_KEY, String::new())
                .await
                .unwrap(),
            "f1"
        );

        let queue_step = step(&report, MigrationStep::OfflineQueue);
        assert_eq!(queue_step.status, StepStatus::Completed);
        assert_eq!(queue_step.copied.len(), 2);
        let queue = manager.get_offline_queue().await.unwrap();
        assert_eq!(queue.len(), 2);
        assert!(queue.iter().any(|e| e.operation.kind() == "rename"));

        assert_eq!(service.last_report().await.unwrap(), Some(report));
    }

    #[tokio::test]
    async fn test_failed_step_does_not_block_others() {
        let manager = manager().await;
        let local = manager.local_store();
        local.set(LEGACY_FILES_KEY, "{not json").await.unwrap();
        local.set(LEGACY_LAST_FILE_KEY, "f1").await.unwrap();

        let service = MigrationService::new(&manager);
        let MigrationOutcome::Migrated(report) = service.check_and_migrate().await.unwrap() else {
            panic!("expected a migration");
        };

        assert_eq!(step(&report, MigrationStep::Files).status, StepStatus::Failed);
        assert_eq!(
            step(&report, MigrationStep::Settings).status,
            StepStatus::Completed
        );
        assert!(!report.is_clean());
        assert!(service.is_migrated().await.unwrap());
    }

    #[tokio::test]
    async fn test_migration_runs_once() {
        let manager = manager().await;
        seed_legacy(&manager).await;
        let service = MigrationService::new(&manager);

        service.check_and_migrate().await.unwrap();
        let before = app_data_items(&manager).await;
        assert_eq!(before, 2);

        let second = service.check_and_migrate().await.unwrap();

        assert_eq!(second, MigrationOutcome::AlreadyMigrated);
        assert_eq!(manager.get_offline_queue().await.unwrap().len(), 2);
        assert_eq!(app_data_items(&manager).await, before);
    }

    #[tokio::test]
    async fn test_fallback_migration_keeps_legacy_queue_order() {
        let mut config = Config::default();
        config.force_fallback = true;
        let manager = StorageManager::in_memory(config, Arc::new(ManualClock::new(1_000)))
            .await
            .unwrap();
        assert_eq!(manager.backend(), BackendKind::Fallback);

        let changes: Vec<Value> = (0..8)
            .map(|i| json!({ "type": "delete", "fileId": format!("f{}", i) }))
            .collect();
        manager
            .local_store()
            .set(LEGACY_OFFLINE_CHANGES_KEY, Value::Array(changes).to_string())
            .await
            .unwrap();

        MigrationService::new(&manager)
            .check_and_migrate()
            .await
            .unwrap();

        let order: Vec<String> = manager
            .get_offline_queue()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|e| match e.operation {
                OfflineOperation::Known(KnownOperation::Delete { file_id, .. }) => Some(file_id),
                _ => None,
            })
            .collect();
        let expected: Vec<String> = (0..8).map(|i| format!("f{}", i)).collect();
        assert_eq!(order, expected);
    }

    #[tokio::test]
    async fn test_legacy_partial_save_is_normalized() {
        let manager = manager().await;
        manager
            .local_store()
            .set(
                LEGACY_OFFLINE_CHANGES_KEY,
                json!([{ "type": "save", "data": { "id": 3, "name": "Plan" } }]).to_string(),
            )
            .await
            .unwrap();

        MigrationService::new(&manager)
            .check_and_migrate()
            .await
            .unwrap();

        let queue = manager.get_offline_queue().await.unwrap();
        let OfflineOperation::Known(KnownOperation::Save { ref data, .. }) = queue[0].operation
        else {
            panic!("expected a normalized save");
        };
        assert_eq!(data.id, "3");
        assert_eq!(data.created_at.timestamp_millis(), 1_000);
    }

    #[tokio::test]
    async fn test_flag_is_set_even_if_report_cannot_be_stored() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(temp_dir.path());
        let clock = Arc::new(ManualClock::new(1_000));
        let manager = StorageManager::open_with_clock(config.clone(), clock)
            .await
            .unwrap();
        seed_legacy(&manager).await;

        {
            let conn = rusqlite::Connection::open(config.sqlite_path()).unwrap();
            conn.execute_batch(&format!(
                "CREATE TRIGGER reject_report BEFORE INSERT ON {}
                 WHEN NEW.key = '{}'
                 BEGIN SELECT RAISE(ABORT, 'report rejected'); END;",
                Namespace::Settings.table_name(),
                MIGRATION_REPORT_KEY
            ))
            .unwrap();
        }

        let service = MigrationService::new(&manager);
        assert!(matches!(
            service.check_and_migrate().await.unwrap(),
            MigrationOutcome::Migrated(_)
        ));
        assert!(service.is_migrated().await.unwrap());
        assert_eq!(service.last_report().await.unwrap(), None);

        assert_eq!(
            service.check_and_migrate().await.unwrap(),
            MigrationOutcome::AlreadyMigrated
        );
        assert_eq!(manager.get_offline_queue().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_local_store_postpones_migration() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(temp_dir.path());
        std::fs::write(config.local_store_path(), "{not json").unwrap();

        let manager = StorageManager::open(config).await.unwrap();
        let service = MigrationService::new(&manager);

        assert_eq!(
            service.check_and_migrate().await.unwrap(),
            MigrationOutcome::LegacyUnavailable
        );
        assert!(!service.is_migrated().await.unwrap());

        let err = service.rollback_to_local_storage().await.unwrap_err();
        assert!(matches!(err, StorageError::LocalStoreUnavailable { .. }));
        assert!(err.recovery_suggestion().is_some());
        assert!(service.cleanup_old_data().await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_migrations_are_serialized() {
        let manager = manager().await;
        seed_legacy(&manager).await;
        let a = MigrationService::new(&manager);
        let b = MigrationService::new(&manager);

        let (first, second) = tokio::join!(a.check_and_migrate(), b.check_and_migrate());
        let outcomes = [first.unwrap(), second.unwrap()];

        let migrated = outcomes
            .iter()
            .filter(|o| matches!(o, MigrationOutcome::Migrated(_)))
            .count();
        assert_eq!(migrated, 1);
        assert!(outcomes.contains(&MigrationOutcome::AlreadyMigrated));
        assert_eq!(manager.get_offline_queue().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_requires_migration() {
        let manager = manager().await;
        seed_legacy(&manager).await;
        let service = MigrationService::new(&manager);

        assert!(!service.cleanup_old_data().await.unwrap());
        assert_eq!(service.legacy_storage_usage().await.item_count, 3);

        service.check_and_migrate().await.unwrap();
        // Migration leaves the legacy keys alone
        assert_eq!(service.legacy_storage_usage().await.item_count, 3);

        assert!(service.cleanup_old_data().await.unwrap());
        assert_eq!(service.legacy_storage_usage().await, NamespaceUsage::default());
    }

    #[tokio::test]
    async fn test_rollback_rebuilds_legacy_list() {
        let manager = manager().await;
        let service = MigrationService::new(&manager);
        service.check_and_migrate().await.unwrap();

        manager.save_file("A", &FileRecord::new("A")).await.unwrap();
        manager.save_file("B", &FileRecord::new("B")).await.unwrap();
        manager.save_drawing("d1", json!({})).await.unwrap();

        let report = service.rollback_to_local_storage().await.unwrap();
        assert_eq!(report.files_restored, 2);
        assert!(!service.is_migrated().await.unwrap());

        let raw = manager.local_store().get(LEGACY_FILES_KEY).await.unwrap();
        let list: Vec<FileRecord> = serde_json::from_str(&raw).unwrap();
        let mut names: Vec<&str> = list.iter().map(|f| f.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_storage_stats() {
        let manager = manager().await;
        manager.local_store().set(LEGACY_LAST_FILE_KEY, "abc").await.unwrap();
        manager.local_store().set("unrelated", "x").await.unwrap();
        manager.save_setting("theme", "dark").await.unwrap();

        let stats = MigrationService::new(&manager).storage_stats().await.unwrap();
        assert_eq!(stats.legacy.item_count, 1);
        assert_eq!(stats.legacy.size_bytes, 3);
        assert_eq!(stats.enhanced[&Namespace::Settings].item_count, 1);
    }
}
