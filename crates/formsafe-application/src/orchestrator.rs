//! Persistence orchestrator.
//!
//! This module provides the `PersistenceOrchestrator`, which owns the live
//! form state of one form instance and reconciles it with the session tier,
//! the durable tier and the blob store.
//!
//! # Responsibilities
//!
//! - Classifying the startup and restoring from the authoritative tier
//! - Saving every mutation to the session tier, then the durable tier
//! - Replacing a file field's records as one generation
//! - Clearing all tiers on request, on expiry, or after a clean close
//! - Surfacing recovered errors and upload progress
//!
//! # Concurrency
//!
//! All methods take `&self`. Core operations (restore, save, save-files,
//! clear) take an internal operation lock, so they never interleave on the
//! same instance.

use crate::backends::StorageBackends;
use crate::error_channel::{ErrorCallback, ErrorChannel};
use crate::file_cache::FileDataCache;
use crate::progress::ProgressChannel;
use chrono::{DateTime, Utc};
use formsafe_core::blob::BlobStore;
use formsafe_core::clock::{Clock, SystemClock};
use formsafe_core::config::PersistenceConfig;
use formsafe_core::error::{FormsafeError, Result};
use formsafe_core::file::{FileRecord, FileUpload, NewFileRecord, UploadProgress};
use formsafe_core::lifecycle::{LifecycleMonitor, LifecycleSignal, StartupKind};
use formsafe_core::snapshot::{FormFields, FormSnapshot, has_content};
use formsafe_core::tier::TextTier;
use formsafe_core::transform::{FieldTransform, TransformHooks, TransformPipeline};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock, watch};
use uuid::Uuid;

/// What `restore_data` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub startup: StartupKind,
    /// A snapshot was accepted and merged into the form
    pub text_restored: bool,
    /// A snapshot was found but older than the expiry window
    pub expired: bool,
    /// All tiers were wiped because of the clean-close policy
    pub cleared: bool,
    /// File fields that came back with at least one record
    pub restored_file_fields: Vec<String>,
}

impl RestoreOutcome {
    fn new(startup: StartupKind) -> Self {
        Self {
            startup,
            text_restored: false,
            expired: false,
            cleared: false,
            restored_file_fields: Vec::new(),
        }
    }
}

enum TextRestore {
    Restored,
    Expired,
    Missing,
}

pub struct PersistenceOrchestrator {
    config: PersistenceConfig,
    session: Arc<dyn TextTier>,
    durable: Arc<dyn TextTier>,
    blobs: Arc<dyn BlobStore>,
    monitor: LifecycleMonitor,
    clock: Arc<dyn Clock>,
    pipeline: RwLock<TransformPipeline>,
    initial_fields: FormFields,
    form: RwLock<FormFields>,
    files: FileDataCache,
    has_unsaved_changes: AtomicBool,
    last_saved_at: Mutex<Option<DateTime<Utc>>>,
    progress: ProgressChannel,
    errors: ErrorChannel,
    /// Serializes restore, save, save-files and clear
    op_lock: Mutex<()>,
    instance_id: Uuid,
}

impl PersistenceOrchestrator {
    /// Creates an orchestrator for one form instance.
    ///
    /// # Arguments
    ///
    /// * `config` - Form id, key prefix, expiry and close policy
    /// * `initial_fields` - Field values of a blank form
    /// * `backends` - Session tier, durable tier and blob store
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if `config` does not validate.
    pub fn new(
        config: PersistenceConfig,
        initial_fields: FormFields,
        backends: StorageBackends,
    ) -> Result<Self> {
        config.validate()?;
        let monitor =
            LifecycleMonitor::new(&config, backends.session.clone(), backends.durable.clone());
        let errors = ErrorChannel::new(config.error_reporting);

        Ok(Self {
            session: backends.session,
            durable: backends.durable,
            blobs: backends.blobs,
            monitor,
            clock: Arc::new(SystemClock),
            pipeline: RwLock::new(TransformPipeline::new()),
            form: RwLock::new(initial_fields.clone()),
            initial_fields,
            files: FileDataCache::new(),
            has_unsaved_changes: AtomicBool::new(false),
            last_saved_at: Mutex::new(None),
            progress: ProgressChannel::new(),
            errors,
            op_lock: Mutex::new(()),
            instance_id: Uuid::new_v4(),
            config,
        })
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn form_id(&self) -> &str {
        &self.config.form_id
    }

    pub async fn set_error_callback(&self, callback: ErrorCallback) {
        self.errors.set_callback(callback).await;
    }

    // ============================================================================
    // Mount and restore
    // ============================================================================

    /// Initializes the blob store and runs the restore algorithm.
    pub async fn mount(&self) -> RestoreOutcome {
        tracing::debug!(form_id = %self.config.form_id, instance = %self.instance_id, "Mounting");
        if let Err(e) = self.blobs.init().await {
            self.errors.report(&e, "mount").await;
        }
        self.restore_data().await
    }

    /// Classifies the startup and restores the matching snapshot.
    ///
    /// Never fails: every error is recorded in the error state and the form
    /// keeps whatever it held before.
    #[tracing::instrument(skip(self), fields(form_id = %self.config.form_id))]
    pub async fn restore_data(&self) -> RestoreOutcome {
        let _guard = self.op_lock.lock().await;

        let startup = self.monitor.classify().await;
        let mut outcome = RestoreOutcome::new(startup);

        match startup {
            StartupKind::Fresh => {}
            StartupKind::NormalRestart if self.config.clear_on_close => {
                // Clean slate wins over restore.
                if let Err(e) = self.erase_all().await {
                    self.errors.report(&e, "restore_data").await;
                }
                outcome.cleared = true;
                tracing::info!("Previous session closed cleanly; storage cleared");
            }
            StartupKind::NormalRestart => {
                self.acknowledge_restart().await;
                tracing::info!("Previous session closed cleanly; durable data kept, not restored");
            }
            StartupKind::Refresh | StartupKind::CrashRecovery => {
                self.acknowledge_restart().await;
                match self.restore_text(startup).await {
                    Ok(TextRestore::Restored) => {
                        outcome.text_restored = true;
                        outcome.restored_file_fields = self.restore_files().await;
                    }
                    Ok(TextRestore::Expired) => outcome.expired = true,
                    Ok(TextRestore::Missing) => {}
                    Err(e) => self.errors.report(&e, "restore_data").await,
                }
            }
        }

        self.recompute_unsaved_changes().await;
        outcome
    }

    async fn acknowledge_restart(&self) {
        if let Err(e) = self.monitor.acknowledge_restart().await {
            self.errors.report(&e, "restore_data").await;
        }
    }

    async fn restore_text(&self, startup: StartupKind) -> Result<TextRestore> {
        let (tier, key) = match startup {
            StartupKind::CrashRecovery => (&self.durable, self.config.durable_key()),
            _ => (&self.session, self.config.session_key()),
        };

        let Some(raw) = tier.get(&key).await? else {
            return Ok(TextRestore::Missing);
        };
        let snapshot = FormSnapshot::decode(&raw)?;

        let now = self.clock.now();
        if snapshot.is_expired(now, self.config.expiry()) {
            tracing::info!(
                saved_at = %snapshot.saved_at,
                age_ms = snapshot.age(now).num_milliseconds(),
                "Snapshot expired; discarding"
            );
            self.erase_all().await?;
            return Ok(TextRestore::Expired);
        }

        let output = self.pipeline.read().await.apply_after_restore(&snapshot.fields);
        for error in &output.errors {
            self.errors.report(error, "restore_data").await;
        }

        {
            let mut form = self.form.write().await;
            for (name, value) in output.fields {
                form.insert(name, value);
            }
        }
        *self.last_saved_at.lock().await = Some(snapshot.saved_at);

        if startup == StartupKind::CrashRecovery {
            // Later reads in this process go to the session tier.
            if let Err(e) = self.session.set(&self.config.session_key(), &raw).await {
                self.errors.report(&e, "restore_data").await;
            }
        }

        tracing::info!(
            startup = startup.as_str(),
            tier = tier.kind().as_str(),
            saved_at = %snapshot.saved_at,
            "Form data restored"
        );
        Ok(TextRestore::Restored)
    }

    async fn restore_files(&self) -> Vec<String> {
        let mut restored = Vec::new();
        for field in &self.config.file_fields {
            match self.blobs.get_files(&self.config.form_id, field).await {
                Ok(records) if records.is_empty() => {}
                Ok(records) => {
                    tracing::debug!(field = %field, count = records.len(), "File field restored");
                    self.files.replace(field, records).await;
                    restored.push(field.clone());
                }
                Err(e) => self.errors.report(&e, "restore_data").await,
            }
        }
        restored
    }

    async fn recompute_unsaved_changes(&self) {
        let any_field = self.form.read().await.values().any(has_content);
        let any_file = self.files.has_any_files().await;
        self.has_unsaved_changes
            .store(any_field || any_file, Ordering::SeqCst);
    }

    // ============================================================================
    // Mutation and save
    // ============================================================================

    /// Sets one field. With `auto_save` on, this triggers exactly one save.
    pub async fn set_field(&self, name: impl Into<String>, value: Value) -> Result<()> {
        self.update_fields(|form| {
            form.insert(name.into(), value);
        })
        .await
    }

    /// Applies a batch of edits, then saves once (with `auto_save` on).
    pub async fn update_fields<F>(&self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut FormFields),
    {
        let _guard = self.op_lock.lock().await;
        {
            let mut form = self.form.write().await;
            edit(&mut form);
        }
        self.has_unsaved_changes.store(true, Ordering::SeqCst);
        if self.config.auto_save {
            self.save_text_locked().await
        } else {
            Ok(())
        }
    }

    /// Serializes the current form into the session tier, then the durable tier.
    ///
    /// # Errors
    ///
    /// Tier write failures are recorded in the error state and returned.
    pub async fn save_text_data(&self) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        self.save_text_locked().await
    }

    async fn save_text_locked(&self) -> Result<()> {
        let result = self.write_snapshot().await;
        if let Err(e) = &result {
            self.errors.report(e, "save_text_data").await;
        }
        result
    }

    async fn write_snapshot(&self) -> Result<()> {
        let fields = self.form.read().await.clone();
        let output = self.pipeline.read().await.apply_before_save(&fields);
        for error in &output.errors {
            self.errors.report(error, "save_text_data").await;
        }

        let saved_at = self.next_saved_at().await;
        let raw = FormSnapshot::new(output.fields, saved_at).encode()?;

        // Session first: a crash before the durable write leaves the tier
        // preferred on refresh up to date.
        self.session.set(&self.config.session_key(), &raw).await?;
        self.durable.set(&self.config.durable_key(), &raw).await?;

        self.has_unsaved_changes.store(true, Ordering::SeqCst);
        tracing::debug!(saved_at = %saved_at, bytes = raw.len(), "Form data saved");
        Ok(())
    }

    /// `now`, clamped so stamps never go backwards.
    async fn next_saved_at(&self) -> DateTime<Utc> {
        let mut last = self.last_saved_at.lock().await;
        let now = self.clock.now();
        let stamp = match *last {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }

    // ============================================================================
    // Files
    // ============================================================================

    /// Replaces every file of `field` with `files`.
    ///
    /// Old records are deleted first, then new ones are written one by one
    /// while progress is published. The cached `file_data(field)` switches to
    /// the new generation only after every write succeeded.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty field name, a field not listed in
    ///   `file_fields`, or an empty file list
    /// - Any blob store error; remaining files are skipped. Records deleted
    ///   before the failure are not brought back.
    ///
    /// The error is also recorded in the error state.
    #[tracing::instrument(skip(self, files), fields(form_id = %self.config.form_id, count = files.len()))]
    pub async fn save_files(&self, field: &str, files: Vec<FileUpload>) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        let result = self.replace_files(field, files).await;
        self.progress.clear();
        if let Err(e) = &result {
            self.errors.report(e, "save_files").await;
        }
        result
    }

    async fn replace_files(&self, field: &str, files: Vec<FileUpload>) -> Result<()> {
        if field.trim().is_empty() {
            return Err(FormsafeError::validation("field name must not be empty"));
        }
        if files.is_empty() {
            return Err(FormsafeError::validation(format!(
                "no files given for field '{}'",
                field
            )));
        }
        // Only listed fields are restored, so anything else would be lost.
        if !self.config.is_file_field(field) {
            return Err(FormsafeError::validation(format!(
                "'{}' is not a configured file field",
                field
            )));
        }

        self.blobs.init().await?;

        let total: u64 = files.iter().map(FileUpload::size).sum();
        let mut loaded = 0;
        self.progress.publish(UploadProgress::new(field, total, loaded));

        let removed = self.blobs.delete_files(&self.config.form_id, field).await?;
        tracing::debug!(field, removed, "Previous files removed");

        let mut written: Vec<FileRecord> = Vec::with_capacity(files.len());
        for upload in files {
            let size = upload.size();
            let record =
                NewFileRecord::from_upload(&self.config.form_id, field, upload, self.clock.now());
            let file_id = self.blobs.save_file(record.clone()).await?;
            written.push(record.with_id(file_id));

            loaded += size;
            self.progress.publish(UploadProgress::new(field, total, loaded));
        }

        tracing::info!(field, count = written.len(), bytes = total, "Files saved");
        self.files.replace(field, written).await;
        self.has_unsaved_changes.store(true, Ordering::SeqCst);
        Ok(())
    }

    // ============================================================================
    // Clear
    // ============================================================================

    /// Removes this form's data from every tier.
    ///
    /// Returns `false` if any removal failed; the error is in the error state.
    pub async fn clear_storage(&self) -> bool {
        let _guard = self.op_lock.lock().await;
        self.clear_locked().await
    }

    /// Puts the initial field values back and clears storage.
    pub async fn reset_form(&self) -> bool {
        let _guard = self.op_lock.lock().await;
        *self.form.write().await = self.initial_fields.clone();
        self.clear_locked().await
    }

    async fn clear_locked(&self) -> bool {
        match self.erase_all().await {
            Ok(()) => {
                self.has_unsaved_changes.store(false, Ordering::SeqCst);
                tracing::info!(form_id = %self.config.form_id, "Storage cleared");
                true
            }
            Err(e) => {
                self.errors.report(&e, "clear_storage").await;
                false
            }
        }
    }

    /// Deletes snapshots, markers and files. Every step is attempted; the
    /// first failure is returned.
    async fn erase_all(&self) -> Result<()> {
        let marker_key = self.config.close_marker_key();
        let steps = [
            self.session.remove(&self.config.session_key()).await,
            self.durable.remove(&self.config.durable_key()).await,
            self.session.remove(&marker_key).await,
            self.durable.remove(&marker_key).await,
            self.clear_blobs().await,
        ];

        self.files.clear().await;
        *self.last_saved_at.lock().await = None;

        steps.into_iter().collect::<Result<Vec<()>>>().map(|_| ())
    }

    async fn clear_blobs(&self) -> Result<()> {
        self.blobs.init().await?;
        let removed = self.blobs.clear_files(&self.config.form_id).await?;
        tracing::debug!(removed, "Blob records cleared");
        Ok(())
    }

    // ============================================================================
    // Lifecycle
    // ============================================================================

    /// Forwards a page lifecycle event to the monitor. Failures are recorded,
    /// never raised.
    pub async fn handle_lifecycle_signal(&self, signal: LifecycleSignal) {
        match self.monitor.handle_signal(signal).await {
            Ok(true) => tracing::debug!(?signal, "Close marker set"),
            Ok(false) => {}
            Err(e) => self.errors.report(&e, "lifecycle").await,
        }
    }

    // ============================================================================
    // Transforms
    // ============================================================================

    pub async fn register_transform_middleware(&self, hooks: TransformHooks) {
        self.pipeline.write().await.set_global(hooks);
    }

    pub async fn register_field_transforms(&self, mapping: HashMap<String, FieldTransform>) {
        self.pipeline.write().await.register_fields(mapping);
    }

    // ============================================================================
    // Read accessors
    // ============================================================================

    pub async fn form_data(&self) -> FormFields {
        self.form.read().await.clone()
    }

    pub async fn field(&self, name: &str) -> Option<Value> {
        self.form.read().await.get(name).cloned()
    }

    pub async fn file_data(&self, field: &str) -> Vec<FileRecord> {
        self.files.get(field).await
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.has_unsaved_changes.load(Ordering::SeqCst)
    }

    /// Current error-state string, if any.
    pub async fn error(&self) -> Option<String> {
        self.errors.message().await
    }

    pub async fn last_error(&self) -> Option<FormsafeError> {
        self.errors.last().await
    }

    pub async fn clear_error(&self) {
        self.errors.clear().await;
    }

    pub fn upload_progress(&self) -> Option<UploadProgress> {
        self.progress.current()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<Option<UploadProgress>> {
        self.progress.subscribe()
    }

    /// Pretty JSON of the in-memory fields. No tier access.
    pub async fn get_form_data_json(&self) -> String {
        let form = self.form.read().await;
        serde_json::to_string_pretty(&*form).unwrap_or_else(|_| "{}".to_string())
    }

    /// Pretty JSON of file metadata per field, without payloads.
    pub async fn get_file_data_json(&self) -> String {
        let metadata = self.files.metadata().await;
        serde_json::to_string_pretty(&metadata).unwrap_or_else(|_| "{}".to_string())
    }
}
