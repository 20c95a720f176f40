//! Persistence configuration.
//!
//! A `PersistenceConfig` describes one form instance: its id, the key prefix
//! used in the text tiers, expiry, and the close/restart policy. It can be
//! built in code or loaded from TOML.

use crate::error::{FormsafeError, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default key prefix for both text tiers.
pub const DEFAULT_STORAGE_PREFIX: &str = "form_data_";

/// Default expiry window: 24 hours.
pub const DEFAULT_EXPIRY_MS: u64 = 24 * 60 * 60 * 1000;

/// How loudly recovered errors are reported.
///
/// This only affects diagnostic output, never control flow.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorReporting {
    Silent,
    #[default]
    Warn,
    Detailed,
}

impl ErrorReporting {
    /// Default `tracing` filter directive for this verbosity.
    pub fn as_filter(&self) -> &'static str {
        match self {
            ErrorReporting::Silent => "off",
            ErrorReporting::Warn => "warn",
            ErrorReporting::Detailed => "debug",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PersistenceConfig {
    pub form_id: String,
    pub storage_prefix: String,
    /// Snapshots older than this are discarded on restore.
    pub expiry_ms: u64,
    /// Wipe all tiers when the previous session ended with a clean close.
    pub clear_on_close: bool,
    /// Save on every mutation. When off, callers save explicitly.
    pub auto_save: bool,
    /// Field names whose values live in the blob store.
    pub file_fields: Vec<String>,
    pub error_reporting: ErrorReporting,
    /// Treat a visibility change to hidden as a close signal.
    pub hidden_counts_as_close: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            form_id: String::new(),
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            expiry_ms: DEFAULT_EXPIRY_MS,
            clear_on_close: true,
            auto_save: true,
            file_fields: Vec::new(),
            error_reporting: ErrorReporting::default(),
            hidden_counts_as_close: false,
        }
    }
}

impl PersistenceConfig {
    /// Creates a config with defaults for the given form id.
    pub fn new(form_id: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            ..Self::default()
        }
    }

    pub fn with_expiry_ms(mut self, expiry_ms: u64) -> Self {
        self.expiry_ms = expiry_ms;
        self
    }

    pub fn with_clear_on_close(mut self, clear_on_close: bool) -> Self {
        self.clear_on_close = clear_on_close;
        self
    }

    pub fn with_auto_save(mut self, auto_save: bool) -> Self {
        self.auto_save = auto_save;
        self
    }

    pub fn with_file_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_error_reporting(mut self, reporting: ErrorReporting) -> Self {
        self.error_reporting = reporting;
        self
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.form_id.trim().is_empty() {
            return Err(FormsafeError::config("form_id must not be empty"));
        }
        if i64::try_from(self.expiry_ms).is_err() {
            return Err(FormsafeError::config("expiry_ms is out of range"));
        }
        Ok(())
    }

    pub fn expiry(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.expiry_ms).unwrap_or(i64::MAX))
    }

    pub fn is_file_field(&self, field: &str) -> bool {
        self.file_fields.iter().any(|f| f == field)
    }

    /// Key of the snapshot in the durable tier.
    pub fn durable_key(&self) -> String {
        format!("{}{}", self.storage_prefix, self.form_id)
    }

    /// Key of the snapshot in the session tier.
    pub fn session_key(&self) -> String {
        format!("{}{}_session", self.storage_prefix, self.form_id)
    }

    /// Key of the close marker, identical in both tiers.
    pub fn close_marker_key(&self) -> String {
        format!("{}{}_closed", self.storage_prefix, self.form_id)
    }
}
