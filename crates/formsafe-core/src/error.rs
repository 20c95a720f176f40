//! Error types for formsafe.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for every formsafe crate.
///
/// Variants follow the failure classes the persistence layer distinguishes:
/// an unreachable store, unreadable stored data, a failing transform hook,
/// bad call arguments, and a blob write or delete that failed midway.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FormsafeError {
    /// A text tier or the blob store is not initialized or not accessible
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Stored data could not be parsed or produced
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "JSON", "TOML", ...
        message: String,
    },

    /// A registered transform hook failed
    #[error("Transform error in {context}: {message}")]
    Transform { context: String, message: String },

    /// Invalid call arguments
    #[error("Validation error: {0}")]
    Validation(String),

    /// A blob store write or delete failed mid-operation
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FormsafeError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a StorageUnavailable error
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable(message.into())
    }

    /// Creates a JSON Serialization error
    pub fn json(message: impl Into<String>) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: message.into(),
        }
    }

    /// Creates a Transform error
    pub fn transform(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Transaction error
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }

    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    pub fn is_transform(&self) -> bool {
        matches!(self, Self::Transform { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_transaction(&self) -> bool {
        matches!(self, Self::Transaction(_))
    }

    /// Short stable name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StorageUnavailable(_) => "StorageUnavailable",
            Self::Serialization { .. } => "SerializationError",
            Self::Transform { .. } => "TransformError",
            Self::Validation(_) => "ValidationError",
            Self::Transaction(_) => "TransactionError",
            Self::Io { .. } => "IoError",
            Self::Config(_) => "ConfigError",
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for FormsafeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for FormsafeError {
    fn from(err: serde_json::Error) -> Self {
        Self::json(err.to_string())
    }
}

impl From<toml::de::Error> for FormsafeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<version_migrate::MigrationError> for FormsafeError {
    fn from(err: version_migrate::MigrationError) -> Self {
        use version_migrate::MigrationError;

        match err {
            MigrationError::EntityNotFound(id) => Self::Io {
                message: format!("entity not found: {}", id),
            },
            MigrationError::IoError { .. } => Self::Io {
                message: err.to_string(),
            },
            _ => Self::Serialization {
                format: "migration".to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// A type alias for `Result<T, FormsafeError>`.
pub type Result<T> = std::result::Result<T, FormsafeError>;
