//! Error types for cc98-filter.
//!
//! This module defines all error types used throughout the crate, grouped by
//! the concern that raises them.

use std::path::PathBuf;
use thiserror::Error;

use crate::dom::NodeId;
use crate::entity::EntityKind;

/// The main error type for cc98-filter operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// A fragment selector could not be parsed.
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector {
        /// The selector source text.
        selector: String,
        /// What the parser rejected.
        message: String,
    },

    // === Block List Errors ===
    /// The entity is already on the block list.
    #[error("{kind} '{id}' is already blocked")]
    DuplicateEntity {
        /// Kind of the entity.
        kind: EntityKind,
        /// Identifier of the entity.
        id: String,
    },

    /// The entity is not on the block list.
    #[error("{kind} '{id}' is not on the block list")]
    EntityNotFound {
        /// Kind of the entity.
        kind: EntityKind,
        /// Identifier of the entity.
        id: String,
    },

    /// An empty identifier was supplied.
    #[error("{kind} identifier must not be empty")]
    EmptyIdentifier {
        /// Kind of the entity.
        kind: EntityKind,
    },

    // === Import Errors ===
    /// The import payload is not a valid backup document.
    #[error("invalid backup file: {message}")]
    ImportFormat {
        /// Description of the format problem.
        message: String,
    },

    /// The operator declined to continue the import.
    #[error("import cancelled")]
    ImportCancelled,

    // === Document Errors ===
    /// A node id does not belong to the document.
    #[error("node {0} not found in document")]
    NodeNotFound(NodeId),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for cc98-filter operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an import format error.
    #[must_use]
    pub fn import_format(message: impl Into<String>) -> Self {
        Self::ImportFormat {
            message: message.into(),
        }
    }

    /// Create an invalid selector error.
    #[must_use]
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate entity error.
    #[must_use]
    pub fn duplicate(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::DuplicateEntity {
            kind,
            id: id.into(),
        }
    }

    /// Create an entity not found error.
    #[must_use]
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::EntityNotFound {
            kind,
            id: id.into(),
        }
    }

    /// Check if this error reports a duplicate add.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateEntity { .. })
    }

    /// Check if this error aborted an import.
    #[must_use]
    pub fn is_import_error(&self) -> bool {
        matches!(
            self,
            Self::ImportFormat { .. } | Self::ImportCancelled | Self::Json(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ImportCancelled;
        assert_eq!(err.to_string(), "import cancelled");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_duplicate_error() {
        let err = Error::duplicate(EntityKind::User, "alice");
        assert!(err.is_duplicate());
        assert_eq!(err.to_string(), "user 'alice' is already blocked");
        assert!(!Error::ImportCancelled.is_duplicate());
    }

    #[test]
    fn test_not_found_error_display() {
        let err = Error::not_found(EntityKind::Board, "Lounge");
        assert_eq!(err.to_string(), "board 'Lounge' is not on the block list");
    }

    #[test]
    fn test_empty_identifier_display() {
        let err = Error::EmptyIdentifier {
            kind: EntityKind::User,
        };
        assert_eq!(err.to_string(), "user identifier must not be empty");
    }

    #[test]
    fn test_is_import_error() {
        assert!(Error::import_format("missing blockedUsers").is_import_error());
        assert!(Error::ImportCancelled.is_import_error());
        assert!(!Error::internal("x").is_import_error());
    }

    #[test]
    fn test_invalid_selector_display() {
        let err = Error::invalid_selector(".a[", "unterminated attribute");
        let msg = err.to_string();
        assert!(msg.contains(".a["));
        assert!(msg.contains("unterminated attribute"));
    }

    #[test]
    fn test_node_not_found_display() {
        let root = crate::dom::Document::new().root();
        let msg = Error::NodeNotFound(root).to_string();
        assert!(msg.starts_with("node "));
        assert!(msg.ends_with(" not found in document"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
            assert!(err.is_import_error());
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "debounce_ms must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("debounce_ms"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
