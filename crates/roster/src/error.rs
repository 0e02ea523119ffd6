//! Error types for roster.
//!
//! This module defines all error types used throughout the roster crate.
//! Input errors carry the single human-readable message shown to the user;
//! infrastructure errors carry enough context to debug storage and
//! configuration problems.

use std::path::PathBuf;
use thiserror::Error;

/// A record failed one of the format rules.
///
/// Rules are checked in declaration order and only the first failure is
/// reported.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// The id does not look like `ST-001`.
    #[error("ID must be in format ST-### (e.g., ST-001)")]
    BadIdFormat,

    /// The name has fewer than two characters.
    #[error("Name must be at least 2 characters")]
    NameTooShort,

    /// The age is outside 5..=25.
    #[error("Age must be between 5 and 25")]
    AgeOutOfRange,

    /// The email lacks an `@` or a `.`.
    #[error("Invalid email format")]
    BadEmailFormat,
}

/// The main error type for roster operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Roster Errors ===
    /// A record failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A record with this id already exists.
    #[error("Student ID already exists: {id}")]
    DuplicateId {
        /// The conflicting id.
        id: String,
    },

    /// No record has this id.
    #[error("Student not found: {id}")]
    NotFound {
        /// The missing id.
        id: String,
    },

    /// Save was requested while in add mode.
    #[error("no student is being edited")]
    NoRecordUnderEdit,

    // === Session Errors ===
    /// Login was attempted with a blank email.
    #[error("Please enter an email address")]
    EmptyEmail,

    /// A roster operation was attempted without a session.
    #[error("not signed in; run `roster login <email>` first")]
    NotSignedIn,

    /// Export was attempted by a non-admin session.
    #[error("export is only available to admin users")]
    ExportNotPermitted,

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

    /// A stored value could not be decoded.
    #[error("stored value for '{key}' is corrupt: {source}")]
    CorruptValue {
        /// The store key holding the value.
        key: &'static str,
        /// The decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// No string collator could be built for sorting.
    #[error("failed to load collation data: {message}")]
    Collation {
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
}

/// A specialized Result type for roster operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a duplicate id error.
    #[must_use]
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Check if this error was caused by user input rather than by the
    /// store, the configuration, or the file system.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::DuplicateId { .. }
                | Self::NotFound { .. }
                | Self::NoRecordUnderEdit
                | Self::EmptyEmail
                | Self::NotSignedIn
                | Self::ExportNotPermitted
        )
    }

    /// The validation rule that failed, if this is a validation error.
    #[must_use]
    pub fn validation(&self) -> Option<ValidationError> {
        match self {
            Self::Validation(rule) => Some(*rule),
            _ => None,
        }
    }
}
