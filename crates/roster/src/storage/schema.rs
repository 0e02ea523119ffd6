//! `SQLite` schema definitions for roster.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the durable key/value table.
pub const CREATE_ENTRIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS entries (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the session-scoped key/value table.
pub const CREATE_SESSION_ENTRIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS session_entries (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `expires_at` for purging.
pub const CREATE_EXPIRY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_session_entries_expires ON session_entries(expires_at)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_ENTRIES_TABLE,
    CREATE_SESSION_ENTRIES_TABLE,
    CREATE_EXPIRY_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_session_table_has_expiry() {
        assert!(CREATE_SESSION_ENTRIES_TABLE.contains("expires_at TEXT NOT NULL"));
        assert!(CREATE_SESSION_ENTRIES_TABLE.contains("key TEXT PRIMARY KEY"));
    }

    #[test]
    fn test_create_entries_table_structure() {
        assert!(CREATE_ENTRIES_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_ENTRIES_TABLE.contains("value TEXT NOT NULL"));
    }
}
