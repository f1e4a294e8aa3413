//! SQL schema definitions as const strings.
//!
//! Contains the SQLite schema backing `SqliteStore`.

/// SQL to create the records table.
///
/// Folder membership is kept as a JSON array of folder ids.
pub const CREATE_RECORDS: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL,
    subject TEXT,
    date TEXT NOT NULL,
    is_read INTEGER DEFAULT 0,
    is_starred INTEGER DEFAULT 0,
    priority TEXT NOT NULL DEFAULT 'low',
    folders TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create record indexes.
pub const CREATE_RECORD_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_records_account ON records(account_id);
CREATE INDEX IF NOT EXISTS idx_records_date ON records(date ASC)
"#;

/// SQL to create the undo log.
///
/// Holds the prior state of every record touched by the last undoable batch.
/// A NULL snapshot means the record did not exist before the batch.
pub const CREATE_UNDO_LOG: &str = r#"
CREATE TABLE IF NOT EXISTS undo_log (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id TEXT NOT NULL,
    account_id TEXT NOT NULL,
    snapshot TEXT,
    created_at TEXT NOT NULL
)
"#;

/// SQL to create the folders table.
pub const CREATE_FOLDERS: &str = r#"
CREATE TABLE IF NOT EXISTS folders (
    account_id TEXT NOT NULL,
    id TEXT NOT NULL,
    name TEXT NOT NULL,
    definition TEXT NOT NULL,
    is_default_inbox INTEGER DEFAULT 0,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (account_id, id)
)
"#;

/// SQL to create the per-account settings table.
pub const CREATE_ACCOUNT_SETTINGS: &str = r#"
CREATE TABLE IF NOT EXISTS account_settings (
    account_id TEXT PRIMARY KEY,
    auto_advance TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create the folder sync request log.
pub const CREATE_SYNC_REQUESTS: &str = r#"
CREATE TABLE IF NOT EXISTS sync_requests (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    endpoint TEXT NOT NULL,
    requested_at TEXT NOT NULL
)
"#;

/// Returns all migration statements in order.
pub fn all_migrations() -> Vec<&'static str> {
    vec![
        CREATE_RECORDS,
        CREATE_RECORD_INDEXES,
        CREATE_UNDO_LOG,
        CREATE_FOLDERS,
        CREATE_ACCOUNT_SETTINGS,
        CREATE_SYNC_REQUESTS,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_migrations_returns_statements() {
        let migrations = all_migrations();
        assert_eq!(migrations.len(), 6);
    }

    #[test]
    fn create_records_is_valid_sql() {
        assert!(CREATE_RECORDS.contains("CREATE TABLE"));
        assert!(CREATE_RECORDS.contains("records"));
        assert!(CREATE_RECORDS.contains("id TEXT PRIMARY KEY"));
    }

    #[test]
    fn folders_are_keyed_per_account() {
        assert!(CREATE_FOLDERS.contains("PRIMARY KEY (account_id, id)"));
    }
}
