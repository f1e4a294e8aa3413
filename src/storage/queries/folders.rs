//! Folder definitions and folder sync requests.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::domain::{AccountId, Folder, FolderId};
use crate::storage::database::{Database, Result};

/// Stores a folder definition for an account.
///
/// Marking a folder as the default inbox clears the mark on the others.
pub async fn upsert(
    db: &Database,
    account: &AccountId,
    folder: &Folder,
    default_inbox: bool,
) -> Result<()> {
    let account = account.clone();
    let folder = folder.clone();

    db.transaction(move |tx| {
        let now = Utc::now().to_rfc3339();
        let definition = serde_json::to_string(&folder)?;

        if default_inbox {
            tx.execute(
                "UPDATE folders SET is_default_inbox = 0 WHERE account_id = ?1",
                [&account.0],
            )?;
        }
        tx.execute(
            r#"
            INSERT INTO folders (account_id, id, name, definition, is_default_inbox, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(account_id, id) DO UPDATE SET
                name = excluded.name,
                definition = excluded.definition,
                is_default_inbox = excluded.is_default_inbox,
                updated_at = excluded.updated_at
            "#,
            params![account.0, folder.id.0, folder.name, definition, default_inbox as i32, now],
        )?;
        Ok(())
    })
    .await
}

/// Retrieves one folder of an account.
pub async fn get(
    db: &Database,
    account: &AccountId,
    folder_id: &FolderId,
) -> Result<Option<Folder>> {
    let account = account.clone();
    let folder_id = folder_id.clone();

    db.with_conn(move |conn| {
        let definition: Option<String> = conn
            .query_row(
                "SELECT definition FROM folders WHERE account_id = ?1 AND id = ?2",
                [&account.0, &folder_id.0],
                |row| row.get(0),
            )
            .optional()?;
        Ok(definition.as_deref().map(serde_json::from_str).transpose()?)
    })
    .await
}

/// The folder marked as the account's default inbox.
pub async fn default_inbox(db: &Database, account: &AccountId) -> Result<Option<Folder>> {
    let account = account.clone();

    db.with_conn(move |conn| {
        let definition: Option<String> = conn
            .query_row(
                "SELECT definition FROM folders WHERE account_id = ?1 AND is_default_inbox = 1",
                [&account.0],
                |row| row.get(0),
            )
            .optional()?;
        Ok(definition.as_deref().map(serde_json::from_str).transpose()?)
    })
    .await
}

/// Logs a sync request for the folder behind `endpoint`.
pub async fn record_sync_request(db: &Database, endpoint: &str) -> Result<()> {
    let endpoint = endpoint.to_string();

    db.with_conn(move |conn| {
        conn.execute(
            "INSERT INTO sync_requests (endpoint, requested_at) VALUES (?1, ?2)",
            params![endpoint, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    })
    .await
}

/// All logged sync requests, oldest first.
pub async fn sync_requests(db: &Database) -> Result<Vec<String>> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT endpoint FROM sync_requests ORDER BY seq ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    })
    .await
}
