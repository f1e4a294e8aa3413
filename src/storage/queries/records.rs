//! Record CRUD operations.
//!
//! Provides database operations for mailbox records.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::{AccountId, FolderId, Priority, Record, RecordId};
use crate::storage::database::{Database, Result};

const COLUMNS: &str = "id, subject, date, is_read, is_starred, priority, folders, account_id";

/// Inserts a record, or replaces the stored copy.
pub async fn upsert(db: &Database, account: &AccountId, record: &Record) -> Result<()> {
    let account = account.clone();
    let record = record.clone();

    db.with_conn(move |conn| write(conn, &account, &record)).await
}

/// Retrieves a record by its ID.
pub async fn get_by_id(db: &Database, record_id: &RecordId) -> Result<Option<Record>> {
    let record_id = record_id.clone();

    db.with_conn(move |conn| Ok(read(conn, &record_id)?.map(|(_, record)| record)))
        .await
}

/// Retrieves all records of an account, oldest first.
pub async fn get_by_account(db: &Database, account_id: &AccountId) -> Result<Vec<Record>> {
    let account_id = account_id.clone();

    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM records WHERE account_id = ?1 ORDER BY date ASC, id ASC"
        ))?;

        let rows = stmt.query_map([&account_id.0], |row| row_to_entry(row).map(|(_, r)| r))?;
        let records: std::result::Result<Vec<_>, _> = rows.collect();
        Ok(records?)
    })
    .await
}

/// Counts stored records.
pub async fn count(db: &Database) -> Result<i64> {
    db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?))
        .await
}

pub(crate) fn write(conn: &Connection, account: &AccountId, record: &Record) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let folders = serde_json::to_string(&record.folders)?;
    let priority = match record.priority {
        Priority::Low => "low",
        Priority::High => "high",
    };

    conn.execute(
        r#"
        INSERT INTO records (
            id, account_id, subject, date, is_read, is_starred, priority, folders,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9
        )
        ON CONFLICT(id) DO UPDATE SET
            subject = excluded.subject,
            date = excluded.date,
            is_read = excluded.is_read,
            is_starred = excluded.is_starred,
            priority = excluded.priority,
            folders = excluded.folders,
            updated_at = excluded.updated_at
        "#,
        params![
            record.id.0,
            account.0,
            record.subject,
            record.date.to_rfc3339(),
            record.read as i32,
            record.starred as i32,
            priority,
            folders,
            now,
        ],
    )?;

    Ok(())
}

/// Reads a record together with the account that owns it.
pub(crate) fn read(conn: &Connection, record_id: &RecordId) -> Result<Option<(AccountId, Record)>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM records WHERE id = ?1"))?;
    Ok(stmt.query_row([&record_id.0], row_to_entry).optional()?)
}

pub(crate) fn delete(conn: &Connection, record_id: &RecordId) -> Result<()> {
    conn.execute("DELETE FROM records WHERE id = ?1", [&record_id.0])?;
    Ok(())
}

fn row_to_entry(row: &Row<'_>) -> std::result::Result<(AccountId, Record), rusqlite::Error> {
    let date_str: String = row.get(2)?;
    let priority: String = row.get(5)?;
    let folders_json: String = row.get(6)?;

    let date = DateTime::parse_from_rfc3339(&date_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    let folders: Vec<FolderId> = serde_json::from_str(&folders_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    let record = Record {
        id: RecordId(row.get(0)?),
        subject: row.get(1)?,
        date,
        read: row.get::<_, i32>(3)? != 0,
        starred: row.get::<_, i32>(4)? != 0,
        priority: match priority.as_str() {
            "high" => Priority::High,
            _ => Priority::Low,
        },
        folders,
        pending_local_removal: false,
    };

    Ok((AccountId(row.get(7)?), record))
}
