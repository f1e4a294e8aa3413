//! Single-slot undo log.
//!
//! Stores the prior state of each record touched by the last undoable batch.
//! Writing a new batch replaces the slot; taking it empties it.

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::domain::{AccountId, Record, RecordId};
use crate::storage::database::{Database, Result};

/// Prior state of one record. `None` means the record did not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    pub record_id: RecordId,
    pub account_id: AccountId,
    pub snapshot: Option<Record>,
}

/// True when there is a batch to undo.
pub async fn has_entries(db: &Database) -> Result<bool> {
    db.with_conn(|conn| {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM undo_log", [], |row| row.get(0))?;
        Ok(count > 0)
    })
    .await
}

pub(crate) fn replace(conn: &Connection, entries: &[UndoEntry]) -> Result<()> {
    conn.execute("DELETE FROM undo_log", [])?;

    let now = Utc::now().to_rfc3339();
    let mut stmt = conn.prepare(
        "INSERT INTO undo_log (record_id, account_id, snapshot, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for entry in entries {
        let snapshot = entry
            .snapshot
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        stmt.execute(params![entry.record_id.0, entry.account_id.0, snapshot, now])?;
    }
    Ok(())
}

pub(crate) fn take(conn: &Connection) -> Result<Vec<UndoEntry>> {
    let rows: Vec<(String, String, Option<String>)> = {
        let mut stmt =
            conn.prepare("SELECT record_id, account_id, snapshot FROM undo_log ORDER BY seq ASC")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        rows.collect::<std::result::Result<_, _>>()?
    };
    conn.execute("DELETE FROM undo_log", [])?;

    rows.into_iter()
        .map(|(record_id, account_id, snapshot)| -> Result<UndoEntry> {
            Ok(UndoEntry {
                record_id: RecordId(record_id),
                account_id: AccountId(account_id),
                snapshot: snapshot.as_deref().map(serde_json::from_str).transpose()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, snapshot: Option<Record>) -> UndoEntry {
        UndoEntry {
            record_id: RecordId::from(id),
            account_id: AccountId::from("acct"),
            snapshot,
        }
    }

    #[tokio::test]
    async fn replace_keeps_only_latest_batch() {
        let db = Database::open_in_memory().await.unwrap();
        let first = vec![entry("a", Some(Record::new("a", Utc::now())))];
        let second = vec![entry("b", None), entry("c", Some(Record::new("c", Utc::now())))];

        db.transaction(move |tx| replace(tx, &first)).await.unwrap();
        let expected = second.clone();
        db.transaction(move |tx| replace(tx, &second)).await.unwrap();

        let taken = db.transaction(|tx| take(tx)).await.unwrap();
        assert_eq!(taken, expected);
        assert!(!has_entries(&db).await.unwrap());
    }
}
