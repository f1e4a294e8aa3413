//! Per-account settings.
//!
//! Only the auto-advance preference is persisted here; everything else about
//! an account comes from the host.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::domain::{AccountId, AutoAdvance};
use crate::storage::database::{Database, Result};

/// Stores the auto-advance preference of an account.
pub async fn save_auto_advance(
    db: &Database,
    account: &AccountId,
    value: AutoAdvance,
) -> Result<()> {
    let account = account.clone();

    db.with_conn(move |conn| {
        let value = match value {
            AutoAdvance::Unset => "unset",
            AutoAdvance::Older => "older",
            AutoAdvance::Newer => "newer",
            AutoAdvance::List => "list",
        };
        conn.execute(
            r#"
            INSERT INTO account_settings (account_id, auto_advance, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(account_id) DO UPDATE SET
                auto_advance = excluded.auto_advance,
                updated_at = excluded.updated_at
            "#,
            params![account.0, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    })
    .await
}

/// The stored auto-advance preference, if one was ever saved.
pub async fn auto_advance(db: &Database, account: &AccountId) -> Result<Option<AutoAdvance>> {
    let account = account.clone();

    db.with_conn(move |conn| {
        let value: Option<String> = conn
            .query_row(
                "SELECT auto_advance FROM account_settings WHERE account_id = ?1",
                [&account.0],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value.map(|v| match v.as_str() {
            "older" => AutoAdvance::Older,
            "newer" => AutoAdvance::Newer,
            "list" => AutoAdvance::List,
            _ => AutoAdvance::Unset,
        }))
    })
    .await
}
