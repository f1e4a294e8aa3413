//! mailflow - Headless demo of the mailbox coordination engine
//!
//! Opens the local store, seeds an inbox on first run, archives the oldest
//! record and reverses it again, logging every step.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{Duration as Age, Utc};

use mailflow::app::HeadlessPresenter;
use mailflow::config::Settings;
use mailflow::domain::{system_folders, Account, AccountId, Folder, FolderType, Record};
use mailflow::services::{MailboxController, MutationKind, Toast};
use mailflow::storage::{RecordStore, SqliteStore, ViewSpec};

const SUBJECTS: [&str; 4] = [
    "Quarterly planning",
    "Build is green again",
    "Lunch on Thursday?",
    "Invoice #2291",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting mailflow");

    let settings = Settings::load().context("failed to load settings")?;
    let db_path = settings
        .database_path()
        .context("failed to resolve database path")?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let store = Arc::new(
        SqliteStore::open(&db_path)
            .await
            .with_context(|| format!("failed to open {}", db_path.display()))?,
    );

    let account = Account::new("demo", "Demo").with_undo("undo://demo");
    seed(&store, &account.id).await?;

    let mut controller =
        MailboxController::new(store.clone(), Arc::new(HeadlessPresenter), &settings);
    controller.on_account_changed(account)?;

    while controller.cursor().map_or(true, |c| !c.is_loaded()) {
        if !controller.process_next().await {
            return Ok(());
        }
    }

    let settle = Duration::from_millis(100) + settings.behavior.undo_bar_delay();
    let Some(oldest) = controller
        .cursor()
        .and_then(|c| c.records())
        .and_then(|set| set.get(0))
        .cloned()
    else {
        tracing::warn!("inbox is empty, nothing to do");
        return Ok(());
    };

    tracing::info!(record_id = %oldest.id, subject = ?oldest.subject, "archiving oldest record");
    controller.destroy(MutationKind::Archive, vec![oldest])?;
    drain(&mut controller, settle).await;

    if matches!(controller.toast(), Some(Toast::Undo(_))) {
        tracing::info!("undo offered, taking it");
        controller.undo()?;
        drain(&mut controller, settle).await;
    }

    let count = controller
        .cursor()
        .and_then(|c| c.records())
        .map_or(0, |set| set.len());
    tracing::info!(count, "inbox settled");

    let snapshot = controller.save_state_json()?;
    tracing::debug!(snapshot, "session state");

    controller.on_pause();
    Ok(())
}

/// Fills an empty store with a handful of inbox records.
async fn seed(store: &SqliteStore, account: &AccountId) -> anyhow::Result<()> {
    let inbox = Folder::new(system_folders::inbox(), "Inbox").with_type(FolderType::Inbox);
    store.add_folder(account, &inbox, true).await?;

    let existing = store
        .fetch(&ViewSpec::folder(account.clone(), inbox.id.clone()))
        .await?;
    if !existing.is_empty() {
        return Ok(());
    }

    let now = Utc::now();
    let records: Vec<Record> = SUBJECTS
        .iter()
        .enumerate()
        .map(|(n, subject)| {
            Record::new(format!("demo-{n}"), now - Age::hours(n as i64))
                .with_subject(*subject)
                .in_folder(inbox.id.clone())
        })
        .collect();

    futures::future::try_join_all(records.iter().map(|r| store.insert(account, r)))
        .await
        .context("failed to seed demo records")?;
    tracing::info!(count = records.len(), "seeded demo inbox");
    Ok(())
}

/// Handles messages until the controller has been idle for a moment.
async fn drain(controller: &mut MailboxController, idle: Duration) {
    while let Ok(true) = tokio::time::timeout(idle, controller.process_next()).await {}
}
