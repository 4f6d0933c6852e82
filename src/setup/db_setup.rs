use redb::{CommitError, Database, StorageError, TableError, TransactionError};
use rusqlite::Connection;
use thiserror::Error;

use crate::models::db_operations::{
    comments_db_operations::COMMENTS, content_db_operations::CONTENT,
    notifications_db_operations::NOTIFICATIONS, queue_db_operations::QUEUE,
};

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
}

pub fn setup_members_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;
    log::info!("Creating 'members' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS members (
            user_id TEXT NOT NULL,
            organization_id TEXT NOT NULL,
            display_name TEXT NOT NULL,
            role TEXT CHECK(role IS NULL OR role IN ('admin', 'marketer', 'editor', 'viewer')),
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, organization_id)
        )",
        [],
    )?;

    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_members_organization ON members (organization_id)",
        [],
    )?;

    tx.commit()?;
    Ok(())
}

pub fn setup_documents_db(db: &Database) -> Result<(), SetupError> {
    let write_txn = db.begin_write()?;
    {
        log::info!("Creating 'content' table in Redb...");
        write_txn.open_table(CONTENT)?;

        log::info!("Creating 'queue' table in Redb...");
        write_txn.open_table(QUEUE)?;

        log::info!("Creating 'notifications' table in Redb...");
        write_txn.open_table(NOTIFICATIONS)?;

        log::info!("Creating 'comments' table in Redb...");
        write_txn.open_table(COMMENTS)?;
    }
    write_txn.commit()?;
    Ok(())
}
