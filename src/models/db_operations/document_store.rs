//! JSON documents in redb tables, one table per collection, keyed by UUID bytes.
//!
//! Writes go through [`DocumentStore::transact`]. redb runs one write
//! transaction at a time, so a read-check-write inside a single `transact`
//! call is a conditional write: no other writer can slip in between the
//! check and the update. Committed writes are announced on a broadcast
//! channel that callers can [`subscribe`](DocumentStore::subscribe) to.

use redb::{
    CommitError, Database, DatabaseError, ReadableTable, StorageError, TableDefinition, TableError,
    TransactionError, WriteTransaction,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redb database error: {0}")]
    RedbDatabase(#[from] DatabaseError),
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

pub type DocumentTable = TableDefinition<'static, &'static [u8; 16], &'static str>;

const CHANGE_FEED_CAPACITY: usize = 256;

/// A record stored as JSON in one collection.
pub trait Document: Serialize + DeserializeOwned {
    const COLLECTION: &'static str;
    const TABLE: DocumentTable;

    fn id(&self) -> Uuid;
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub collection: &'static str,
    pub id: Uuid,
}

#[derive(Clone)]
pub struct DocumentStore {
    db: Arc<Database>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl DocumentStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = Database::create(path)?;
        Self::from_database(db)
    }

    pub fn from_database(db: Database) -> Result<Self, StoreError> {
        let write_txn = db.begin_write()?;
        for table in super::ALL_COLLECTIONS {
            write_txn.open_table(table)?;
        }
        write_txn.commit()?;

        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(DocumentStore { db: Arc::new(db), changes })
    }

    pub fn get<D: Document>(&self, id: &Uuid) -> Result<Option<D>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(D::TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let guard = table.get(&id.into_bytes())?;
        let doc = match guard {
            Some(json) => Some(serde_json::from_str(json.value())?),
            None => None,
        };
        Ok(doc)
    }

    /// Full collection scan. Malformed documents are logged and skipped.
    pub fn scan<D: Document>(
        &self,
        mut keep: impl FnMut(&D) -> bool,
    ) -> Result<Vec<D>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(D::TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut docs = Vec::new();
        for item in table.iter()? {
            let (key, json) = item?;
            match serde_json::from_str::<D>(json.value()) {
                Ok(doc) => {
                    if keep(&doc) {
                        docs.push(doc);
                    }
                }
                Err(e) => log::warn!(
                    "Skipping malformed {} document {}: {}",
                    D::COLLECTION,
                    Uuid::from_bytes(*key.value()),
                    e
                ),
            }
        }
        Ok(docs)
    }

    /// Runs `f` inside one write transaction. The transaction commits only when
    /// `f` returns `Ok`; any error aborts every write made so far.
    pub fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut StoreTxn<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let write_txn = self.db.begin_write().map_err(StoreError::from)?;
        let mut txn = StoreTxn { txn: &write_txn, changes: Vec::new() };
        let outcome = f(&mut txn);
        let changes = txn.changes;

        match outcome {
            Ok(value) => {
                write_txn.commit().map_err(StoreError::from)?;
                for change in changes {
                    // Nobody listening is fine.
                    let _ = self.changes.send(change);
                }
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = write_txn.abort() {
                    log::error!("Failed to abort document store transaction: {}", abort_err);
                }
                Err(e)
            }
        }
    }

    /// Live feed of committed writes, optionally narrowed to one collection.
    /// Dropping the subscription unsubscribes.
    pub fn subscribe(&self, collection: Option<&'static str>) -> Subscription {
        Subscription { receiver: self.changes.subscribe(), collection }
    }
}

pub struct StoreTxn<'a> {
    txn: &'a WriteTransaction,
    changes: Vec<ChangeEvent>,
}

impl StoreTxn<'_> {
    pub fn get<D: Document>(&self, id: &Uuid) -> Result<Option<D>, StoreError> {
        let table = self.txn.open_table(D::TABLE)?;
        let guard = table.get(&id.into_bytes())?;
        let doc = match guard {
            Some(json) => Some(serde_json::from_str(json.value())?),
            None => None,
        };
        Ok(doc)
    }

    /// Stores a new document at version 1.
    pub fn create<D: Document>(&mut self, doc: &mut D) -> Result<(), StoreError> {
        doc.set_version(1);
        self.write(doc)
    }

    /// Replaces an existing document and bumps its version.
    pub fn update<D: Document>(&mut self, doc: &mut D) -> Result<(), StoreError> {
        doc.set_version(doc.version() + 1);
        self.write(doc)
    }

    pub fn remove<D: Document>(&mut self, id: &Uuid) -> Result<bool, StoreError> {
        let existed = {
            let mut table = self.txn.open_table(D::TABLE)?;
            let removed = table.remove(&id.into_bytes())?;
            removed.is_some()
        };
        if existed {
            self.changes.push(ChangeEvent { collection: D::COLLECTION, id: *id });
        }
        Ok(existed)
    }

    fn write<D: Document>(&mut self, doc: &D) -> Result<(), StoreError> {
        let json = serde_json::to_string(doc)?;
        {
            let mut table = self.txn.open_table(D::TABLE)?;
            table.insert(&doc.id().into_bytes(), json.as_str())?;
        }
        self.changes.push(ChangeEvent { collection: D::COLLECTION, id: doc.id() });
        Ok(())
    }
}

pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    collection: Option<&'static str>,
}

impl Subscription {
    fn wanted(&self, event: &ChangeEvent) -> bool {
        self.collection.map_or(true, |c| c == event.collection)
    }

    /// Waits for the next matching change. Returns `None` once the store is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.wanted(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Change subscriber lagged behind; {} events dropped.", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`next`](Self::next).
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.wanted(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    log::warn!("Change subscriber lagged behind; {} events dropped.", skipped);
                }
                Err(_) => return None,
            }
        }
    }
}
