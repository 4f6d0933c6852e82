use chrono::{DateTime, Utc};
use redb::TableDefinition;
use uuid::Uuid;

use crate::models::db_operations::document_store::{
    Document, DocumentStore, DocumentTable, StoreError,
};
use crate::models::{QueueEntry, QueueEntryStatus};

pub const QUEUE: DocumentTable = TableDefinition::new("queue");

impl Document for QueueEntry {
    const COLLECTION: &'static str = "queue";
    const TABLE: DocumentTable = QUEUE;

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

fn sort_by_schedule(entries: &mut [QueueEntry]) {
    entries.sort_by(|a, b| {
        a.scheduled_at
            .cmp(&b.scheduled_at)
            .then(a.created_at.cmp(&b.created_at))
    });
}

pub fn read_queue_entry(
    store: &DocumentStore,
    id: &Uuid,
) -> Result<Option<QueueEntry>, StoreError> {
    store.get::<QueueEntry>(id)
}

/// Every PENDING entry across all organizations, earliest schedule first.
pub fn read_pending_entries(store: &DocumentStore) -> Result<Vec<QueueEntry>, StoreError> {
    let mut entries = store.scan::<QueueEntry>(|e| e.status == QueueEntryStatus::Pending)?;
    sort_by_schedule(&mut entries);
    Ok(entries)
}

/// PENDING entries whose schedule has passed at `now`, earliest first.
pub fn read_due_entries(
    store: &DocumentStore,
    now: DateTime<Utc>,
) -> Result<Vec<QueueEntry>, StoreError> {
    let mut entries =
        store.scan::<QueueEntry>(|e| e.status == QueueEntryStatus::Pending && e.is_due(now))?;
    sort_by_schedule(&mut entries);
    Ok(entries)
}

pub fn read_pending_entries_for_organization(
    store: &DocumentStore,
    organization_id: &str,
) -> Result<Vec<QueueEntry>, StoreError> {
    let mut entries = store.scan::<QueueEntry>(|e| {
        e.status == QueueEntryStatus::Pending && e.organization_id == organization_id
    })?;
    sort_by_schedule(&mut entries);
    Ok(entries)
}

/// Claims that were taken before `cutoff` and never finished.
pub fn read_stale_claims(
    store: &DocumentStore,
    cutoff: DateTime<Utc>,
) -> Result<Vec<QueueEntry>, StoreError> {
    store.scan::<QueueEntry>(|e| {
        e.status == QueueEntryStatus::Processing && e.claimed_at.map_or(true, |at| at < cutoff)
    })
}
