use redb::TableDefinition;
use uuid::Uuid;

use crate::models::db_operations::document_store::{
    Document, DocumentStore, DocumentTable, StoreError,
};
use crate::models::{ContentItem, ContentStatus};

pub const CONTENT: DocumentTable = TableDefinition::new("content");

impl Document for ContentItem {
    const COLLECTION: &'static str = "content";
    const TABLE: DocumentTable = CONTENT;

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

pub fn read_content(store: &DocumentStore, id: &Uuid) -> Result<Option<ContentItem>, StoreError> {
    store.get::<ContentItem>(id)
}

/// Content of one organization, newest first, optionally narrowed to one status.
pub fn read_content_for_organization(
    store: &DocumentStore,
    organization_id: &str,
    status: Option<ContentStatus>,
) -> Result<Vec<ContentItem>, StoreError> {
    let mut items = store.scan::<ContentItem>(|item| {
        item.organization_id == organization_id && status.map_or(true, |s| item.status == s)
    })?;
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(items)
}

/// Items awaiting review, oldest submission first.
pub fn read_review_queue(
    store: &DocumentStore,
    organization_id: &str,
) -> Result<Vec<ContentItem>, StoreError> {
    let mut items = store.scan::<ContentItem>(|item| {
        item.organization_id == organization_id && item.status == ContentStatus::InReview
    })?;
    items.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
    Ok(items)
}
