use redb::TableDefinition;
use uuid::Uuid;

use crate::models::db_operations::document_store::{
    Document, DocumentStore, DocumentTable, StoreError,
};
use crate::models::Comment;

// Comments of all content items share one table; `content_id` scopes them.
pub const COMMENTS: DocumentTable = TableDefinition::new("comments");

impl Document for Comment {
    const COLLECTION: &'static str = "comments";
    const TABLE: DocumentTable = COMMENTS;

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

/// Comments of one content item in the order they were written.
pub fn read_comments_for_content(
    store: &DocumentStore,
    content_id: &Uuid,
) -> Result<Vec<Comment>, StoreError> {
    let mut comments = store.scan::<Comment>(|c| &c.content_id == content_id)?;
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(comments)
}
