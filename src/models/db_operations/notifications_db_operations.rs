use redb::TableDefinition;
use uuid::Uuid;

use crate::models::db_operations::document_store::{
    Document, DocumentStore, DocumentTable, StoreError,
};
use crate::models::{Notification, Recipient};

pub const NOTIFICATIONS: DocumentTable = TableDefinition::new("notifications");

impl Document for Notification {
    const COLLECTION: &'static str = "notifications";
    const TABLE: DocumentTable = NOTIFICATIONS;

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

/// Notifications visible to `user_id` in one organization, newest first.
/// Broadcasts to approvers are included only when `include_approver_broadcasts` is set.
pub fn read_notifications_for_user(
    store: &DocumentStore,
    organization_id: &str,
    user_id: &str,
    include_approver_broadcasts: bool,
) -> Result<Vec<Notification>, StoreError> {
    let mut notifications = store.scan::<Notification>(|n| {
        n.organization_id == organization_id
            && match &n.recipient {
                Recipient::User(id) => id == user_id,
                Recipient::Approvers => include_approver_broadcasts,
            }
    })?;
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(notifications)
}
