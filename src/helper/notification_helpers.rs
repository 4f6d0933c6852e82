use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::models::db_operations::document_store::DocumentStore;
use crate::models::db_operations::notifications_db_operations;
use crate::models::{
    Actor, ContentItem, Notification, NotificationType, Permission, Recipient, RolePermissionTable,
};

/// Builds an unread notification. `content` fills in the linked item and its title.
pub fn build_notification(
    organization_id: &str,
    recipient: Recipient,
    kind: NotificationType,
    message: String,
    content: Option<&ContentItem>,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        organization_id: organization_id.to_string(),
        recipient,
        kind,
        message,
        content_id: content.map(|c| c.id),
        post_title: content.map(|c| c.title.clone()),
        reason,
        is_read: false,
        created_at: now,
        version: 0,
    }
}

fn sees_approver_broadcasts(table: &RolePermissionTable, actor: &Actor) -> bool {
    table.has_permission(actor.role, Permission::ApproveContent)
}

fn is_visible_to(table: &RolePermissionTable, actor: &Actor, notification: &Notification) -> bool {
    notification.organization_id == actor.organization_id
        && match &notification.recipient {
            Recipient::User(id) => id == &actor.user_id,
            Recipient::Approvers => sees_approver_broadcasts(table, actor),
        }
}

/// Everything addressed to the actor, plus approver broadcasts if their role can approve.
pub fn list_notifications(
    store: &DocumentStore,
    table: &RolePermissionTable,
    actor: &Actor,
) -> Result<Vec<Notification>, WorkflowError> {
    Ok(notifications_db_operations::read_notifications_for_user(
        store,
        &actor.organization_id,
        &actor.user_id,
        sees_approver_broadcasts(table, actor),
    )?)
}

pub fn unread_count(
    store: &DocumentStore,
    table: &RolePermissionTable,
    actor: &Actor,
) -> Result<usize, WorkflowError> {
    Ok(list_notifications(store, table, actor)?.iter().filter(|n| !n.is_read).count())
}

/// Marks one notification read. Marking an already-read notification is a no-op.
pub fn mark_notification_read(
    store: &DocumentStore,
    table: &RolePermissionTable,
    actor: &Actor,
    notification_id: &Uuid,
) -> Result<Notification, WorkflowError> {
    store.transact(|txn| {
        let mut notification = txn
            .get::<Notification>(notification_id)?
            .filter(|n| is_visible_to(table, actor, n))
            .ok_or_else(|| WorkflowError::not_found("Notification", notification_id))?;
        if !notification.is_read {
            notification.is_read = true;
            txn.update(&mut notification)?;
        }
        Ok(notification)
    })
}
