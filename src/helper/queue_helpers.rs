use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::helper::access_helpers::{
    apply_transition, check_transition, load_content_for_update, require_permission,
};
use crate::helper::sanitization_helpers;
use crate::models::db_operations::document_store::DocumentStore;
use crate::models::db_operations::queue_db_operations;
use crate::models::{
    Actor, Permission, Platform, QueueEntry, QueueEntryStatus, RolePermissionTable, Transition,
};

fn reject_past_schedule(
    scheduled_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    if scheduled_at < now {
        return Err(WorkflowError::Validation(format!(
            "Scheduled time {} is in the past.",
            scheduled_at.to_rfc3339()
        )));
    }
    Ok(())
}

fn new_entry(
    actor: &Actor,
    content_id: Option<Uuid>,
    platform: Platform,
    text: Option<String>,
    scheduled_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> QueueEntry {
    QueueEntry {
        id: Uuid::new_v4(),
        organization_id: actor.organization_id.clone(),
        content_id,
        user_id: actor.user_id.clone(),
        platform,
        text,
        scheduled_at,
        status: QueueEntryStatus::Pending,
        created_at: now,
        claimed_by: None,
        claimed_at: None,
        published_at: None,
        external_id: None,
        error: None,
        version: 0,
    }
}

/// Schedules approved (or previously failed) content: a PENDING entry plus the move to SCHEDULED.
pub fn enqueue(
    store: &DocumentStore,
    table: &RolePermissionTable,
    actor: &Actor,
    content_id: &Uuid,
    scheduled_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<QueueEntry, WorkflowError> {
    reject_past_schedule(scheduled_at, now)?;

    store.transact(|txn| {
        let mut item = load_content_for_update(txn, actor, content_id)?;
        check_transition(table, actor, &item, Transition::Schedule)?;

        let mut entry = new_entry(actor, Some(item.id), item.platform, None, scheduled_at, now);
        txn.create(&mut entry)?;
        apply_transition(&mut item, Transition::Schedule, now);
        txn.update(&mut item)?;

        log::info!(
            "Content {} scheduled for {} on {} (entry {})",
            item.id,
            scheduled_at.to_rfc3339(),
            item.platform,
            entry.id
        );
        Ok(entry)
    })
}

/// Queues free text with no linked content item.
pub fn enqueue_adhoc(
    store: &DocumentStore,
    table: &RolePermissionTable,
    actor: &Actor,
    platform: Platform,
    text: &str,
    scheduled_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<QueueEntry, WorkflowError> {
    require_permission(table, actor, Permission::CreateCampaign)?;
    let text = sanitization_helpers::clean_text(text)
        .ok_or_else(|| WorkflowError::Validation("Post text cannot be empty.".to_string()))?;
    reject_past_schedule(scheduled_at, now)?;

    let mut entry = new_entry(actor, None, platform, Some(text), scheduled_at, now);
    store.transact::<_, WorkflowError, _>(|txn| Ok(txn.create(&mut entry)?))?;
    log::info!("Ad hoc post {} queued for {} on {}", entry.id, scheduled_at.to_rfc3339(), platform);
    Ok(entry)
}

/// PENDING entries due at `now`, across all organizations.
pub fn list_due(
    store: &DocumentStore,
    now: DateTime<Utc>,
) -> Result<Vec<QueueEntry>, WorkflowError> {
    Ok(queue_db_operations::read_due_entries(store, now)?)
}

/// Every PENDING entry, due or not.
pub fn list_pending(store: &DocumentStore) -> Result<Vec<QueueEntry>, WorkflowError> {
    Ok(queue_db_operations::read_pending_entries(store)?)
}

pub fn list_pending_for_org(
    store: &DocumentStore,
    actor: &Actor,
) -> Result<Vec<QueueEntry>, WorkflowError> {
    let organization_id = &actor.organization_id;
    Ok(queue_db_operations::read_pending_entries_for_organization(store, organization_id)?)
}
