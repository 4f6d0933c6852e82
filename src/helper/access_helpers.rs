use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::models::db_operations::document_store::StoreTxn;
use crate::models::{Actor, ContentItem, Permission, RolePermissionTable, Transition};

pub fn require_permission(
    table: &RolePermissionTable,
    actor: &Actor,
    permission: Permission,
) -> Result<(), WorkflowError> {
    if table.has_permission(actor.role, permission) {
        return Ok(());
    }
    log::warn!(
        "User '{}' ({}) in organization '{}' was denied {:?}",
        actor.user_id,
        actor.role.map_or("no role", |r| r.as_str()),
        actor.organization_id,
        permission
    );
    Err(WorkflowError::Authorization(permission))
}

/// Passes when the actor holds at least one of `permissions`. The first one is reported on failure.
pub fn require_any_permission(
    table: &RolePermissionTable,
    actor: &Actor,
    permissions: &[Permission],
) -> Result<(), WorkflowError> {
    if permissions.iter().any(|p| table.has_permission(actor.role, *p)) {
        return Ok(());
    }
    match permissions.first() {
        Some(first) => require_permission(table, actor, *first),
        None => Ok(()),
    }
}

/// Permission first, then legality of the move from the item's current status.
pub fn check_transition(
    table: &RolePermissionTable,
    actor: &Actor,
    item: &ContentItem,
    transition: Transition,
) -> Result<(), WorkflowError> {
    if let Some(permission) = transition.required_permission() {
        require_permission(table, actor, permission)?;
    }
    if !transition.allowed_from(item.status) {
        return Err(WorkflowError::InvalidTransition { from: item.status, to: transition.target() });
    }
    Ok(())
}

pub fn apply_transition(item: &mut ContentItem, transition: Transition, now: DateTime<Utc>) {
    let to = transition.target();
    if item.status != to {
        log::info!("Content {}: {} -> {}", item.id, item.status, to);
    }
    item.status = to;
    item.updated_at = now;
}

/// Items of other organizations read as missing.
pub fn ensure_same_organization(
    actor: &Actor,
    item: ContentItem,
) -> Result<ContentItem, WorkflowError> {
    if item.organization_id != actor.organization_id {
        return Err(WorkflowError::not_found("Content", item.id));
    }
    Ok(item)
}

/// Loads a content item inside a write transaction, scoped to the actor's organization.
pub fn load_content_for_update(
    txn: &StoreTxn<'_>,
    actor: &Actor,
    content_id: &Uuid,
) -> Result<ContentItem, WorkflowError> {
    let item = txn
        .get::<ContentItem>(content_id)?
        .ok_or_else(|| WorkflowError::not_found("Content", content_id))?;
    ensure_same_organization(actor, item)
}
