//! Review decisions on submitted content.
//!
//! Each decision is one document-store transaction: the status change, the
//! reviewer's comment and the notification to the submitter commit together
//! or not at all. The submitter and title always come from the stored item.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::helper::access_helpers::{apply_transition, check_transition, load_content_for_update};
use crate::helper::content_helpers::build_comment;
use crate::helper::notification_helpers::build_notification;
use crate::helper::sanitization_helpers;
use crate::models::db_operations::document_store::DocumentStore;
use crate::models::{
    Actor, CommentKind, ContentItem, NotificationType, Recipient, RolePermissionTable, Transition,
};

/// IN_REVIEW → APPROVED. Non-empty `notes` are kept as an approval comment.
pub fn approve(
    store: &DocumentStore,
    table: &RolePermissionTable,
    content_id: &Uuid,
    approver: &Actor,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ContentItem, WorkflowError> {
    let notes = notes.and_then(sanitization_helpers::clean_text);

    store.transact(|txn| {
        let mut item = load_content_for_update(txn, approver, content_id)?;
        check_transition(table, approver, &item, Transition::Approve)?;
        apply_transition(&mut item, Transition::Approve, now);
        txn.update(&mut item)?;

        if let Some(text) = notes {
            let mut comment = build_comment(&item, approver, CommentKind::ApprovalNote, text, now);
            txn.create(&mut comment)?;
        }

        let mut notification = build_notification(
            &item.organization_id,
            Recipient::User(item.submitter().to_string()),
            NotificationType::Approved,
            format!("\"{}\" was approved by {}", item.title, approver.display_name),
            Some(&item),
            None,
            now,
        );
        txn.create(&mut notification)?;

        log::info!("Content {} approved by {}", item.id, approver.user_id);
        Ok(item)
    })
}

/// IN_REVIEW → REJECTED. The reason is required and checked before anything is read or written.
pub fn reject(
    store: &DocumentStore,
    table: &RolePermissionTable,
    content_id: &Uuid,
    approver: &Actor,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<ContentItem, WorkflowError> {
    let reason = sanitization_helpers::clean_text(reason)
        .ok_or_else(|| WorkflowError::Validation("A rejection reason is required.".to_string()))?;

    store.transact(|txn| {
        let mut item = load_content_for_update(txn, approver, content_id)?;
        check_transition(table, approver, &item, Transition::Reject)?;
        apply_transition(&mut item, Transition::Reject, now);
        txn.update(&mut item)?;

        let mut comment =
            build_comment(&item, approver, CommentKind::RejectionReason, reason.clone(), now);
        txn.create(&mut comment)?;

        let mut notification = build_notification(
            &item.organization_id,
            Recipient::User(item.submitter().to_string()),
            NotificationType::Rejected,
            format!("\"{}\" was rejected by {}", item.title, approver.display_name),
            Some(&item),
            Some(reason),
            now,
        );
        txn.create(&mut notification)?;

        log::info!("Content {} rejected by {}", item.id, approver.user_id);
        Ok(item)
    })
}
