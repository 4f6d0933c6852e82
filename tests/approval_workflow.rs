mod common;

use campaign_backend::error::WorkflowError;
use campaign_backend::helper::approval_helpers::{approve, reject};
use campaign_backend::helper::publisher::SimulatedPublisher;
use campaign_backend::helper::queue_processor::QueueProcessor;
use campaign_backend::helper::{content_helpers, notification_helpers, queue_helpers};
use campaign_backend::models::db_operations::{
    comments_db_operations, content_db_operations, queue_db_operations,
};
use campaign_backend::models::{
    CommentKind, ContentStatus, NotificationType, Permission, QueueEntryStatus, Recipient, Role,
};
use chrono::{Duration, NaiveTime, TimeZone, Utc};
use std::sync::Arc;

use common::*;

#[test]
fn approving_notifies_the_submitter_and_keeps_the_note() {
    let ctx = open_store();
    let item = in_review(&ctx, &editor(), "Launch");

    let approved =
        approve(&ctx.store, &ctx.table, &item.id, &approver(), Some("ship it"), Utc::now())
            .unwrap();
    assert_eq!(approved.status, ContentStatus::Approved);

    let notes =
        notification_helpers::list_notifications(&ctx.store, &ctx.table, &editor()).unwrap();
    let approval = notes.iter().find(|n| n.kind == NotificationType::Approved).unwrap();
    assert_eq!(approval.recipient, Recipient::User("u1".into()));
    assert_eq!(approval.post_title.as_deref(), Some("Launch"));

    let comments = comments_db_operations::read_comments_for_content(&ctx.store, &item.id).unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].kind, CommentKind::ApprovalNote);
    assert_eq!(comments[0].author_id, "a1");
}

#[test]
fn approving_without_notes_writes_no_comment() {
    let ctx = open_store();
    let item = in_review(&ctx, &editor(), "Launch");
    approve(&ctx.store, &ctx.table, &item.id, &approver(), Some("   "), Utc::now()).unwrap();
    let comments = comments_db_operations::read_comments_for_content(&ctx.store, &item.id).unwrap();
    assert!(comments.is_empty());
}

#[test]
fn rejection_requires_a_reason_and_changes_nothing_without_one() {
    let ctx = open_store();
    let item = in_review(&ctx, &editor(), "Launch");

    for reason in ["", "   "] {
        assert!(matches!(
            reject(&ctx.store, &ctx.table, &item.id, &approver(), reason, Utc::now()),
            Err(WorkflowError::Validation(_))
        ));
    }
    let stored = content_db_operations::read_content(&ctx.store, &item.id).unwrap().unwrap();
    assert_eq!(stored.status, ContentStatus::InReview);
    assert_eq!(stored.version, item.version);
}

#[test]
fn rejection_records_the_reason_for_the_submitter() {
    let ctx = open_store();
    let item = in_review(&ctx, &editor(), "Launch");

    let reason = "needs a hero image";
    let rejected =
        reject(&ctx.store, &ctx.table, &item.id, &approver(), reason, Utc::now()).unwrap();
    assert_eq!(rejected.status, ContentStatus::Rejected);

    let notes =
        notification_helpers::list_notifications(&ctx.store, &ctx.table, &editor()).unwrap();
    let rejection = notes.iter().find(|n| n.kind == NotificationType::Rejected).unwrap();
    assert_eq!(rejection.reason.as_deref(), Some("needs a hero image"));
    assert!(!rejection.is_read);

    let comments = comments_db_operations::read_comments_for_content(&ctx.store, &item.id).unwrap();
    assert_eq!(comments[0].kind, CommentKind::RejectionReason);
}

#[test]
fn roles_without_approval_rights_are_refused() {
    let ctx = open_store();
    let item = in_review(&ctx, &editor(), "Launch");

    for role in [Role::Editor, Role::Viewer] {
        let reviewer = actor("x1", "Xi", role);
        assert!(matches!(
            approve(&ctx.store, &ctx.table, &item.id, &reviewer, None, Utc::now()),
            Err(WorkflowError::Authorization(Permission::ApproveContent))
        ));
        assert!(matches!(
            reject(&ctx.store, &ctx.table, &item.id, &reviewer, "no", Utc::now()),
            Err(WorkflowError::Authorization(Permission::RejectContent))
        ));
    }
    let stored = content_db_operations::read_content(&ctx.store, &item.id).unwrap().unwrap();
    assert_eq!(stored.status, ContentStatus::InReview);
}

#[test]
fn only_items_in_review_can_be_decided() {
    let ctx = open_store();
    let item = draft(&ctx, &editor(), "Launch");

    assert!(matches!(
        approve(&ctx.store, &ctx.table, &item.id, &approver(), None, Utc::now()),
        Err(WorkflowError::InvalidTransition {
            from: ContentStatus::Draft,
            to: ContentStatus::Approved
        })
    ));

    let reviewed = in_review(&ctx, &editor(), "Other");
    approve(&ctx.store, &ctx.table, &reviewed.id, &approver(), None, Utc::now()).unwrap();
    assert!(matches!(
        reject(&ctx.store, &ctx.table, &reviewed.id, &approver(), "too late", Utc::now()),
        Err(WorkflowError::InvalidTransition {
            from: ContentStatus::Approved,
            to: ContentStatus::Rejected
        })
    ));
}

#[test]
fn decisions_on_unknown_items_are_not_found() {
    let ctx = open_store();
    let missing = uuid::Uuid::new_v4();
    assert!(matches!(
        approve(&ctx.store, &ctx.table, &missing, &approver(), None, Utc::now()),
        Err(WorkflowError::NotFound(_))
    ));
}

#[test]
fn review_requests_go_to_approvers() {
    let ctx = open_store();
    in_review(&ctx, &editor(), "Launch");

    let for_approver =
        notification_helpers::list_notifications(&ctx.store, &ctx.table, &approver()).unwrap();
    assert_eq!(for_approver.len(), 1);
    assert_eq!(for_approver[0].kind, NotificationType::ReviewRequest);
    let for_editor = notification_helpers::list_notifications(&ctx.store, &ctx.table, &editor());
    assert!(for_editor.unwrap().is_empty());
}

#[tokio::test]
async fn summer_sale_goes_from_draft_to_published() {
    let ctx = open_store();
    let u1 = editor();
    let a = approver();

    let item = draft(&ctx, &u1, "Summer Sale");
    assert_eq!(item.status, ContentStatus::Draft);

    let item = content_helpers::submit_for_review(&ctx.store, &ctx.table, &u1, &item.id, Utc::now())
        .unwrap();
    assert_eq!(item.status, ContentStatus::InReview);

    let item =
        approve(&ctx.store, &ctx.table, &item.id, &a, Some("looks good"), Utc::now()).unwrap();
    assert_eq!(item.status, ContentStatus::Approved);

    let notes = notification_helpers::list_notifications(&ctx.store, &ctx.table, &u1).unwrap();
    assert!(notes.iter().any(|n| n.kind == NotificationType::Approved
        && n.recipient == Recipient::User("u1".into())
        && n.post_title.as_deref() == Some("Summer Sale")));
    let comments = content_helpers::list_comments(&ctx.store, &u1, &item.id).unwrap();
    assert!(comments.iter().any(|c| c.text == "looks good"));

    let now = Utc::now();
    let tomorrow = now.date_naive() + Duration::days(1);
    let nine = Utc.from_utc_datetime(&tomorrow.and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap()));
    let entry = queue_helpers::enqueue(&ctx.store, &ctx.table, &u1, &item.id, nine, now).unwrap();
    assert_eq!(entry.status, QueueEntryStatus::Pending);
    let scheduled = content_db_operations::read_content(&ctx.store, &item.id).unwrap().unwrap();
    assert_eq!(scheduled.status, ContentStatus::Scheduled);

    let processor = QueueProcessor::with_limits(
        ctx.store.clone(),
        Arc::new(SimulatedPublisher),
        std::time::Duration::from_secs(5),
        Duration::minutes(5),
    );
    let report = processor.run_once(nine + Duration::minutes(1)).await.unwrap();
    assert_eq!(report.completed, vec![entry.id]);

    let published = content_db_operations::read_content(&ctx.store, &item.id).unwrap().unwrap();
    assert_eq!(published.status, ContentStatus::Published);
    let entry = queue_db_operations::read_queue_entry(&ctx.store, &entry.id).unwrap().unwrap();
    assert_eq!(entry.status, QueueEntryStatus::Completed);
    assert!(entry.published_at.is_some());
}
