use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::helper::access_helpers::{
    apply_transition, check_transition, ensure_same_organization, load_content_for_update,
    require_any_permission, require_permission,
};
use crate::helper::notification_helpers::build_notification;
use crate::helper::sanitization_helpers;
use crate::models::db_operations::comments_db_operations;
use crate::models::db_operations::content_db_operations;
use crate::models::db_operations::document_store::DocumentStore;
use crate::models::{
    Actor, Comment, CommentKind, ContentItem, ContentStatus, NotificationType, Permission, Platform,
    Recipient, RolePermissionTable, Transition,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewContent {
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub platform: Platform,
    pub assigned_user: Option<String>,
}

/// Partial edit of a draft. `expected_version`, when given, must match the stored version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentEdit {
    pub title: Option<String>,
    pub body: Option<String>,
    pub platform: Option<Platform>,
    pub assigned_user: Option<String>,
    pub expected_version: Option<u64>,
}

fn required_title(raw: &str) -> Result<String, WorkflowError> {
    sanitization_helpers::clean_text(raw)
        .ok_or_else(|| WorkflowError::Validation("Title cannot be empty.".to_string()))
}

fn clean_body(raw: &str) -> String {
    sanitization_helpers::clean_text(raw).unwrap_or_default()
}

pub fn create_draft(
    store: &DocumentStore,
    table: &RolePermissionTable,
    actor: &Actor,
    new: NewContent,
    now: DateTime<Utc>,
) -> Result<ContentItem, WorkflowError> {
    require_any_permission(table, actor, &[Permission::CreateCampaign, Permission::EditContent])?;
    let title = required_title(&new.title)?;

    let mut item = ContentItem {
        id: Uuid::new_v4(),
        organization_id: actor.organization_id.clone(),
        title,
        body: clean_body(&new.body),
        platform: new.platform,
        status: ContentStatus::Draft,
        created_by: actor.user_id.clone(),
        created_by_name: actor.display_name.clone(),
        assigned_user: new.assigned_user.and_then(|u| sanitization_helpers::clean_text(&u)),
        submitted_by: None,
        created_at: now,
        updated_at: now,
        version: 0,
    };
    store.transact::<_, WorkflowError, _>(|txn| Ok(txn.create(&mut item)?))?;
    log::info!("Draft '{}' ({}) created by {}", item.title, item.id, actor.user_id);
    Ok(item)
}

pub fn update_draft(
    store: &DocumentStore,
    table: &RolePermissionTable,
    actor: &Actor,
    content_id: &Uuid,
    edit: ContentEdit,
    now: DateTime<Utc>,
) -> Result<ContentItem, WorkflowError> {
    let title = edit.title.as_deref().map(required_title).transpose()?;

    store.transact(|txn| {
        let mut item = load_content_for_update(txn, actor, content_id)?;
        check_transition(table, actor, &item, Transition::Edit)?;
        if let Some(expected) = edit.expected_version {
            if expected != item.version {
                return Err(WorkflowError::Conflict(format!(
                    "content {} is at version {}, not {}",
                    item.id, item.version, expected
                )));
            }
        }

        if let Some(title) = title {
            item.title = title;
        }
        if let Some(body) = &edit.body {
            item.body = clean_body(body);
        }
        if let Some(platform) = edit.platform {
            item.platform = platform;
        }
        if let Some(assigned) = &edit.assigned_user {
            item.assigned_user = sanitization_helpers::clean_text(assigned);
        }
        apply_transition(&mut item, Transition::Edit, now);
        txn.update(&mut item)?;
        Ok(item)
    })
}

/// Removes an item with its comments. Queue entries left behind fail when their turn comes.
pub fn delete_content(
    store: &DocumentStore,
    table: &RolePermissionTable,
    actor: &Actor,
    content_id: &Uuid,
) -> Result<(), WorkflowError> {
    require_permission(table, actor, Permission::DeleteContent)?;
    let comments = comments_db_operations::read_comments_for_content(store, content_id)?;

    store.transact(|txn| {
        let item = load_content_for_update(txn, actor, content_id)?;
        txn.remove::<ContentItem>(&item.id)?;
        for comment in &comments {
            txn.remove::<Comment>(&comment.id)?;
        }
        log::info!("Content {} deleted by {}", item.id, actor.user_id);
        Ok(())
    })
}

/// DRAFT → IN_REVIEW, and a review request to everyone who can approve.
pub fn submit_for_review(
    store: &DocumentStore,
    table: &RolePermissionTable,
    actor: &Actor,
    content_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<ContentItem, WorkflowError> {
    store.transact(|txn| {
        let mut item = load_content_for_update(txn, actor, content_id)?;
        check_transition(table, actor, &item, Transition::Submit)?;
        apply_transition(&mut item, Transition::Submit, now);
        item.submitted_by = Some(actor.user_id.clone());
        txn.update(&mut item)?;

        let mut request = build_notification(
            &item.organization_id,
            Recipient::Approvers,
            NotificationType::ReviewRequest,
            format!("{} submitted \"{}\" for review", actor.display_name, item.title),
            Some(&item),
            None,
            now,
        );
        txn.create(&mut request)?;
        log::info!("Content {} submitted for review by {}", item.id, actor.user_id);
        Ok(item)
    })
}

pub fn get_content(
    store: &DocumentStore,
    actor: &Actor,
    content_id: &Uuid,
) -> Result<ContentItem, WorkflowError> {
    let item = content_db_operations::read_content(store, content_id)?
        .ok_or_else(|| WorkflowError::not_found("Content", content_id))?;
    ensure_same_organization(actor, item)
}

pub fn list_content(
    store: &DocumentStore,
    actor: &Actor,
    status: Option<ContentStatus>,
) -> Result<Vec<ContentItem>, WorkflowError> {
    Ok(content_db_operations::read_content_for_organization(store, &actor.organization_id, status)?)
}

/// Items waiting on a decision. Only roles that can approve may look.
pub fn list_review_queue(
    store: &DocumentStore,
    table: &RolePermissionTable,
    actor: &Actor,
) -> Result<Vec<ContentItem>, WorkflowError> {
    require_permission(table, actor, Permission::ApproveContent)?;
    Ok(content_db_operations::read_review_queue(store, &actor.organization_id)?)
}

pub fn build_comment(
    item: &ContentItem,
    author: &Actor,
    kind: CommentKind,
    text: String,
    now: DateTime<Utc>,
) -> Comment {
    Comment {
        id: Uuid::new_v4(),
        content_id: item.id,
        organization_id: item.organization_id.clone(),
        author_id: author.user_id.clone(),
        author_name: author.display_name.clone(),
        kind,
        text,
        created_at: now,
        version: 0,
    }
}

/// Any member of the organization may comment.
pub fn add_comment(
    store: &DocumentStore,
    actor: &Actor,
    content_id: &Uuid,
    text: &str,
    now: DateTime<Utc>,
) -> Result<Comment, WorkflowError> {
    let text = sanitization_helpers::clean_text(text)
        .ok_or_else(|| WorkflowError::Validation("Comment cannot be empty.".to_string()))?;
    store.transact(|txn| {
        let item = load_content_for_update(txn, actor, content_id)?;
        let mut comment = build_comment(&item, actor, CommentKind::Note, text, now);
        txn.create(&mut comment)?;
        Ok(comment)
    })
}

pub fn list_comments(
    store: &DocumentStore,
    actor: &Actor,
    content_id: &Uuid,
) -> Result<Vec<Comment>, WorkflowError> {
    let item = get_content(store, actor, content_id)?;
    Ok(comments_db_operations::read_comments_for_content(store, &item.id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use tempfile::TempDir;

    fn store() -> (TempDir, DocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(&dir.path().join("documents.redb")).unwrap();
        (dir, store)
    }

    fn member(user_id: &str, organization_id: &str, role: Option<Role>) -> Actor {
        Actor {
            user_id: user_id.to_string(),
            display_name: user_id.to_uppercase(),
            organization_id: organization_id.to_string(),
            role,
        }
    }

    fn draft(store: &DocumentStore, actor: &Actor, title: &str) -> ContentItem {
        let new = NewContent {
            title: title.to_string(),
            body: "Body".to_string(),
            platform: Platform::Instagram,
            assigned_user: None,
        };
        create_draft(store, &RolePermissionTable::standard(), actor, new, Utc::now()).unwrap()
    }

    #[test]
    fn drafts_are_sanitised_and_need_a_title() {
        let (_dir, store) = store();
        let table = RolePermissionTable::standard();
        let ed = member("ed", "org-1", Some(Role::Editor));

        let item = draft(&store, &ed, "<b>Spring</b> promo");
        assert_eq!(item.title, "Spring promo");
        assert_eq!(item.status, ContentStatus::Draft);
        assert_eq!(item.version, 1);
        assert_eq!(draft(&store, &ed, "Salt & Pepper").title, "Salt & Pepper");

        let blank = NewContent {
            title: "  ".into(),
            body: String::new(),
            platform: Platform::Twitter,
            assigned_user: None,
        };
        assert!(matches!(
            create_draft(&store, &table, &ed, blank, Utc::now()),
            Err(WorkflowError::Validation(_))
        ));
    }

    #[test]
    fn viewers_cannot_create_or_edit() {
        let (_dir, store) = store();
        let table = RolePermissionTable::standard();
        let viewer = member("vi", "org-1", Some(Role::Viewer));
        let new = NewContent {
            title: "x".into(),
            body: String::new(),
            platform: Platform::Twitter,
            assigned_user: None,
        };
        assert!(matches!(
            create_draft(&store, &table, &viewer, new, Utc::now()),
            Err(WorkflowError::Authorization(Permission::CreateCampaign))
        ));

        let item = draft(&store, &member("ed", "org-1", Some(Role::Editor)), "Post");
        let edit = ContentEdit { body: Some("changed".into()), ..Default::default() };
        assert!(matches!(
            update_draft(&store, &table, &viewer, &item.id, edit, Utc::now()),
            Err(WorkflowError::Authorization(Permission::EditContent))
        ));
    }

    #[test]
    fn stale_expected_version_is_a_conflict() {
        let (_dir, store) = store();
        let table = RolePermissionTable::standard();
        let ed = member("ed", "org-1", Some(Role::Editor));
        let item = draft(&store, &ed, "Post");

        let edit = ContentEdit {
            title: Some("New title".into()),
            expected_version: Some(1),
            ..Default::default()
        };
        let updated = update_draft(&store, &table, &ed, &item.id, edit, Utc::now()).unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.title, "New title");

        let stale = ContentEdit {
            body: Some("again".into()),
            expected_version: Some(1),
            ..Default::default()
        };
        assert!(matches!(
            update_draft(&store, &table, &ed, &item.id, stale, Utc::now()),
            Err(WorkflowError::Conflict(_))
        ));
    }

    #[test]
    fn submitted_items_leave_draft_and_reach_the_review_queue() {
        let (_dir, store) = store();
        let table = RolePermissionTable::standard();
        let ed = member("ed", "org-1", Some(Role::Editor));
        let item = draft(&store, &ed, "Post");

        let submitted = submit_for_review(&store, &table, &ed, &item.id, Utc::now()).unwrap();
        assert_eq!(submitted.status, ContentStatus::InReview);
        assert_eq!(submitted.submitted_by.as_deref(), Some("ed"));

        assert!(matches!(
            update_draft(&store, &table, &ed, &item.id, ContentEdit::default(), Utc::now()),
            Err(WorkflowError::InvalidTransition {
                from: ContentStatus::InReview,
                to: ContentStatus::Draft
            })
        ));
        assert!(matches!(
            list_review_queue(&store, &table, &ed),
            Err(WorkflowError::Authorization(_))
        ));

        let marketer = member("mo", "org-1", Some(Role::Marketer));
        let queue = list_review_queue(&store, &table, &marketer).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, item.id);
    }

    #[test]
    fn other_organizations_see_nothing() {
        let (_dir, store) = store();
        let ed = member("ed", "org-1", Some(Role::Editor));
        let outsider = member("ed", "org-2", Some(Role::Admin));
        let item = draft(&store, &ed, "Post");

        assert!(matches!(
            get_content(&store, &outsider, &item.id),
            Err(WorkflowError::NotFound(_))
        ));
        assert!(list_content(&store, &outsider, None).unwrap().is_empty());
        assert_eq!(list_content(&store, &ed, Some(ContentStatus::Draft)).unwrap().len(), 1);
    }

    #[test]
    fn deleting_removes_comments_too() {
        let (_dir, store) = store();
        let table = RolePermissionTable::standard();
        let ed = member("ed", "org-1", Some(Role::Editor));
        let item = draft(&store, &ed, "Post");
        add_comment(&store, &ed, &item.id, "first pass", Utc::now()).unwrap();
        assert_eq!(list_comments(&store, &ed, &item.id).unwrap().len(), 1);

        assert!(matches!(
            delete_content(&store, &table, &ed, &item.id),
            Err(WorkflowError::Authorization(Permission::DeleteContent))
        ));
        let admin = member("ad", "org-1", Some(Role::Admin));
        delete_content(&store, &table, &admin, &item.id).unwrap();
        assert!(matches!(get_content(&store, &ed, &item.id), Err(WorkflowError::NotFound(_))));
        let comments = comments_db_operations::read_comments_for_content(&store, &item.id).unwrap();
        assert!(comments.is_empty());
    }
}
