#![allow(dead_code)]

use campaign_backend::helper::content_helpers::{self, NewContent};
use campaign_backend::models::db_operations::document_store::DocumentStore;
use campaign_backend::models::{Actor, ContentItem, Platform, Role, RolePermissionTable};
use chrono::Utc;
use tempfile::TempDir;

pub const ORG: &str = "org-acme";

pub struct TestStore {
    pub store: DocumentStore,
    pub table: RolePermissionTable,
    _dir: TempDir,
}

pub fn open_store() -> TestStore {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::open(&dir.path().join("documents.redb")).unwrap();
    TestStore { store, table: RolePermissionTable::standard(), _dir: dir }
}

pub fn actor(user_id: &str, name: &str, role: Role) -> Actor {
    Actor {
        user_id: user_id.to_string(),
        display_name: name.to_string(),
        organization_id: ORG.to_string(),
        role: Some(role),
    }
}

pub fn editor() -> Actor {
    actor("u1", "Una", Role::Editor)
}

pub fn approver() -> Actor {
    actor("a1", "Ana", Role::Marketer)
}

pub fn draft(ctx: &TestStore, author: &Actor, title: &str) -> ContentItem {
    let new = NewContent {
        title: title.to_string(),
        body: format!("{} body", title),
        platform: Platform::Instagram,
        assigned_user: None,
    };
    content_helpers::create_draft(&ctx.store, &ctx.table, author, new, Utc::now()).unwrap()
}

pub fn in_review(ctx: &TestStore, author: &Actor, title: &str) -> ContentItem {
    let item = draft(ctx, author, title);
    content_helpers::submit_for_review(&ctx.store, &ctx.table, author, &item.id, Utc::now())
        .unwrap()
}
