mod common;

use actix_web::{test, web, App};
use campaign_backend::helper::publisher::SimulatedPublisher;
use campaign_backend::helper::queue_processor::QueueProcessor;
use campaign_backend::helper::queue_helpers;
use campaign_backend::models::db_operations::{members_db_operations, queue_db_operations};
use campaign_backend::models::{Platform, QueueEntryStatus, Role, RolePermissionTable};
use campaign_backend::setup::db_setup;
use campaign_backend::{routes, AppState, DbPool};
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use common::*;

const OTHER_ORG: &str = "org-other";

fn members_pool(dir: &TempDir) -> DbPool {
    let manager = SqliteConnectionManager::file(dir.path().join("members.db"));
    let pool = r2d2::Pool::builder().max_size(2).build(manager).unwrap();
    let mut conn = pool.get().unwrap();
    db_setup::setup_members_db(&mut conn).unwrap();
    members_db_operations::add_member(&conn, "u1", ORG, "Una", Some(Role::Editor)).unwrap();
    members_db_operations::add_member(&conn, "a1", ORG, "Ana", Some(Role::Marketer)).unwrap();
    members_db_operations::add_member(&conn, "v1", ORG, "Vic", Some(Role::Viewer)).unwrap();
    members_db_operations::add_member(&conn, "b1", OTHER_ORG, "Bo", Some(Role::Marketer)).unwrap();
    pool
}

fn app_state(ctx: &TestStore) -> web::Data<AppState> {
    let processor = QueueProcessor::with_limits(
        ctx.store.clone(),
        Arc::new(SimulatedPublisher),
        std::time::Duration::from_secs(5),
        chrono::Duration::minutes(5),
    );
    web::Data::new(AppState {
        store: ctx.store.clone(),
        permissions: Arc::new(RolePermissionTable::standard()),
        processor: Arc::new(processor),
    })
}

macro_rules! app {
    ($ctx:expr, $dir:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(members_pool(&$dir)))
                .app_data(app_state(&$ctx))
                .configure(routes::config_api),
        )
        .await
    };
}

fn as_user(req: test::TestRequest, user_id: &str) -> test::TestRequest {
    as_member_of(req, user_id, ORG)
}

fn as_member_of(req: test::TestRequest, user_id: &str, organization_id: &str) -> test::TestRequest {
    req.insert_header(("X-User-Id", user_id))
        .insert_header(("X-Organization-Id", organization_id))
}

#[actix_web::test]
async fn health_needs_no_identity() {
    let ctx = open_store();
    let dir = tempfile::tempdir().unwrap();
    let app = app!(ctx, dir);

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn identity_is_checked_against_the_member_directory() {
    let ctx = open_store();
    let dir = tempfile::tempdir().unwrap();
    let app = app!(ctx, dir);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/me").to_request()).await;
    assert_eq!(resp.status().as_u16(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"success": false, "data": null, "error": "Missing identity headers."}));

    let req = as_user(test::TestRequest::get().uri("/api/me"), "stranger").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Not a member of this organization.");

    let req = as_user(test::TestRequest::get().uri("/api/me"), "v1").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["role"], "viewer");
    assert_eq!(body["data"]["permissions"], json!(["VIEW_ANALYTICS"]));
}

#[actix_web::test]
async fn content_moves_through_review_over_http() {
    let ctx = open_store();
    let dir = tempfile::tempdir().unwrap();
    let app = app!(ctx, dir);

    let req = as_user(test::TestRequest::post().uri("/api/content"), "u1")
        .set_json(json!({"title": "Summer Sale", "body": "20% off", "platform": "instagram"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created["success"], true);
    assert_eq!(created["data"]["status"], "DRAFT");
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/content/{}/submit", id);
    let req = as_user(test::TestRequest::post().uri(&uri), "u1").to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let req = as_user(test::TestRequest::post().uri(&format!("/api/content/{}/approve", id)), "u1")
        .set_json(json!({}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 403);

    let req = as_user(test::TestRequest::post().uri(&format!("/api/content/{}/reject", id)), "a1")
        .set_json(json!({"reason": "  "}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);

    let req = as_user(test::TestRequest::post().uri(&format!("/api/content/{}/approve", id)), "a1")
        .set_json(json!({"notes": "looks good"}))
        .to_request();
    let approved: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(approved["data"]["status"], "APPROVED");

    let req = as_user(test::TestRequest::post().uri(&format!("/api/content/{}/approve", id)), "a1")
        .set_json(json!({}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 409);

    let req =
        as_user(test::TestRequest::get().uri("/api/notifications/unread_count"), "u1").to_request();
    let unread: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(unread["data"]["unread"], 1);
}

#[actix_web::test]
async fn queue_processing_is_reserved_for_approvers() {
    let ctx = open_store();
    let dir = tempfile::tempdir().unwrap();
    let app = app!(ctx, dir);

    let req = as_user(test::TestRequest::post().uri("/api/queue/process"), "u1").to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 403);

    let req = as_user(test::TestRequest::post().uri("/api/queue/process"), "a1").to_request();
    let report: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report["success"], true);
    assert_eq!(report["data"]["completed"], json!([]));
}

#[actix_web::test]
async fn malformed_requests_get_the_json_envelope() {
    let ctx = open_store();
    let dir = tempfile::tempdir().unwrap();
    let app = app!(ctx, dir);
    let item = in_review(&ctx, &editor(), "Salt & Pepper");

    let uri = format!("/api/content/{}/reject", item.id);
    let req = as_user(test::TestRequest::post().uri(&uri), "a1")
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));

    let req = as_user(test::TestRequest::get().uri("/api/content/not-a-uuid"), "a1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);

    let req =
        as_user(test::TestRequest::get().uri("/api/content?status=ARCHIVED"), "a1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid query string"));

    let uri = format!("/api/content/{}", item.id);
    let req = as_user(test::TestRequest::get().uri(&uri), "a1").to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched["data"]["title"], "Salt & Pepper");
}

#[actix_web::test]
async fn processing_over_http_stays_inside_the_callers_organization() {
    let ctx = open_store();
    let dir = tempfile::tempdir().unwrap();
    let app = app!(ctx, dir);
    let now = chrono::Utc::now();
    let queued = queue_helpers::enqueue_adhoc(
        &ctx.store,
        &ctx.table,
        &approver(),
        Platform::Twitter,
        "Acme news",
        now,
        now,
    )
    .unwrap();

    let req = as_member_of(test::TestRequest::post().uri("/api/queue/process"), "b1", OTHER_ORG)
        .to_request();
    let report: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report["data"]["completed"], json!([]));
    let untouched = queue_db_operations::read_queue_entry(&ctx.store, &queued.id).unwrap().unwrap();
    assert_eq!(untouched.status, QueueEntryStatus::Pending);

    let req = as_user(test::TestRequest::post().uri("/api/queue/process"), "a1").to_request();
    let report: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report["data"]["completed"], json!([queued.id.to_string()]));
}
