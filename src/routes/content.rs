use actix_web::{web, Responder};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::helper::content_helpers::{self, ContentEdit, NewContent};
use crate::helper::{approval_helpers, queue_helpers};
use crate::middleware::AuthenticatedMember;
use crate::models::ContentStatus;
use crate::routes::respond;
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    status: Option<ContentStatus>,
}

#[derive(Deserialize)]
pub struct ApproveRequest {
    notes: Option<String>,
}

#[derive(Deserialize)]
pub struct RejectRequest {
    reason: String,
}

#[derive(Deserialize)]
pub struct ScheduleRequest {
    scheduled_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct CommentRequest {
    text: String,
}

pub fn config_content(cfg: &mut web::ServiceConfig) {
    cfg.route("/review", web::get().to(review_queue))
        .service(
            web::scope("/content")
                .route("", web::get().to(list_content))
                .route("", web::post().to(create_content))
                .route("/{id}", web::get().to(get_content))
                .route("/{id}/update", web::post().to(update_content))
                .route("/{id}/delete", web::post().to(delete_content))
                .route("/{id}/submit", web::post().to(submit_content))
                .route("/{id}/approve", web::post().to(approve_content))
                .route("/{id}/reject", web::post().to(reject_content))
                .route("/{id}/schedule", web::post().to(schedule_content))
                .route("/{id}/comments", web::get().to(list_comments))
                .route("/{id}/comments", web::post().to(add_comment)),
        );
}

async fn list_content(
    member: AuthenticatedMember,
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> impl Responder {
    respond(content_helpers::list_content(&state.store, &member.0, query.status))
}

async fn create_content(
    member: AuthenticatedMember,
    state: web::Data<AppState>,
    payload: web::Json<NewContent>,
) -> impl Responder {
    respond(content_helpers::create_draft(
        &state.store,
        &state.permissions,
        &member.0,
        payload.into_inner(),
        Utc::now(),
    ))
}

async fn get_content(
    member: AuthenticatedMember,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    respond(content_helpers::get_content(&state.store, &member.0, &id))
}

async fn update_content(
    member: AuthenticatedMember,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    payload: web::Json<ContentEdit>,
) -> impl Responder {
    respond(content_helpers::update_draft(
        &state.store,
        &state.permissions,
        &member.0,
        &id,
        payload.into_inner(),
        Utc::now(),
    ))
}

async fn delete_content(
    member: AuthenticatedMember,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    respond(content_helpers::delete_content(
        &state.store,
        &state.permissions,
        &member.0,
        &id,
    ))
}

async fn submit_content(
    member: AuthenticatedMember,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    respond(content_helpers::submit_for_review(
        &state.store,
        &state.permissions,
        &member.0,
        &id,
        Utc::now(),
    ))
}

async fn approve_content(
    member: AuthenticatedMember,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    payload: Option<web::Json<ApproveRequest>>,
) -> impl Responder {
    let notes = payload.and_then(|p| p.into_inner().notes);
    respond(approval_helpers::approve(
        &state.store,
        &state.permissions,
        &id,
        &member.0,
        notes.as_deref(),
        Utc::now(),
    ))
}

async fn reject_content(
    member: AuthenticatedMember,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    payload: web::Json<RejectRequest>,
) -> impl Responder {
    respond(approval_helpers::reject(
        &state.store,
        &state.permissions,
        &id,
        &member.0,
        &payload.reason,
        Utc::now(),
    ))
}

async fn schedule_content(
    member: AuthenticatedMember,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    payload: web::Json<ScheduleRequest>,
) -> impl Responder {
    respond(queue_helpers::enqueue(
        &state.store,
        &state.permissions,
        &member.0,
        &id,
        payload.scheduled_at,
        Utc::now(),
    ))
}

async fn list_comments(
    member: AuthenticatedMember,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    respond(content_helpers::list_comments(&state.store, &member.0, &id))
}

async fn add_comment(
    member: AuthenticatedMember,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    payload: web::Json<CommentRequest>,
) -> impl Responder {
    respond(content_helpers::add_comment(&state.store, &member.0, &id, &payload.text, Utc::now()))
}

async fn review_queue(member: AuthenticatedMember, state: web::Data<AppState>) -> impl Responder {
    respond(content_helpers::list_review_queue(&state.store, &state.permissions, &member.0))
}
