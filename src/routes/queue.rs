use actix_web::{web, Responder};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::WorkflowError;
use crate::helper::access_helpers::require_permission;
use crate::helper::queue_helpers;
use crate::middleware::AuthenticatedMember;
use crate::models::{Permission, Platform};
use crate::routes::{error_response, respond};
use crate::AppState;

#[derive(Deserialize)]
pub struct AdhocRequest {
    platform: Platform,
    text: String,
    scheduled_at: DateTime<Utc>,
}

pub fn config_queue(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/queue")
            .route("", web::get().to(list_pending))
            .route("/adhoc", web::post().to(enqueue_adhoc))
            .route("/process", web::post().to(process_now)),
    );
}

async fn list_pending(member: AuthenticatedMember, state: web::Data<AppState>) -> impl Responder {
    respond(queue_helpers::list_pending_for_org(&state.store, &member.0))
}

async fn enqueue_adhoc(
    member: AuthenticatedMember,
    state: web::Data<AppState>,
    payload: web::Json<AdhocRequest>,
) -> impl Responder {
    respond(queue_helpers::enqueue_adhoc(
        &state.store,
        &state.permissions,
        &member.0,
        payload.platform,
        &payload.text,
        payload.scheduled_at,
        Utc::now(),
    ))
}

/// Runs the processor for the caller's organization immediately instead of waiting for
/// the next tick.
async fn process_now(member: AuthenticatedMember, state: web::Data<AppState>) -> impl Responder {
    if let Err(e) = require_permission(&state.permissions, &member.0, Permission::ApproveContent) {
        return error_response(&e);
    }
    log::info!("Queue run requested by {}", member.0.user_id);
    let result: Result<_, WorkflowError> = state
        .processor
        .run_once_for_organization(Utc::now(), &member.0.organization_id)
        .await;
    respond(result)
}
