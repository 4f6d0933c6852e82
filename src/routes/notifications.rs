use actix_web::{web, Responder};
use serde::Serialize;
use uuid::Uuid;

use crate::helper::notification_helpers;
use crate::middleware::AuthenticatedMember;
use crate::routes::respond;
use crate::AppState;

#[derive(Serialize)]
struct UnreadCount {
    unread: usize,
}

pub fn config_notifications(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications")
            .route("", web::get().to(list_notifications))
            .route("/unread_count", web::get().to(unread_count))
            .route("/{id}/read", web::post().to(mark_read)),
    );
}

async fn list_notifications(
    member: AuthenticatedMember,
    state: web::Data<AppState>,
) -> impl Responder {
    respond(notification_helpers::list_notifications(
        &state.store,
        &state.permissions,
        &member.0,
    ))
}

async fn unread_count(member: AuthenticatedMember, state: web::Data<AppState>) -> impl Responder {
    respond(
        notification_helpers::unread_count(&state.store, &state.permissions, &member.0)
            .map(|unread| UnreadCount { unread }),
    )
}

async fn mark_read(
    member: AuthenticatedMember,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    respond(notification_helpers::mark_notification_read(
        &state.store,
        &state.permissions,
        &member.0,
        &id,
    ))
}
