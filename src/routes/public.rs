use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;

use crate::middleware::AuthenticatedMember;
use crate::models::permissions::role_label;
use crate::models::{Actor, Permission};
use crate::routes::ok;
use crate::AppState;

#[derive(Serialize)]
struct MeResponse {
    #[serde(flatten)]
    actor: Actor,
    role_label: &'static str,
    permissions: Vec<Permission>,
}

pub fn config_public(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/me", web::get().to(me));
}

async fn health() -> impl Responder {
    HttpResponse::Ok().body("active")
}

async fn me(member: AuthenticatedMember, state: web::Data<AppState>) -> impl Responder {
    let actor = member.0;
    let permissions = state.permissions.permissions_for(actor.role);
    ok(MeResponse { role_label: role_label(actor.role), permissions, actor })
}
