use actix_web::http::StatusCode;
use actix_web::{dev, web, FromRequest, HttpRequest};
use serde::Serialize;
use std::future::{ready, Ready};

use crate::helper::member_helpers;
use crate::models::Actor;
use crate::routes::envelope_error;
use crate::DbPool;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const ORGANIZATION_ID_HEADER: &str = "X-Organization-Id";

/// The caller, resolved from identity headers against the member directory.
/// Missing headers are a 401; a user who is not a member of the organization is a 403.
#[derive(Serialize)]
pub struct AuthenticatedMember(pub Actor);

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedMember, actix_web::Error> {
    let user_id = header_value(req, USER_ID_HEADER);
    let organization_id = header_value(req, ORGANIZATION_ID_HEADER);
    let (user_id, organization_id) = match (user_id, organization_id) {
        (Some(user), Some(org)) => (user, org),
        _ => return Err(envelope_error(StatusCode::UNAUTHORIZED, "Missing identity headers.")),
    };

    let pool = req.app_data::<web::Data<DbPool>>().ok_or_else(|| {
        log::error!("Member directory pool is not registered with the application.");
        envelope_error(StatusCode::INTERNAL_SERVER_ERROR, "Member directory unavailable.")
    })?;

    match member_helpers::resolve_actor(pool, user_id, organization_id) {
        Ok(Some(actor)) => Ok(AuthenticatedMember(actor)),
        Ok(None) => {
            log::warn!("User '{}' is not a member of organization '{}'", user_id, organization_id);
            Err(envelope_error(StatusCode::FORBIDDEN, "Not a member of this organization."))
        }
        Err(e) => {
            log::error!("Member lookup failed for '{}': {}", user_id, e);
            Err(envelope_error(StatusCode::INTERNAL_SERVER_ERROR, "Member directory unavailable."))
        }
    }
}

impl FromRequest for AuthenticatedMember {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
