use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::error::WorkflowError;

pub mod content;
pub mod notifications;
pub mod public;
pub mod queue;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse { success: true, data: Some(data), error: None })
}

/// `{"success": false, "error": ...}` with the given status.
pub fn error_envelope(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(message.into()),
    })
}

/// Wraps an envelope as an `actix_web::Error`, for extractors that must fail.
pub fn envelope_error(status: StatusCode, message: impl Into<String>) -> actix_web::Error {
    let message = message.into();
    let response = error_envelope(status, message.clone());
    InternalError::from_response(message, response).into()
}

/// Maps a workflow failure onto a status code. Store failures are logged and hidden from
/// the caller.
pub fn error_response(err: &WorkflowError) -> HttpResponse {
    let status = match err {
        WorkflowError::Authorization(_) => StatusCode::FORBIDDEN,
        WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
        WorkflowError::InvalidTransition { .. } | WorkflowError::Conflict(_) => {
            StatusCode::CONFLICT
        }
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::ExternalService(_) | WorkflowError::Membership(_) => {
            log::error!("Request failed: {}", err);
            return error_envelope(StatusCode::INTERNAL_SERVER_ERROR, "Internal storage error.");
        }
    };
    error_envelope(status, err.to_string())
}

pub fn respond<T: Serialize>(result: Result<T, WorkflowError>) -> HttpResponse {
    match result {
        Ok(data) => ok(data),
        Err(e) => error_response(&e),
    }
}

// Malformed bodies, query strings and path ids get the same envelope as workflow errors.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        envelope_error(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", err))
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        envelope_error(StatusCode::BAD_REQUEST, format!("Invalid query string: {}", err))
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        envelope_error(StatusCode::BAD_REQUEST, format!("Invalid path: {}", err))
    })
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .configure(public::config_public)
            .configure(content::config_content)
            .configure(queue::config_queue)
            .configure(notifications::config_notifications),
    );
}
