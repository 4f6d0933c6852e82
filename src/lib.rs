use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::helper::queue_processor::QueueProcessor;
use crate::models::db_operations::document_store::DocumentStore;
use crate::models::RolePermissionTable;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Shared by every worker of the web server.
pub struct AppState {
    pub store: DocumentStore,
    pub permissions: Arc<RolePermissionTable>,
    pub processor: Arc<QueueProcessor>,
}

pub mod config;
pub mod error;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;
