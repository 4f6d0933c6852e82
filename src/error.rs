use crate::models::db_operations::document_store::StoreError;
use crate::models::db_operations::members_db_operations::MembershipError;
use crate::models::{ContentStatus, Permission};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Permission denied: {0:?} is required")]
    Authorization(Permission),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Illegal status transition from {from} to {to}")]
    InvalidTransition { from: ContentStatus, to: ContentStatus },
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Another writer changed the item first, or already claimed it.
    #[error("Concurrent modification: {0}")]
    Conflict(String),
    #[error("Document store error: {0}")]
    ExternalService(#[from] StoreError),
    #[error("Member directory error: {0}")]
    Membership(#[from] MembershipError),
}

impl WorkflowError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        WorkflowError::NotFound(format!("{} {}", what, id))
    }
}
