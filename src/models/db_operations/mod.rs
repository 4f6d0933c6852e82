pub mod comments_db_operations;
pub mod content_db_operations;
pub mod document_store;
pub mod members_db_operations;
pub mod notifications_db_operations;
pub mod queue_db_operations;

use document_store::DocumentTable;

/// Every collection the store creates on open.
pub const ALL_COLLECTIONS: [DocumentTable; 4] = [
    content_db_operations::CONTENT,
    queue_db_operations::QUEUE,
    notifications_db_operations::NOTIFICATIONS,
    comments_db_operations::COMMENTS,
];
