pub mod access_helpers;
pub mod approval_helpers;
pub mod content_helpers;
pub mod member_helpers;
pub mod notification_helpers;
pub mod publisher;
pub mod queue_helpers;
pub mod queue_processor;
pub mod sanitization_helpers;
