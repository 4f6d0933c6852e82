//! The seam to the social networks. The queue processor only sees [`Publisher`].

use futures_util::future::BoxFuture;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Platform;

#[derive(Debug, Clone, Serialize)]
pub struct PublishRequest {
    pub queue_entry_id: Uuid,
    pub content_id: Option<Uuid>,
    pub organization_id: String,
    pub user_id: String,
    pub platform: Platform,
    pub title: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    /// Post id on the target network.
    pub external_id: String,
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("publish rejected: {0}")]
    Rejected(String),
    #[error("publish timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

pub trait Publisher: Send + Sync {
    fn publish(
        &self,
        request: PublishRequest,
    ) -> BoxFuture<'_, Result<PublishReceipt, PublishError>>;
}

/// Stand-in network that accepts every post and logs it.
#[derive(Debug, Default, Clone)]
pub struct SimulatedPublisher;

impl Publisher for SimulatedPublisher {
    fn publish(
        &self,
        request: PublishRequest,
    ) -> BoxFuture<'_, Result<PublishReceipt, PublishError>> {
        Box::pin(async move {
            if request.text.trim().is_empty() {
                return Err(PublishError::Rejected("empty post".to_string()));
            }
            let external_id = format!("{}-{}", request.platform, Uuid::new_v4().simple());
            log::info!(
                "Simulated publish of entry {} to {} as {}",
                request.queue_entry_id,
                request.platform,
                external_id
            );
            Ok(PublishReceipt { external_id })
        })
    }
}
