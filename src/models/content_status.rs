use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::Permission;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentStatus {
    Draft,
    InReview,
    Approved,
    Rejected,
    Scheduled,
    Published,
    Failed,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "DRAFT",
            ContentStatus::InReview => "IN_REVIEW",
            ContentStatus::Approved => "APPROVED",
            ContentStatus::Rejected => "REJECTED",
            ContentStatus::Scheduled => "SCHEDULED",
            ContentStatus::Published => "PUBLISHED",
            ContentStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Ok(ContentStatus::Draft),
            "IN_REVIEW" => Ok(ContentStatus::InReview),
            "APPROVED" => Ok(ContentStatus::Approved),
            "REJECTED" => Ok(ContentStatus::Rejected),
            "SCHEDULED" => Ok(ContentStatus::Scheduled),
            "PUBLISHED" => Ok(ContentStatus::Published),
            "FAILED" => Ok(ContentStatus::Failed),
            other => Err(format!("Unknown content status '{}'", other)),
        }
    }
}

/// Every legal status change of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Body/title edit; status stays DRAFT.
    Edit,
    Submit,
    Approve,
    Reject,
    /// Enqueue for publishing. FAILED items may be enqueued again.
    Schedule,
    Publish,
    Fail,
}

impl Transition {
    pub fn target(&self) -> ContentStatus {
        match self {
            Transition::Edit => ContentStatus::Draft,
            Transition::Submit => ContentStatus::InReview,
            Transition::Approve => ContentStatus::Approved,
            Transition::Reject => ContentStatus::Rejected,
            Transition::Schedule => ContentStatus::Scheduled,
            Transition::Publish => ContentStatus::Published,
            Transition::Fail => ContentStatus::Failed,
        }
    }

    pub fn allowed_from(&self, status: ContentStatus) -> bool {
        use ContentStatus::*;
        match self {
            Transition::Edit => status == Draft,
            Transition::Submit => status == Draft,
            Transition::Approve | Transition::Reject => status == InReview,
            Transition::Schedule => matches!(status, Approved | Failed),
            Transition::Publish | Transition::Fail => status == Scheduled,
        }
    }

    /// Permission the acting user must hold. Queue processor transitions run
    /// without a user and need none.
    pub fn required_permission(&self) -> Option<Permission> {
        match self {
            Transition::Edit => Some(Permission::EditContent),
            Transition::Submit => Some(Permission::SubmitForReview),
            Transition::Approve => Some(Permission::ApproveContent),
            Transition::Reject => Some(Permission::RejectContent),
            Transition::Schedule => Some(Permission::EditContent),
            Transition::Publish | Transition::Fail => None,
        }
    }

    /// Maps a requested `from → to` pair onto the transition table.
    pub fn between(from: ContentStatus, to: ContentStatus) -> Option<Transition> {
        [
            Transition::Edit,
            Transition::Submit,
            Transition::Approve,
            Transition::Reject,
            Transition::Schedule,
            Transition::Publish,
            Transition::Fail,
        ]
        .into_iter()
        .find(|t| t.target() == to && t.allowed_from(from))
    }
}
