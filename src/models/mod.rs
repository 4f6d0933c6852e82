use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub mod content_status;
pub mod db_operations;
pub mod permissions;

pub use content_status::{ContentStatus, Transition};
pub use permissions::{Permission, Role, RolePermissionTable};

/// Target network for a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Twitter,
    Linkedin,
    Facebook,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
            Platform::Facebook => "facebook",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "instagram" => Ok(Platform::Instagram),
            "twitter" => Ok(Platform::Twitter),
            "linkedin" => Ok(Platform::Linkedin),
            "facebook" => Ok(Platform::Facebook),
            other => Err(format!("Unknown platform '{}'", other)),
        }
    }
}

/// The authenticated caller, as resolved from the identity provider and the member directory.
#[derive(Debug, Clone, Serialize)]
pub struct Actor {
    pub user_id: String,
    pub display_name: String,
    pub organization_id: String,
    pub role: Option<Role>,
}

/// A row of the member directory.
#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub user_id: String,
    pub organization_id: String,
    pub display_name: String,
    pub role: Option<Role>,
    pub created_at: String,
}

impl From<Member> for Actor {
    fn from(member: Member) -> Self {
        Actor {
            user_id: member.user_id,
            display_name: member.display_name,
            organization_id: member.organization_id,
            role: member.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub organization_id: String,
    pub title: String,
    pub body: String,
    pub platform: Platform,
    pub status: ContentStatus,
    pub created_by: String,
    pub created_by_name: String,
    pub assigned_user: Option<String>,
    pub submitted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl ContentItem {
    /// Whoever asked for the review, falling back to the author.
    pub fn submitter(&self) -> &str {
        self.submitted_by.as_deref().unwrap_or(&self.created_by)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueEntryStatus {
    Pending,
    /// Claimed by a processor run; the publish call is in flight.
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub organization_id: String,
    pub content_id: Option<Uuid>,
    pub user_id: String,
    pub platform: Platform,
    /// Text to publish for ad hoc entries that have no linked content.
    pub text: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: QueueEntryStatus,
    pub created_at: DateTime<Utc>,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub external_id: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub version: u64,
}

impl QueueEntry {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at <= now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    ReviewRequest,
    Approved,
    Rejected,
    Published,
    PublishFailed,
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum Recipient {
    User(String),
    /// Everyone in the organization whose role grants APPROVE_CONTENT.
    Approvers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub organization_id: String,
    pub recipient: Recipient,
    pub kind: NotificationType,
    pub message: String,
    pub content_id: Option<Uuid>,
    pub post_title: Option<String>,
    pub reason: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentKind {
    Note,
    ApprovalNote,
    RejectionReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub content_id: Uuid,
    pub organization_id: String,
    pub author_id: String,
    pub author_name: String,
    pub kind: CommentKind,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}
