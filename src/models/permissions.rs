//! Role → permission mapping.
//!
//! The table is built once and shared read-only; there is no way to grant a
//! permission at runtime.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Marketer,
    Editor,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Marketer, Role::Editor, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Marketer => "marketer",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "marketer" => Ok(Role::Marketer),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    CreateCampaign,
    EditContent,
    DeleteContent,
    SubmitForReview,
    ApproveContent,
    RejectContent,
    ManageTeam,
    ManageBilling,
    ViewAnalytics,
}

impl Permission {
    pub const ALL: [Permission; 9] = [
        Permission::CreateCampaign,
        Permission::EditContent,
        Permission::DeleteContent,
        Permission::SubmitForReview,
        Permission::ApproveContent,
        Permission::RejectContent,
        Permission::ManageTeam,
        Permission::ManageBilling,
        Permission::ViewAnalytics,
    ];
}

#[derive(Debug, Clone)]
pub struct RolePermissionTable {
    grants: HashMap<Role, BTreeSet<Permission>>,
}

impl RolePermissionTable {
    pub fn standard() -> Self {
        use Permission::*;

        let viewer: BTreeSet<Permission> = [ViewAnalytics].into_iter().collect();

        let mut editor = viewer.clone();
        editor.extend([EditContent, SubmitForReview]);

        let mut marketer = editor.clone();
        marketer.extend([CreateCampaign, DeleteContent, ApproveContent, RejectContent]);

        let admin: BTreeSet<Permission> = Permission::ALL.into_iter().collect();

        let grants = HashMap::from([
            (Role::Admin, admin),
            (Role::Marketer, marketer),
            (Role::Editor, editor),
            (Role::Viewer, viewer),
        ]);
        RolePermissionTable { grants }
    }

    /// An unset role holds no permissions.
    pub fn has_permission(&self, role: Option<Role>, permission: Permission) -> bool {
        role.and_then(|r| self.grants.get(&r))
            .map_or(false, |set| set.contains(&permission))
    }

    pub fn permissions_for(&self, role: Option<Role>) -> Vec<Permission> {
        role.and_then(|r| self.grants.get(&r))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

static STANDARD_TABLE: LazyLock<RolePermissionTable> = LazyLock::new(RolePermissionTable::standard);

/// String-keyed lookup against the standard table. Unknown or missing roles hold nothing.
pub fn has_permission(role: Option<&str>, permission: Permission) -> bool {
    let role = role.and_then(|r| r.parse::<Role>().ok());
    STANDARD_TABLE.has_permission(role, permission)
}

pub fn role_label(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Admin) => "Admin",
        Some(Role::Marketer) => "Marketer",
        Some(Role::Editor) => "Editor",
        Some(Role::Viewer) => "Viewer",
        None => "No role",
    }
}

pub fn role_badge_color(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Admin) => "red",
        Some(Role::Marketer) => "purple",
        Some(Role::Editor) => "blue",
        Some(Role::Viewer) | None => "gray",
    }
}
