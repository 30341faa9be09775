use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use switchboard_core::types::UserRole;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID string — primary key.
    pub id: String,
    pub display_name: String,
    pub role: UserRole,
    /// RFC3339 creation timestamp.
    pub created_at: String,
    /// RFC3339 timestamp of the last profile/role edit.
    pub updated_at: String,
}

/// One "viewer may see target's schedule" authorization.
///
/// Revocation flips `is_active` rather than deleting the row, so the
/// grant can later be restored without losing its identity. The
/// `granted_by`/`granted_at` columns always describe the most recent
/// activation (restore overwrites them).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// UUID string — primary key.
    pub id: String,
    /// The user who gains visibility.
    pub viewer_id: String,
    /// The user whose schedule becomes visible.
    pub target_id: String,
    /// Admin who performed the (most recent) activation.
    pub granted_by: String,
    /// RFC3339 timestamp of the (most recent) activation.
    pub granted_at: String,
    pub is_active: bool,
}

/// Why a single entry of a batch grant was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantRejection {
    /// viewer == target; self-visibility is implicit and never stored.
    SelfGrant,
    /// The target user does not exist.
    UnknownTarget,
    /// The row could not be written.
    Database { message: String },
}

impl std::fmt::Display for GrantRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrantRejection::SelfGrant => write!(f, "viewer already sees their own schedule"),
            GrantRejection::UnknownTarget => write!(f, "target user does not exist"),
            GrantRejection::Database { message } => write!(f, "database error: {message}"),
        }
    }
}

/// Partitioned outcome of a batch grant.
///
/// A batch never fails as a whole because one entry collided or was
/// malformed — the admin UI shows exactly which targets were created,
/// restored, already covered, or rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrantSummary {
    /// Fresh grants inserted by this batch.
    pub created: Vec<PermissionGrant>,
    /// Previously revoked grants reactivated in place.
    pub restored: Vec<PermissionGrant>,
    /// Targets that already had an active grant (informational, not a failure).
    pub already_active: Vec<String>,
    /// Entries that could not be applied, with the reason per target.
    pub rejected: Vec<(String, GrantRejection)>,
}

impl GrantSummary {
    /// True when every entry was applied or already covered.
    pub fn is_fully_applied(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// The set of schedule owners a viewer is authorized to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Admin wildcard — every schedule, without enumerating users.
    Everyone,
    /// Exactly these owners (always includes the viewer themself).
    Only(HashSet<String>),
}

impl Visibility {
    pub fn includes(&self, owner_id: &str) -> bool {
        match self {
            Visibility::Everyone => true,
            Visibility::Only(set) => set.contains(owner_id),
        }
    }
}
