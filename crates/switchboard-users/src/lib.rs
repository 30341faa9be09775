//! `switchboard-users` — user records and the schedule permission registry.
//!
//! The registry answers one question for the rest of the system: which
//! schedules may this viewer see? Admins get a wildcard; everyone else
//! gets their own schedule plus explicitly granted targets. Grants are
//! revoked in place (never deleted) so an admin can restore them with
//! their history intact.

pub mod db;
pub mod error;
pub mod registry;
pub mod types;

pub use error::{Result, UserError};
pub use registry::PermissionRegistry;
pub use types::{GrantRejection, GrantSummary, PermissionGrant, User, Visibility};
