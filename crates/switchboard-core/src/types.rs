use serde::{Deserialize, Serialize};
use std::fmt;

/// User role hierarchy: admin > standard > caller.
///
/// Admins implicitly see every schedule; standard users and callers see
/// only their own plus whatever the grant registry allows. Stored as
/// lowercase TEXT in SQLite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Standard,
    Caller,
}

impl UserRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn is_caller(&self) -> bool {
        matches!(self, UserRole::Caller)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Standard => write!(f, "standard"),
            UserRole::Caller => write!(f, "caller"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "standard" => Ok(UserRole::Standard),
            "caller" => Ok(UserRole::Caller),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}
