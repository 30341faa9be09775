use rusqlite::{params, Connection};
use switchboard_core::types::UserRole;

use crate::error::{Result, UserError};
use crate::types::{PermissionGrant, User};

/// Initialise all tables for the users subsystem. Safe to call on every
/// startup — CREATE IF NOT EXISTS means it's idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id           TEXT NOT NULL PRIMARY KEY,
            display_name TEXT NOT NULL,
            role         TEXT NOT NULL DEFAULT 'standard',
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        ) STRICT;

        -- UNIQUE(viewer_id, target_id) enforces the invariant directly:
        -- one row per pair means at most one active grant per pair.
        CREATE TABLE IF NOT EXISTS schedule_grants (
            id         TEXT    NOT NULL PRIMARY KEY,
            viewer_id  TEXT    NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            target_id  TEXT    NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            granted_by TEXT    NOT NULL,
            granted_at TEXT    NOT NULL,
            is_active  INTEGER NOT NULL DEFAULT 1,
            UNIQUE(viewer_id, target_id)
        ) STRICT;

        -- Hot path: active_targets_for(viewer_id) on every engine tick.
        CREATE INDEX IF NOT EXISTS idx_grants_viewer_active
            ON schedule_grants (viewer_id, is_active);
        ",
    )?;
    Ok(())
}

/// Map a SELECT row (id, display_name, role, created_at, updated_at) to a User.
/// Centralised here so every query in this crate stays consistent.
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    use std::str::FromStr;
    let role = UserRole::from_str(&row.get::<_, String>(2)?).unwrap_or_default();
    Ok(User {
        id: row.get(0)?,
        display_name: row.get(1)?,
        role,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Map a SELECT row (id, viewer_id, target_id, granted_by, granted_at,
/// is_active) to a PermissionGrant.
pub(crate) fn row_to_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<PermissionGrant> {
    Ok(PermissionGrant {
        id: row.get(0)?,
        viewer_id: row.get(1)?,
        target_id: row.get(2)?,
        granted_by: row.get(3)?,
        granted_at: row.get(4)?,
        is_active: row.get::<_, i64>(5)? != 0,
    })
}

/// Insert a new user and return the full record.
pub fn create_user(conn: &Connection, display_name: &str, role: UserRole) -> Result<User> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO users (id, display_name, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![id, display_name, role.to_string(), now],
    )?;
    Ok(User {
        id,
        display_name: display_name.to_string(),
        role,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Fetch a user by primary key, returning `None` if absent.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    match conn.query_row(
        "SELECT id, display_name, role, created_at, updated_at
         FROM users WHERE id = ?1",
        params![user_id],
        row_to_user,
    ) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(UserError::Database(e)),
    }
}

/// List every user with the given role.
pub fn list_users_by_role(conn: &Connection, role: UserRole) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT id, display_name, role, created_at, updated_at
         FROM users WHERE role = ?1 ORDER BY created_at",
    )?;
    let users = stmt
        .query_map(params![role.to_string()], row_to_user)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(users)
}

/// Change a user's role, bumping `updated_at`.
pub fn set_user_role(conn: &Connection, user_id: &str, role: UserRole) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let rows = conn.execute(
        "UPDATE users SET role = ?2, updated_at = ?3 WHERE id = ?1",
        params![user_id, role.to_string(), now],
    )?;
    if rows == 0 {
        return Err(UserError::NotFound(user_id.to_string()));
    }
    Ok(())
}

/// Delete a user. Their grants (as viewer and as target) cascade away.
pub fn delete_user(conn: &Connection, user_id: &str) -> Result<()> {
    let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
    if rows == 0 {
        return Err(UserError::NotFound(user_id.to_string()));
    }
    Ok(())
}
