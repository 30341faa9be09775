use std::collections::HashSet;
use std::sync::Mutex;

use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use crate::db::{get_user, row_to_grant};
use crate::error::{Result, UserError};
use crate::types::{GrantRejection, GrantSummary, PermissionGrant, Visibility};

const GRANT_SELECT_SQL: &str = "SELECT id, viewer_id, target_id, granted_by, granted_at, is_active
     FROM schedule_grants";

/// Authoritative store of "viewer may see target's schedule" grants.
///
/// Wraps a single SQLite connection in a `Mutex`; the read path
/// (`active_targets_for`) is safe to call concurrently from any number
/// of viewer-session engines, while mutations come from admin actions.
/// No retries happen here — retry policy belongs to the caller.
pub struct PermissionRegistry {
    db: Mutex<Connection>,
}

impl PermissionRegistry {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Grant `viewer_id` visibility of each target's schedule.
    ///
    /// Per-entry outcomes are partitioned rather than failing the batch:
    /// a self-grant or unknown target rejects that entry only. An
    /// inactive grant for the pair is reactivated in place (overwriting
    /// `granted_by`/`granted_at`) instead of inserting a second row.
    ///
    /// `granted_by` must be an existing admin — that check fails the
    /// whole batch, since no entry can be valid without a valid actor.
    pub fn grant(
        &self,
        viewer_id: &str,
        target_ids: &[String],
        granted_by: &str,
    ) -> Result<GrantSummary> {
        let conn = self.db.lock().unwrap();
        require_admin(&conn, granted_by)?;
        if get_user(&conn, viewer_id)?.is_none() {
            return Err(UserError::NotFound(viewer_id.to_string()));
        }

        let mut summary = GrantSummary::default();
        let now = chrono::Utc::now().to_rfc3339();

        for target_id in target_ids {
            if target_id == viewer_id {
                summary
                    .rejected
                    .push((target_id.clone(), GrantRejection::SelfGrant));
                continue;
            }
            if get_user(&conn, target_id)?.is_none() {
                summary
                    .rejected
                    .push((target_id.clone(), GrantRejection::UnknownTarget));
                continue;
            }

            match existing_grant(&conn, viewer_id, target_id)? {
                Some(grant) if grant.is_active => {
                    debug!(viewer_id, target_id, "grant already active");
                    summary.already_active.push(target_id.clone());
                }
                Some(grant) => {
                    // Revoked pair: reactivate the row, keeping its id.
                    match conn.execute(
                        "UPDATE schedule_grants
                         SET is_active = 1, granted_by = ?2, granted_at = ?3
                         WHERE id = ?1",
                        params![grant.id, granted_by, now],
                    ) {
                        Ok(_) => {
                            info!(grant_id = %grant.id, viewer_id, target_id, "grant restored");
                            summary.restored.push(PermissionGrant {
                                granted_by: granted_by.to_string(),
                                granted_at: now.clone(),
                                is_active: true,
                                ..grant
                            });
                        }
                        Err(e) => summary.rejected.push((
                            target_id.clone(),
                            GrantRejection::Database {
                                message: e.to_string(),
                            },
                        )),
                    }
                }
                None => {
                    let id = uuid::Uuid::new_v4().to_string();
                    match conn.execute(
                        "INSERT INTO schedule_grants
                         (id, viewer_id, target_id, granted_by, granted_at, is_active)
                         VALUES (?1, ?2, ?3, ?4, ?5, 1)",
                        params![id, viewer_id, target_id, granted_by, now],
                    ) {
                        Ok(_) => {
                            info!(grant_id = %id, viewer_id, target_id, "grant created");
                            summary.created.push(PermissionGrant {
                                id,
                                viewer_id: viewer_id.to_string(),
                                target_id: target_id.clone(),
                                granted_by: granted_by.to_string(),
                                granted_at: now.clone(),
                                is_active: true,
                            });
                        }
                        Err(e) => summary.rejected.push((
                            target_id.clone(),
                            GrantRejection::Database {
                                message: e.to_string(),
                            },
                        )),
                    }
                }
            }
        }

        if !summary.rejected.is_empty() {
            warn!(
                viewer_id,
                rejected = summary.rejected.len(),
                "batch grant applied partially"
            );
        }
        Ok(summary)
    }

    /// Deactivate a grant. Idempotent: revoking an already-inactive
    /// grant is a no-op success, because admin UIs double-submit.
    pub fn revoke(&self, grant_id: &str) -> Result<()> {
        let conn = self.db.lock().unwrap();
        let rows = conn.execute(
            "UPDATE schedule_grants SET is_active = 0 WHERE id = ?1",
            params![grant_id],
        )?;
        if rows == 0 {
            return Err(UserError::GrantNotFound {
                id: grant_id.to_string(),
            });
        }
        info!(grant_id, "grant revoked");
        Ok(())
    }

    /// Reactivate a revoked grant in place, overwriting the grantor and
    /// timestamp. Restoring an already-active grant is a no-op success.
    pub fn restore(&self, grant_id: &str, restored_by: &str) -> Result<PermissionGrant> {
        let conn = self.db.lock().unwrap();
        require_admin(&conn, restored_by)?;

        let now = chrono::Utc::now().to_rfc3339();
        let rows = conn.execute(
            "UPDATE schedule_grants
             SET is_active = 1, granted_by = ?2, granted_at = ?3
             WHERE id = ?1",
            params![grant_id, restored_by, now],
        )?;
        if rows == 0 {
            return Err(UserError::GrantNotFound {
                id: grant_id.to_string(),
            });
        }
        info!(grant_id, restored_by, "grant restored");

        let grant = conn.query_row(
            &format!("{GRANT_SELECT_SQL} WHERE id = ?1"),
            params![grant_id],
            row_to_grant,
        )?;
        Ok(grant)
    }

    /// True when `user_id` exists and holds the admin role.
    pub fn is_admin(&self, user_id: &str) -> Result<bool> {
        let conn = self.db.lock().unwrap();
        let user =
            get_user(&conn, user_id)?.ok_or_else(|| UserError::NotFound(user_id.to_string()))?;
        Ok(user.role.is_admin())
    }

    /// Resolve which schedule owners `viewer_id` may currently see.
    ///
    /// Admins get the wildcard rather than an enumerated set — "admin
    /// sees everyone" must not cost O(users) grant rows. Everyone else
    /// gets their active targets plus themself; self-visibility is
    /// implicit, never stored.
    pub fn active_targets_for(&self, viewer_id: &str) -> Result<Visibility> {
        let conn = self.db.lock().unwrap();
        let viewer =
            get_user(&conn, viewer_id)?.ok_or_else(|| UserError::NotFound(viewer_id.to_string()))?;
        if viewer.role.is_admin() {
            return Ok(Visibility::Everyone);
        }

        let mut stmt = conn.prepare_cached(
            "SELECT target_id FROM schedule_grants
             WHERE viewer_id = ?1 AND is_active = 1",
        )?;
        let mut targets: HashSet<String> = stmt
            .query_map(params![viewer_id], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .collect();
        targets.insert(viewer_id.to_string());
        Ok(Visibility::Only(targets))
    }

    /// Fetch a single grant by id.
    pub fn get_grant(&self, grant_id: &str) -> Result<Option<PermissionGrant>> {
        let conn = self.db.lock().unwrap();
        match conn.query_row(
            &format!("{GRANT_SELECT_SQL} WHERE id = ?1"),
            params![grant_id],
            row_to_grant,
        ) {
            Ok(g) => Ok(Some(g)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(UserError::Database(e)),
        }
    }

    /// All grants where `viewer_id` is the viewer, active and revoked
    /// alike — the admin UI needs revoked rows to offer "restore".
    pub fn grants_for_viewer(&self, viewer_id: &str) -> Result<Vec<PermissionGrant>> {
        let conn = self.db.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{GRANT_SELECT_SQL} WHERE viewer_id = ?1 ORDER BY granted_at"
        ))?;
        let grants = stmt
            .query_map(params![viewer_id], row_to_grant)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(grants)
    }
}

/// Look up the grant row for a (viewer, target) pair, active or not.
fn existing_grant(
    conn: &Connection,
    viewer_id: &str,
    target_id: &str,
) -> Result<Option<PermissionGrant>> {
    match conn.query_row(
        &format!("{GRANT_SELECT_SQL} WHERE viewer_id = ?1 AND target_id = ?2"),
        params![viewer_id, target_id],
        row_to_grant,
    ) {
        Ok(g) => Ok(Some(g)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(UserError::Database(e)),
    }
}

/// Error unless `user_id` exists and holds the admin role.
fn require_admin(conn: &Connection, user_id: &str) -> Result<()> {
    let user = get_user(conn, user_id)?.ok_or_else(|| UserError::NotFound(user_id.to_string()))?;
    if !user.role.is_admin() {
        return Err(UserError::PermissionDenied(
            "only admins can manage schedule grants".to_string(),
        ));
    }
    Ok(())
}
