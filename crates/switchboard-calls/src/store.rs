use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use crate::db::row_to_call;
use crate::error::{CallError, Result};
use crate::types::{Call, CallStatus};

const CALL_SELECT_SQL: &str = "SELECT id, owner_id, contact, subject, scheduled_at, duration_mins,
            status, priority, notes, created_at, updated_at
     FROM calls";

/// Optional fields carried by a status update.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    /// Outcome notes (completion summary, failure reason).
    pub notes: Option<String>,
    /// New start time — only meaningful for the reschedule transition.
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Read/write boundary to the call data.
///
/// The engine and visibility layer consume this trait rather than the
/// SQLite type so the data layer can live elsewhere (remote API, test
/// double) without touching the notification logic. Reads carry no
/// consistency guarantee across calls beyond eventually reflecting
/// writes.
pub trait CallStore: Send + Sync {
    /// Fetch calls ascending by `scheduled_at` (soonest first — the
    /// engine's trigger scan depends on this ordering).
    ///
    /// `owners` of `None` means all owners (the admin wildcard); an
    /// empty `statuses` slice means any status.
    fn fetch_calls(&self, owners: Option<&[String]>, statuses: &[CallStatus]) -> Result<Vec<Call>>;

    /// Fetch one call by id, `None` if absent.
    fn get(&self, call_id: &str) -> Result<Option<Call>>;

    /// Persist a new call record.
    fn create(&self, call: &Call) -> Result<()>;

    /// Persist a status change plus any accompanying fields.
    fn update_status(&self, call_id: &str, status: CallStatus, update: &StatusUpdate)
        -> Result<()>;
}

/// SQLite-backed store. Wraps a single connection in a `Mutex`; one
/// instance per process is plenty for the read cadence involved.
pub struct SqliteCallStore {
    db: Mutex<Connection>,
}

impl SqliteCallStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }
}

impl CallStore for SqliteCallStore {
    fn fetch_calls(&self, owners: Option<&[String]>, statuses: &[CallStatus]) -> Result<Vec<Call>> {
        let db = self.db.lock().unwrap();

        // Build the WHERE clause from the optional filters. Placeholder
        // lists are generated because SQLite has no array binding.
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(owner_ids) = owners {
            if owner_ids.is_empty() {
                return Ok(Vec::new());
            }
            let marks = vec!["?"; owner_ids.len()].join(",");
            clauses.push(format!("owner_id IN ({marks})"));
            args.extend(owner_ids.iter().cloned());
        }
        if !statuses.is_empty() {
            let marks = vec!["?"; statuses.len()].join(",");
            clauses.push(format!("status IN ({marks})"));
            args.extend(statuses.iter().map(|s| s.to_string()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!("{CALL_SELECT_SQL}{where_sql} ORDER BY scheduled_at");

        let mut stmt = db.prepare(&sql)?;
        let calls: Vec<Call> = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), row_to_call)?
            .filter_map(|r| r.ok())
            .collect();
        debug!(count = calls.len(), "fetched calls");
        Ok(calls)
    }

    fn get(&self, call_id: &str) -> Result<Option<Call>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!("{CALL_SELECT_SQL} WHERE id = ?1"),
            params![call_id],
            row_to_call,
        ) {
            Ok(call) => Ok(Some(call)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CallError::Database(e)),
        }
    }

    fn create(&self, call: &Call) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO calls
             (id, owner_id, contact, subject, scheduled_at, duration_mins,
              status, priority, notes, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
            params![
                call.id,
                call.owner_id,
                call.contact,
                call.subject,
                call.scheduled_at.to_rfc3339(),
                call.duration_mins as i64,
                call.status.to_string(),
                call.priority.to_string(),
                call.notes,
                call.created_at,
                call.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_status(
        &self,
        call_id: &str,
        status: CallStatus,
        update: &StatusUpdate,
    ) -> Result<()> {
        let db = self.db.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let rows = db.execute(
            "UPDATE calls
             SET status = ?2,
                 notes = COALESCE(?3, notes),
                 scheduled_at = COALESCE(?4, scheduled_at),
                 updated_at = ?5
             WHERE id = ?1",
            params![
                call_id,
                status.to_string(),
                update.notes,
                update.scheduled_at.map(|t| t.to_rfc3339()),
                now,
            ],
        )?;
        if rows == 0 {
            return Err(CallError::NotFound {
                id: call_id.to_string(),
            });
        }
        Ok(())
    }
}
