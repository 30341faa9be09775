use chrono::DateTime;
use rusqlite::Connection;

use crate::error::Result;
use crate::types::{Call, CallPriority, CallStatus};

/// Initialise the calls schema in `conn`.
///
/// Creates the `calls` table (idempotent) and indexes for the two hot
/// queries: owner-filtered fetches and time-ordered scans.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS calls (
            id            TEXT    NOT NULL PRIMARY KEY,
            owner_id      TEXT    NOT NULL,
            contact       TEXT    NOT NULL,
            subject       TEXT    NOT NULL,
            scheduled_at  TEXT    NOT NULL,   -- RFC3339
            duration_mins INTEGER NOT NULL DEFAULT 30,
            status        TEXT    NOT NULL DEFAULT 'scheduled',
            priority      TEXT    NOT NULL DEFAULT 'normal',
            notes         TEXT,
            created_at    TEXT    NOT NULL,
            updated_at    TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_calls_owner_status
            ON calls (owner_id, status);
        -- RFC3339 sorts lexicographically, so ORDER BY scheduled_at is correct.
        CREATE INDEX IF NOT EXISTS idx_calls_scheduled_at
            ON calls (scheduled_at);
        ",
    )?;
    Ok(())
}

/// Map a SELECT row (column order from CALL_SELECT_SQL) to a Call.
/// Centralised here so every query in this crate stays consistent.
pub(crate) fn row_to_call(row: &rusqlite::Row<'_>) -> rusqlite::Result<Call> {
    use std::str::FromStr;

    let scheduled_raw: String = row.get(4)?;
    let scheduled_at = DateTime::parse_from_rfc3339(&scheduled_raw)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&chrono::Utc);
    let status = CallStatus::from_str(&row.get::<_, String>(6)?).unwrap_or(CallStatus::Scheduled);
    let priority = CallPriority::from_str(&row.get::<_, String>(7)?).unwrap_or_default();

    Ok(Call {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        contact: row.get(2)?,
        subject: row.get(3)?,
        scheduled_at,
        duration_mins: row.get::<_, i64>(5)? as u32,
        status,
        priority,
        notes: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
