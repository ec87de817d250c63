//! Persistence for the reminder list, tracked state and the fire log.
//!
//! The list is replaced wholesale on every successful sync. Tracked state is written as
//! an upsert of the full map; rows for ids that left the list are kept.

use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::types::{FireKind, Reminder, ReminderState};

/// Load the last synchronized reminder list, in source order.
pub fn load_reminders(conn: &Connection) -> Result<Vec<Reminder>> {
    let mut stmt = conn.prepare(
        "SELECT id, message, time, repeat_each, user_location, device_condition \
         FROM reminders ORDER BY position",
    )?;
    let reminders = stmt
        .query_map([], |row| {
            Ok(Reminder {
                id: row.get(0)?,
                message: row.get(1)?,
                time: row.get(2)?,
                repeat_each: row.get(3)?,
                user_location: row.get(4)?,
                device_condition: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(reminders)
}

/// Replace the stored reminder list in one transaction.
///
/// Duplicate ids keep the first occurrence.
pub fn replace_reminders(conn: &mut Connection, reminders: &[Reminder]) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM reminders", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO reminders \
             (id, position, message, time, repeat_each, user_location, device_condition) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for (position, r) in reminders.iter().enumerate() {
            stmt.execute(params![
                r.id,
                position as i64,
                r.message,
                r.time,
                r.repeat_each,
                r.user_location,
                r.device_condition,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn load_tracked_state(conn: &Connection) -> Result<HashMap<String, ReminderState>> {
    let mut stmt =
        conn.prepare("SELECT id, last_fired_minute, condition_latched FROM reminder_state")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                ReminderState {
                    last_fired: row.get(1)?,
                    condition_latched: row.get(2)?,
                },
            ))
        })?
        .collect::<Result<HashMap<_, _>, _>>()?;
    Ok(rows)
}

pub fn save_tracked_state(
    conn: &mut Connection,
    state: &HashMap<String, ReminderState>,
) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO reminder_state (id, last_fired_minute, condition_latched, updated_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(id) DO UPDATE SET \
               last_fired_minute = excluded.last_fired_minute, \
               condition_latched = excluded.condition_latched, \
               updated_at = excluded.updated_at \
             WHERE last_fired_minute IS NOT excluded.last_fired_minute \
                OR condition_latched != excluded.condition_latched",
        )?;
        for (id, s) in state {
            stmt.execute(params![id, s.last_fired, s.condition_latched, now])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Persist one reminder's state.
pub fn save_reminder_state(conn: &Connection, id: &str, state: &ReminderState) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO reminder_state (id, last_fired_minute, condition_latched, updated_at) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(id) DO UPDATE SET \
           last_fired_minute = excluded.last_fired_minute, \
           condition_latched = excluded.condition_latched, \
           updated_at = excluded.updated_at",
        params![id, state.last_fired, state.condition_latched, now],
    )?;
    Ok(())
}

pub fn get_reminder_state(conn: &Connection, id: &str) -> Result<Option<ReminderState>> {
    let state = conn
        .query_row(
            "SELECT last_fired_minute, condition_latched FROM reminder_state WHERE id = ?1",
            params![id],
            |row| {
                Ok(ReminderState {
                    last_fired: row.get(0)?,
                    condition_latched: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(state)
}

/// A row of the fire audit log.
#[derive(Debug, Serialize)]
pub struct FireRecord {
    pub reminder_id: String,
    pub kind: String,
    pub due_minute: Option<i64>,
    pub message: String,
    pub fired_at: String,
}

pub fn record_fire(
    conn: &Connection,
    reminder: &Reminder,
    kind: FireKind,
    due_minute: Option<i64>,
) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO fire_log (reminder_id, kind, due_minute, message, fired_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![reminder.id, kind.as_str(), due_minute, reminder.message, now],
    )?;
    Ok(())
}

/// Most recent firings first.
pub fn recent_fires(conn: &Connection, limit: usize) -> Result<Vec<FireRecord>> {
    let mut stmt = conn.prepare(
        "SELECT reminder_id, kind, due_minute, message, fired_at FROM fire_log \
         ORDER BY id DESC LIMIT ?1",
    )?;
    let records = stmt
        .query_map(params![limit as i64], |row| {
            Ok(FireRecord {
                reminder_id: row.get(0)?,
                kind: row.get(1)?,
                due_minute: row.get(2)?,
                message: row.get(3)?,
                fired_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}
