//! SQL DDL for the nudge state database.
//!
//! Defines the `reminders` (last synchronized definition list), `reminder_state`
//! (per-reminder tracked state) and `schema_meta` tables. All DDL uses
//! `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Last synchronized reminder list, in source order
CREATE TABLE IF NOT EXISTS reminders (
    id TEXT PRIMARY KEY,
    position INTEGER NOT NULL,
    message TEXT NOT NULL,
    time TEXT NOT NULL DEFAULT '',
    repeat_each INTEGER NOT NULL DEFAULT 0,
    user_location TEXT NOT NULL DEFAULT '',
    device_condition TEXT NOT NULL DEFAULT ''
);

-- Engine bookkeeping, keyed by reminder id; rows outlive their reminder
CREATE TABLE IF NOT EXISTS reminder_state (
    id TEXT PRIMARY KEY,
    last_fired_minute INTEGER,
    condition_latched INTEGER NOT NULL DEFAULT 0 CHECK(condition_latched IN (0, 1)),
    updated_at TEXT NOT NULL
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
