use anyhow::Result;

use nudge::config::NudgeConfig;
use nudge::reminder::schedule::format_minute;
use nudge::reminder::store;

/// Print the most recent firings from the fire log.
pub fn history(config: &NudgeConfig, limit: usize) -> Result<()> {
    let conn = nudge::db::open_database(config.resolved_db_path())?;
    let fires = store::recent_fires(&conn, limit)?;

    if fires.is_empty() {
        println!("No reminders have fired yet.");
        return Ok(());
    }

    for f in &fires {
        let slot = f
            .due_minute
            .map(|m| format!(" (slot {})", format_minute(m)))
            .unwrap_or_default();
        println!("{}  [{:<9}] {}{}  {}", f.fired_at, f.kind, f.reminder_id, slot, f.message);
    }

    Ok(())
}
