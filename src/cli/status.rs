//! CLI `status` command: list reminders with their next due slot and tracked state.

use anyhow::Result;

use nudge::config::NudgeConfig;
use nudge::reminder::schedule::{self, due_minute, format_minute, parse_base_minute};
use nudge::reminder::store;

pub fn status(config: &NudgeConfig) -> Result<()> {
    let conn = nudge::db::open_database(config.resolved_db_path())?;
    let reminders = store::load_reminders(&conn)?;
    let state = store::load_tracked_state(&conn)?;
    let now = schedule::now_minute();

    println!("Reminders ({})", reminders.len());
    println!("{}", "=".repeat(40));

    for r in &reminders {
        let tracked = state.get(&r.id).copied().unwrap_or_default();

        println!("{}  {}", r.id, r.message);
        if r.has_time() {
            match parse_base_minute(&r.time) {
                Ok(base) => {
                    let due = due_minute(base, r.repeat_each, now);
                    let (label, slot) = if tracked.last_fired != Some(due) {
                        if due > now {
                            ("next", due)
                        } else {
                            ("pending", due)
                        }
                    } else if r.repeat_each > 0 {
                        ("next", due + r.repeat_each)
                    } else {
                        ("fired", due)
                    };
                    println!("  time:      {label} {}", format_minute(slot));
                    if r.repeat_each > 0 {
                        println!("  repeats:   every {} min", r.repeat_each);
                    }
                }
                Err(e) => println!("  time:      INVALID ({e})"),
            }
        }
        if r.has_location() {
            println!("  location:  {}", r.user_location);
        }
        if !r.device_condition.is_empty() {
            let latch = if tracked.condition_latched { "true" } else { "false" };
            println!("  condition: {}  (latched: {latch})", r.device_condition);
        }
        if let Some(last) = tracked.last_fired {
            println!("  last fired slot: {}", format_minute(last));
        }
    }

    let orphaned = state
        .keys()
        .filter(|id| !reminders.iter().any(|r| &r.id == *id))
        .count();
    if orphaned > 0 {
        println!();
        println!("Tracked state kept for {orphaned} reminder(s) no longer listed.");
    }

    Ok(())
}
