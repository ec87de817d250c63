//! Reminder trigger engine: decides when reminders fire.
//!
//! nudge runs a once-per-second loop over a synchronized list of reminders. Each reminder
//! can combine three kinds of trigger into one firing decision:
//!
//! | Trigger | Field | Fires |
//! |---------|-------|-------|
//! | **Time** | `time`, `repeat_each` | Once per due slot (one-shot or every N minutes) |
//! | **Location** | `user_location` | On arrival (`+Home`), departure (`-Home`), or while at a place |
//! | **Condition** | `device_condition` | On each false→true edge of a device-state expression |
//!
//! Firing markers and condition latches are persisted in SQLite, so restarts never
//! replay a time slot that already fired.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema and migrations
//! - [`engine`]: The trigger loop and its per-cycle passes
//! - [`condition`]: Device-condition expressions and edge-triggered gating
//! - [`reminder`]: Reminder types, recurrence arithmetic and persistence
//! - [`location`]: Location snapshots and token matching
//! - [`device`]: Device-state variables and registries
//! - [`notify`]: Notification queue handed fired messages
//! - [`sync`]: Fingerprinted synchronization with the reminder source

pub mod condition;
pub mod config;
pub mod db;
pub mod device;
pub mod engine;
pub mod location;
pub mod notify;
pub mod reminder;
pub mod sync;
