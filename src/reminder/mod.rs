pub mod schedule;
pub mod store;
pub mod types;

pub use types::{FireKind, LocationTrigger, Reminder, ReminderState};
