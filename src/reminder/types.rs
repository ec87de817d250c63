//! Reminder definitions and per-reminder tracked state.
//!
//! [`Reminder`] is the definition as delivered by the reminder source. [`ReminderState`]
//! is the engine-owned bookkeeping persisted alongside it, and [`LocationTrigger`] is the
//! parsed form of the `user_location` token used by the location-edge pass.

use serde::{Deserialize, Serialize};

/// A reminder definition.
///
/// Empty strings mean "no trigger of this kind". Both snake_case keys and the capitalised
/// keys of the legacy list format (`Repeat_each`, `User_location`, ...) are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    #[serde(alias = "Id")]
    pub id: String,
    #[serde(alias = "Message", default)]
    pub message: String,
    /// Local date-time in `YYYY-MM-DD -- HH:MM:SS` form.
    #[serde(alias = "Time", default)]
    pub time: String,
    /// Recurrence interval in minutes. Zero or negative means one-shot.
    #[serde(alias = "Repeat_each", default)]
    pub repeat_each: i64,
    #[serde(alias = "User_location", default)]
    pub user_location: String,
    #[serde(alias = "Device_condition", default)]
    pub device_condition: String,
}

impl Reminder {
    pub fn has_time(&self) -> bool {
        !self.time.is_empty()
    }

    pub fn has_location(&self) -> bool {
        !self.user_location.is_empty()
    }

    pub fn location_trigger(&self) -> LocationTrigger<'_> {
        LocationTrigger::parse(&self.user_location)
    }
}

/// Parsed `user_location` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationTrigger<'a> {
    None,
    /// `+token`: fires when the current location matches.
    Arrive(&'a str),
    /// `-token`: fires when the previous location matches.
    Depart(&'a str),
    /// Unsigned token, only meaningful as a gate on time reminders.
    At(&'a str),
}

impl<'a> LocationTrigger<'a> {
    pub fn parse(token: &'a str) -> Self {
        if token.is_empty() {
            Self::None
        } else if let Some(rest) = token.strip_prefix('+') {
            Self::Arrive(rest)
        } else if let Some(rest) = token.strip_prefix('-') {
            Self::Depart(rest)
        } else {
            Self::At(token)
        }
    }
}

/// Engine bookkeeping for one reminder id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderState {
    /// Due instant (minutes since the Unix epoch) of the last time-slot firing.
    pub last_fired: Option<i64>,
    /// Last gated truth value of `device_condition`.
    pub condition_latched: bool,
}

/// How a firing was triggered. Recorded in the fire log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireKind {
    /// Location-edge pass (arrival or departure).
    Location,
    /// Time/condition pass.
    Scheduled,
}

impl FireKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Scheduled => "scheduled",
        }
    }
}

impl std::fmt::Display for FireKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_keys() {
        let json = r#"{"Id":"r1","Message":"Take pills","Time":"2024-01-01 -- 08:00:00",
            "Repeat_each":1440,"User_location":"","Device_condition":"battery_level < 20"}"#;
        let r: Reminder = serde_json::from_str(json).unwrap();
        assert_eq!(r.id, "r1");
        assert_eq!(r.repeat_each, 1440);
        assert_eq!(r.device_condition, "battery_level < 20");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let r: Reminder = serde_json::from_str(r#"{"id":"r2","message":"hi"}"#).unwrap();
        assert!(!r.has_time());
        assert!(!r.has_location());
        assert_eq!(r.repeat_each, 0);
        assert!(r.device_condition.is_empty());
    }

    #[test]
    fn location_trigger_signs() {
        assert_eq!(LocationTrigger::parse(""), LocationTrigger::None);
        assert_eq!(LocationTrigger::parse("+Home"), LocationTrigger::Arrive("Home"));
        assert_eq!(LocationTrigger::parse("-Work*"), LocationTrigger::Depart("Work*"));
        assert_eq!(LocationTrigger::parse("Gym"), LocationTrigger::At("Gym"));
    }
}
