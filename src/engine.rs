//! The trigger loop.
//!
//! [`Engine`] owns the reminder list, the per-reminder tracked state and the previous
//! location snapshot. Each cycle runs, in order:
//!
//! 1. sync with the reminder source (only when its fingerprint changed),
//! 2. reconciliation: every listed reminder gets a tracked-state entry,
//! 3. the location-edge pass, only when the location snapshot changed,
//! 4. the time/condition pass over every reminder,
//! 5. a single write of tracked state, if anything changed.
//!
//! Device state is read once per cycle and shared by both passes. The engine then sleeps
//! until the next tick or until shutdown is signalled.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use rusqlite::Connection;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::condition::DeviceCondition;
use crate::device::{DeviceRegistry, StaticRegistry};
use crate::location::{matches_location, LocationProvider, LocationSnapshot};
use crate::notify::{Notification, Notifier};
use crate::reminder::schedule;
use crate::reminder::{store, FireKind, LocationTrigger, Reminder, ReminderState};
use crate::sync::{ReminderSource, Synchronizer};

/// External collaborators the engine reads from and writes to.
pub struct Collaborators {
    pub source: Box<dyn ReminderSource>,
    pub locator: Box<dyn LocationProvider>,
    pub registry: Box<dyn DeviceRegistry>,
    pub notifier: Box<dyn Notifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeTrigger {
    None,
    At { base: i64 },
    /// Unparseable `time`: never due.
    Invalid,
}

/// A reminder with its time and condition pre-parsed.
#[derive(Debug, Clone)]
struct ArmedReminder {
    def: Reminder,
    time: TimeTrigger,
    condition: DeviceCondition,
}

impl ArmedReminder {
    fn arm(def: Reminder) -> Self {
        let time = if def.has_time() {
            match schedule::parse_base_minute(&def.time) {
                Ok(base) => TimeTrigger::At { base },
                Err(e) => {
                    warn!(id = %def.id, error = %e, "reminder time unusable, it will never fire");
                    TimeTrigger::Invalid
                }
            }
        } else {
            TimeTrigger::None
        };

        let condition = DeviceCondition::parse(&def.device_condition);
        if let DeviceCondition::Invalid(ref e) = condition {
            warn!(id = %def.id, error = %e, "device condition invalid, treated as false");
        }

        Self {
            def,
            time,
            condition,
        }
    }
}

/// What happened during one cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub synced: bool,
    pub location_changed: bool,
    pub fired: Vec<(String, FireKind)>,
}

pub struct Engine {
    conn: Connection,
    parts: Collaborators,
    synchronizer: Synchronizer,
    reminders: Vec<ArmedReminder>,
    state: HashMap<String, ReminderState>,
    state_dirty: bool,
    last_location: Option<LocationSnapshot>,
    tick: Duration,
}

impl Engine {
    /// Restore the last persisted reminder list and tracked state.
    pub fn new(conn: Connection, parts: Collaborators, tick: Duration) -> Result<Self> {
        let reminders = store::load_reminders(&conn)?;
        let state = store::load_tracked_state(&conn)?;
        info!(
            reminders = reminders.len(),
            tracked = state.len(),
            "restored engine state"
        );

        Ok(Self {
            conn,
            parts,
            synchronizer: Synchronizer::new(),
            reminders: reminders.into_iter().map(ArmedReminder::arm).collect(),
            state,
            state_dirty: false,
            last_location: None,
            tick,
        })
    }

    pub fn reminders(&self) -> impl Iterator<Item = &Reminder> {
        self.reminders.iter().map(|r| &r.def)
    }

    pub fn reminder_state(&self, id: &str) -> Option<&ReminderState> {
        self.state.get(id)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run cycles until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(tick = ?self.tick, "reminder engine running");
        loop {
            let report = self.run_cycle(schedule::now_minute()).await;
            if !report.fired.is_empty() {
                debug!(fired = report.fired.len(), "cycle complete");
            }

            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.tick) => {}
                _ = shutdown.changed() => break,
            }
        }
        info!("reminder engine stopped");
    }

    /// One evaluation cycle at `now` (minutes since the Unix epoch).
    pub async fn run_cycle(&mut self, now: i64) -> CycleReport {
        let mut report = CycleReport::default();

        if let Some(list) = self
            .synchronizer
            .sync(self.parts.source.as_ref(), &mut self.conn)
            .await
        {
            self.reminders = list.into_iter().map(ArmedReminder::arm).collect();
            report.synced = true;
        }

        self.reconcile();

        let device = self.parts.registry.read_all();
        let snapshot = self
            .parts
            .locator
            .current()
            .unwrap_or_else(LocationSnapshot::unknown);

        report.location_changed = self.location_pass(&snapshot, &device, &mut report.fired);
        self.time_pass(&snapshot, &device, now, &mut report.fired);
        self.flush_state();

        report
    }

    fn reconcile(&mut self) {
        for armed in &self.reminders {
            if !self.state.contains_key(&armed.def.id) {
                self.state
                    .insert(armed.def.id.clone(), ReminderState::default());
                self.state_dirty = true;
            }
        }
    }

    /// Persist tracked state once if anything changed since the last write.
    fn flush_state(&mut self) {
        if !self.state_dirty {
            return;
        }
        match store::save_tracked_state(&mut self.conn, &self.state) {
            Ok(()) => self.state_dirty = false,
            Err(e) => warn!(error = %e, "failed to persist tracked state"),
        }
    }

    /// Arrival/departure triggers for reminders without a time. Returns whether the
    /// location changed since the previous cycle.
    fn location_pass(
        &mut self,
        snapshot: &LocationSnapshot,
        device: &StaticRegistry,
        fired: &mut Vec<(String, FireKind)>,
    ) -> bool {
        let Some(previous) = self.last_location.replace(snapshot.clone()) else {
            // first observation only primes the comparison
            return false;
        };
        if previous == *snapshot {
            return false;
        }
        debug!(
            current = %snapshot.current,
            previous = %snapshot.previous,
            "location changed"
        );

        let Self {
            conn,
            parts,
            reminders,
            state,
            state_dirty,
            ..
        } = self;

        for armed in reminders.iter() {
            let def = &armed.def;
            if def.has_time() || !def.has_location() {
                continue;
            }

            let location_ok = match def.location_trigger() {
                LocationTrigger::Arrive(token) => snapshot
                    .current_fix()
                    .is_some_and(|loc| matches_location(token, loc)),
                LocationTrigger::Depart(token) => snapshot
                    .previous_fix()
                    .is_some_and(|loc| matches_location(token, loc)),
                LocationTrigger::At(_) | LocationTrigger::None => continue,
            };

            let entry = state.entry(def.id.clone()).or_default();
            let latched_before = entry.condition_latched;
            let condition_ok = armed
                .condition
                .gate(&mut entry.condition_latched, device);
            if entry.condition_latched != latched_before {
                *state_dirty = true;
            }

            if location_ok && condition_ok {
                announce(conn, parts.notifier.as_ref(), def, FireKind::Location, None);
                fired.push((def.id.clone(), FireKind::Location));
            }
        }

        true
    }

    /// Time, plain-location and condition triggers, evaluated for every reminder.
    fn time_pass(
        &mut self,
        snapshot: &LocationSnapshot,
        device: &StaticRegistry,
        now: i64,
        fired: &mut Vec<(String, FireKind)>,
    ) {
        let Self {
            conn,
            parts,
            reminders,
            state,
            state_dirty,
            ..
        } = self;

        for armed in reminders.iter() {
            let def = &armed.def;
            let entry = state.entry(def.id.clone()).or_default();

            let (time_ok, due) = match armed.time {
                TimeTrigger::None => (true, None),
                TimeTrigger::Invalid => (false, None),
                TimeTrigger::At { base } => {
                    let due = schedule::due_minute(base, def.repeat_each, now);
                    (schedule::is_due(due, now, entry.last_fired), Some(due))
                }
            };

            // Sign prefixes have no meaning here; only the wildcard is honoured.
            let location_ok = !def.has_location()
                || snapshot
                    .current_fix()
                    .is_some_and(|loc| matches_location(&def.user_location, loc));

            let latched_before = entry.condition_latched;
            let condition_ok = armed
                .condition
                .gate(&mut entry.condition_latched, device);
            if entry.condition_latched != latched_before {
                *state_dirty = true;
            }

            if !(time_ok && location_ok && condition_ok) {
                continue;
            }

            if let Some(due) = due {
                entry.last_fired = Some(due);
                // marker is written before the notification goes out
                if let Err(e) = store::save_reminder_state(conn, &def.id, entry) {
                    warn!(id = %def.id, error = %e, "failed to persist fired marker");
                    *state_dirty = true;
                }
            }
            announce(conn, parts.notifier.as_ref(), def, FireKind::Scheduled, due);
            fired.push((def.id.clone(), FireKind::Scheduled));
        }
    }
}

fn announce(
    conn: &Connection,
    notifier: &dyn Notifier,
    reminder: &Reminder,
    kind: FireKind,
    due: Option<i64>,
) {
    if let Err(e) = store::record_fire(conn, reminder, kind, due) {
        warn!(id = %reminder.id, error = %e, "failed to write fire log");
    }
    notifier.enqueue(Notification::reminder(&reminder.id, &reminder.message));
    info!(id = %reminder.id, trigger = %kind, "Reminder! Message: {}", reminder.message);
}
