#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use nudge::device::{DeviceRegistry, DeviceVariable, StaticRegistry, Value};
use nudge::engine::{Collaborators, Engine};
use nudge::location::{LocationProvider, LocationSnapshot};
use nudge::notify::{ChannelNotifier, Notification};
use nudge::reminder::Reminder;
use nudge::sync::{fingerprint_bytes, ReminderSource};
use rusqlite::Connection;
use tokio::sync::mpsc;

/// A reminder with only an id and message set.
pub fn reminder(id: &str, message: &str) -> Reminder {
    Reminder {
        id: id.into(),
        message: message.into(),
        time: String::new(),
        repeat_each: 0,
        user_location: String::new(),
        device_condition: String::new(),
    }
}

#[derive(Default)]
struct SourceState {
    reminders: Vec<Reminder>,
    fail_fetch: bool,
    fingerprint_calls: usize,
    fetch_calls: usize,
}

/// In-memory reminder source that counts how often it is read.
#[derive(Clone, Default)]
pub struct FakeSource {
    inner: Arc<Mutex<SourceState>>,
}

impl FakeSource {
    pub fn new(reminders: Vec<Reminder>) -> Self {
        let source = Self::default();
        source.set(reminders);
        source
    }

    pub fn set(&self, reminders: Vec<Reminder>) {
        self.inner.lock().unwrap().reminders = reminders;
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.inner.lock().unwrap().fail_fetch = fail;
    }

    pub fn fetch_calls(&self) -> usize {
        self.inner.lock().unwrap().fetch_calls
    }

    pub fn fingerprint_calls(&self) -> usize {
        self.inner.lock().unwrap().fingerprint_calls
    }
}

#[async_trait]
impl ReminderSource for FakeSource {
    async fn fingerprint(&self) -> Result<Vec<u8>> {
        let mut state = self.inner.lock().unwrap();
        state.fingerprint_calls += 1;
        Ok(fingerprint_bytes(&serde_json::to_vec(&state.reminders)?))
    }

    async fn fetch_reminders(&self) -> Result<Vec<Reminder>> {
        let mut state = self.inner.lock().unwrap();
        state.fetch_calls += 1;
        if state.fail_fetch {
            bail!("reminder service unavailable");
        }
        Ok(state.reminders.clone())
    }
}

/// Location provider whose snapshot the test moves around.
#[derive(Clone, Default)]
pub struct FakeLocator {
    inner: Arc<Mutex<Option<LocationSnapshot>>>,
}

impl FakeLocator {
    pub fn at(&self, current: &str, previous: &str) {
        *self.inner.lock().unwrap() = Some(LocationSnapshot::new(current, previous));
    }

    pub fn lose_fix(&self) {
        *self.inner.lock().unwrap() = None;
    }
}

impl LocationProvider for FakeLocator {
    fn current(&self) -> Option<LocationSnapshot> {
        self.inner.lock().unwrap().clone()
    }
}

/// Device registry the test can change between cycles.
#[derive(Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<StaticRegistry>>,
}

impl SharedRegistry {
    pub fn set(&self, var: DeviceVariable, value: Value) {
        self.inner.lock().unwrap().set(var, value);
    }

    pub fn battery(&self, level: i64) {
        self.set(DeviceVariable::BatteryLevel, Value::Int(level));
    }
}

impl DeviceRegistry for SharedRegistry {
    fn get(&self, var: DeviceVariable) -> Option<Value> {
        self.inner.lock().unwrap().get(var)
    }
}

/// An engine wired to fakes, plus handles to drive them.
pub struct Harness {
    pub engine: Engine,
    pub source: FakeSource,
    pub locator: FakeLocator,
    pub registry: SharedRegistry,
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl Harness {
    pub fn new(reminders: Vec<Reminder>) -> Self {
        Self::with_connection(nudge::db::open_memory_database().unwrap(), FakeSource::new(reminders))
    }

    pub fn with_connection(conn: Connection, source: FakeSource) -> Self {
        let locator = FakeLocator::default();
        let registry = SharedRegistry::default();
        let (notifier, rx) = ChannelNotifier::new();
        let parts = Collaborators {
            source: Box::new(source.clone()),
            locator: Box::new(locator.clone()),
            registry: Box::new(registry.clone()),
            notifier: Box::new(notifier),
        };
        let engine = Engine::new(conn, parts, Duration::from_millis(10)).unwrap();
        Self {
            engine,
            source,
            locator,
            registry,
            rx,
        }
    }

    /// Run one cycle and return the messages it delivered.
    pub async fn cycle(&mut self, now: i64) -> Vec<String> {
        self.engine.run_cycle(now).await;
        self.drain()
    }

    pub fn drain(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(n) = self.rx.try_recv() {
            out.push(n.message);
        }
        out
    }
}
