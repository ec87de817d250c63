//! Device state variables that reminder conditions can refer to.
//!
//! [`DeviceRegistry`] is the read side of the host's key-value registry. Two
//! implementations are provided: [`JsonFileRegistry`], which reads a flat JSON object
//! written by the host, and [`StaticRegistry`] with fixed values.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// A device-state variable usable in a condition expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceVariable {
    PowerConnected,
    BatteryLevel,
    ScreenBrightness,
    SoundVolume,
    SoundMuted,
}

impl DeviceVariable {
    pub const ALL: [DeviceVariable; 5] = [
        Self::PowerConnected,
        Self::BatteryLevel,
        Self::ScreenBrightness,
        Self::SoundVolume,
        Self::SoundMuted,
    ];

    /// Name used in condition expressions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PowerConnected => "power_connected",
            Self::BatteryLevel => "battery_level",
            Self::ScreenBrightness => "screen_brightness",
            Self::SoundVolume => "sound_volume",
            Self::SoundMuted => "sound_muted",
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Self::PowerConnected | Self::SoundMuted)
    }
}

impl std::fmt::Display for DeviceVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for DeviceVariable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("unknown device variable: {s}"))
    }
}

/// A typed value of a device variable or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

/// Read access to current device state.
pub trait DeviceRegistry: Send + Sync {
    /// `None` when the value has never been set or cannot be read.
    fn get(&self, var: DeviceVariable) -> Option<Value>;

    /// Every known value at once, so one evaluation sees a single consistent state.
    fn read_all(&self) -> StaticRegistry {
        let mut snapshot = StaticRegistry::new();
        for var in DeviceVariable::ALL {
            if let Some(value) = self.get(var) {
                snapshot.set(var, value);
            }
        }
        snapshot
    }
}

/// Fixed values, e.g. for `nudge check` overrides.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    values: HashMap<DeviceVariable, Value>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, var: DeviceVariable, value: Value) -> Self {
        self.set(var, value);
        self
    }

    pub fn set(&mut self, var: DeviceVariable, value: Value) {
        self.values.insert(var, value);
    }

    /// Snapshot every variable another registry currently knows.
    pub fn snapshot(registry: &dyn DeviceRegistry) -> Self {
        registry.read_all()
    }
}

impl DeviceRegistry for StaticRegistry {
    fn get(&self, var: DeviceVariable) -> Option<Value> {
        self.values.get(&var).copied()
    }
}

/// Reads device state from a JSON object such as
/// `{"power_connected": true, "battery_level": 54}`. The file is re-read on every lookup,
/// and once per [`DeviceRegistry::read_all`].
pub struct JsonFileRegistry {
    path: PathBuf,
}

impl JsonFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        serde_json::from_str(&contents).context("device state must be a JSON object")
    }

    fn read_or_empty(&self) -> serde_json::Map<String, serde_json::Value> {
        self.read().unwrap_or_else(|e| {
            tracing::debug!(error = %e, "device state unavailable");
            serde_json::Map::new()
        })
    }
}

/// Typed value of `var` in a parsed device-state object. Wrong JSON types read as unset.
fn typed_value(
    map: &serde_json::Map<String, serde_json::Value>,
    var: DeviceVariable,
) -> Option<Value> {
    let raw = map.get(var.as_str())?;
    if var.is_bool() {
        raw.as_bool().map(Value::Bool)
    } else {
        raw.as_i64().map(Value::Int)
    }
}

impl DeviceRegistry for JsonFileRegistry {
    fn get(&self, var: DeviceVariable) -> Option<Value> {
        typed_value(&self.read_or_empty(), var)
    }

    fn read_all(&self) -> StaticRegistry {
        let map = self.read_or_empty();
        let mut snapshot = StaticRegistry::new();
        for var in DeviceVariable::ALL {
            if let Some(value) = typed_value(&map, var) {
                snapshot.set(var, value);
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_names_round_trip() {
        for var in DeviceVariable::ALL {
            assert_eq!(var.as_str().parse::<DeviceVariable>().unwrap(), var);
        }
        assert!("battery".parse::<DeviceVariable>().is_err());
    }

    #[test]
    fn json_registry_reads_typed_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.json");
        std::fs::write(
            &path,
            r#"{"power_connected": true, "battery_level": 54, "sound_muted": "yes"}"#,
        )
        .unwrap();

        let registry = JsonFileRegistry::new(&path);
        assert_eq!(registry.get(DeviceVariable::PowerConnected), Some(Value::Bool(true)));
        assert_eq!(registry.get(DeviceVariable::BatteryLevel), Some(Value::Int(54)));
        // wrong JSON type and missing keys read as unset
        assert_eq!(registry.get(DeviceVariable::SoundMuted), None);
        assert_eq!(registry.get(DeviceVariable::SoundVolume), None);
    }

    #[test]
    fn snapshot_copies_known_values() {
        let source = StaticRegistry::new().with(DeviceVariable::SoundVolume, Value::Int(7));
        let snap = StaticRegistry::snapshot(&source);
        assert_eq!(snap.get(DeviceVariable::SoundVolume), Some(Value::Int(7)));
        assert_eq!(snap.get(DeviceVariable::BatteryLevel), None);
    }

    #[test]
    fn json_registry_reads_all_values_from_one_file_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.json");
        std::fs::write(&path, r#"{"power_connected": false, "battery_level": 12}"#).unwrap();

        let registry = JsonFileRegistry::new(&path);
        let snapshot = registry.read_all();

        // later writes do not leak into an existing snapshot
        std::fs::write(&path, r#"{"power_connected": true, "battery_level": 90}"#).unwrap();
        assert_eq!(snapshot.get(DeviceVariable::PowerConnected), Some(Value::Bool(false)));
        assert_eq!(snapshot.get(DeviceVariable::BatteryLevel), Some(Value::Int(12)));
        assert_eq!(registry.get(DeviceVariable::BatteryLevel), Some(Value::Int(90)));
    }

    #[test]
    fn missing_device_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = JsonFileRegistry::new(dir.path().join("absent.json"));
        let snapshot = registry.read_all();
        for var in DeviceVariable::ALL {
            assert_eq!(snapshot.get(var), None);
        }
    }
}
