//! CLI `check` command: evaluate a device condition the way the engine would.

use anyhow::Result;
use clap::Args;

use nudge::condition::DeviceCondition;
use nudge::config::{expand_tilde, NudgeConfig};
use nudge::device::{DeviceRegistry, DeviceVariable, JsonFileRegistry, StaticRegistry, Value};

/// Values that replace the current device state for this check.
#[derive(Debug, Args, Default)]
pub struct Overrides {
    #[arg(long)]
    pub power_connected: Option<bool>,
    #[arg(long)]
    pub battery_level: Option<i64>,
    #[arg(long)]
    pub screen_brightness: Option<i64>,
    #[arg(long)]
    pub sound_volume: Option<i64>,
    #[arg(long)]
    pub sound_muted: Option<bool>,
}

impl Overrides {
    fn apply(&self, registry: &mut StaticRegistry) {
        let bools = [
            (DeviceVariable::PowerConnected, self.power_connected),
            (DeviceVariable::SoundMuted, self.sound_muted),
        ];
        let ints = [
            (DeviceVariable::BatteryLevel, self.battery_level),
            (DeviceVariable::ScreenBrightness, self.screen_brightness),
            (DeviceVariable::SoundVolume, self.sound_volume),
        ];
        for (var, val) in bools {
            if let Some(b) = val {
                registry.set(var, Value::Bool(b));
            }
        }
        for (var, val) in ints {
            if let Some(n) = val {
                registry.set(var, Value::Int(n));
            }
        }
    }
}

pub fn check(config: &NudgeConfig, expression: &str, overrides: &Overrides) -> Result<()> {
    let live = JsonFileRegistry::new(expand_tilde(&config.sources.device_state_path));
    let mut registry = StaticRegistry::snapshot(&live);
    overrides.apply(&mut registry);

    let condition = DeviceCondition::parse(expression);
    match &condition {
        DeviceCondition::Always => {
            println!("Empty condition: always satisfied.");
            return Ok(());
        }
        DeviceCondition::Invalid(e) => {
            println!("Parse error: {e}");
            println!("The engine treats this condition as false.");
            return Ok(());
        }
        DeviceCondition::Expr(expr) => {
            for var in expr.variables() {
                match registry.get(var) {
                    Some(v) => println!("  {var:<18} = {v}"),
                    None => println!("  {var:<18} = (unset)"),
                }
            }
        }
    }

    match condition.evaluate(&registry) {
        Ok(result) => println!("Result: {result}"),
        Err(e) => println!("Evaluation error: {e} (treated as false)"),
    }
    Ok(())
}
