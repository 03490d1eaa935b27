// ── Command types ──
//
// Typed user intents. Each command belongs to a `CommandClass`, which
// decides its debounce window; the dispatcher coalesces by
// (device, class).

mod coalescer;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use hvaclink_api::models::{ControlRequest, Instruction};

use crate::error::CoreError;
use crate::model::RunMode;

pub use coalescer::Coalescer;

/// Inclusive set-point range accepted by indoor units, °C.
pub const TEMPERATURE_RANGE: (u8, u8) = (16, 30);
/// Inclusive fan speed level range.
pub const FAN_SPEED_RANGE: (u8, u8) = (0, 6);

// ── LockKind ─────────────────────────────────────────────────────────

/// The individually toggleable device locks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum LockKind {
    MinTemp,
    MaxTemp,
    Mode,
    OnOff,
    FanSpeed,
    Remote,
    WiredControl,
}

impl LockKind {
    /// Vendor instruction name.
    pub const fn wire_command(self) -> &'static str {
        match self {
            Self::MinTemp => "CoolTempDownLock",
            Self::MaxTemp => "HeatTempUpLock",
            Self::Mode => "IduLockMode",
            Self::OnOff => "SwitchLock",
            Self::FanSpeed => "WindSpeedLock",
            Self::Remote => "RemoteControlLock",
            Self::WiredControl => "WireControlLock",
        }
    }
}

// ── CommandClass ─────────────────────────────────────────────────────

/// Debounce class of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandClass {
    PowerToggle,
    SetMode,
    SetTemperature,
    SetFanSpeed,
    /// Each lock debounces independently.
    SetLock(LockKind),
}

/// Per-class debounce windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceWindows {
    pub power_toggle: Duration,
    pub set_mode: Duration,
    pub set_temperature: Duration,
    pub set_fan_speed: Duration,
    pub set_lock: Duration,
}

impl Default for DebounceWindows {
    fn default() -> Self {
        Self {
            power_toggle: Duration::ZERO,
            set_mode: Duration::ZERO,
            set_temperature: Duration::from_millis(500),
            set_fan_speed: Duration::from_millis(1000),
            set_lock: Duration::from_millis(5000),
        }
    }
}

impl DebounceWindows {
    pub fn window(&self, class: CommandClass) -> Duration {
        match class {
            CommandClass::PowerToggle => self.power_toggle,
            CommandClass::SetMode => self.set_mode,
            CommandClass::SetTemperature => self.set_temperature,
            CommandClass::SetFanSpeed => self.set_fan_speed,
            CommandClass::SetLock(_) => self.set_lock,
        }
    }
}

// ── Command ──────────────────────────────────────────────────────────

/// A single-device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PowerToggle,
    SetMode(RunMode),
    /// °C; clamped to [`TEMPERATURE_RANGE`] when built via [`Command::from_class`].
    SetTemperature(u8),
    SetFanSpeed(u8),
    SetLock { lock: LockKind, engaged: bool },
}

fn clamp_level(parameter: i64, (min, max): (u8, u8)) -> u8 {
    let clamped = parameter.clamp(i64::from(min), i64::from(max));
    u8::try_from(clamped).unwrap_or(min)
}

impl Command {
    /// Build a command from a class and a raw parameter. Temperatures and fan
    /// speeds are clamped into range; lock parameters are non-zero = engaged.
    pub fn from_class(class: CommandClass, parameter: i64) -> Self {
        match class {
            CommandClass::PowerToggle => Self::PowerToggle,
            CommandClass::SetMode => Self::SetMode(RunMode::from_code(parameter)),
            CommandClass::SetTemperature => {
                Self::SetTemperature(clamp_level(parameter, TEMPERATURE_RANGE))
            }
            CommandClass::SetFanSpeed => Self::SetFanSpeed(clamp_level(parameter, FAN_SPEED_RANGE)),
            CommandClass::SetLock(lock) => Self::SetLock {
                lock,
                engaged: parameter != 0,
            },
        }
    }

    pub fn class(&self) -> CommandClass {
        match self {
            Self::PowerToggle => CommandClass::PowerToggle,
            Self::SetMode(_) => CommandClass::SetMode,
            Self::SetTemperature(_) => CommandClass::SetTemperature,
            Self::SetFanSpeed(_) => CommandClass::SetFanSpeed,
            Self::SetLock { lock, .. } => CommandClass::SetLock(*lock),
        }
    }

    /// Local checks run before anything is scheduled.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::SetMode(mode) if mode.is_off() => Err(CoreError::validation(
                "Select an operating mode; use power toggle to switch the unit off",
            )),
            Self::SetTemperature(t) if !(TEMPERATURE_RANGE.0..=TEMPERATURE_RANGE.1).contains(t) => {
                Err(CoreError::validation(format!(
                    "Temperature must be between {} and {} °C",
                    TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1
                )))
            }
            Self::SetFanSpeed(s) if *s > FAN_SPEED_RANGE.1 => Err(CoreError::validation(format!(
                "Fan speed must be between {} and {}",
                FAN_SPEED_RANGE.0, FAN_SPEED_RANGE.1
            ))),
            _ => Ok(()),
        }
    }

    /// The vendor instruction for this command. `None` for power toggle,
    /// which uses its own endpoint.
    pub fn instruction(&self) -> Option<Instruction> {
        match self {
            Self::PowerToggle => None,
            Self::SetMode(mode) => Some(Instruction::new("IduMode", mode.code())),
            Self::SetTemperature(t) => Some(Instruction::new("SetTemperature", i64::from(*t))),
            Self::SetFanSpeed(s) => Some(Instruction::new("SetFanSpeed", i64::from(*s))),
            Self::SetLock { lock, engaged } => Some(Instruction::new(
                lock.wire_command(),
                i64::from(u8::from(*engaged)),
            )),
        }
    }

    /// Control request addressed to `serial`, if this command uses one.
    pub fn to_request(&self, serial: &str) -> Option<ControlRequest> {
        self.instruction()
            .map(|instruction| ControlRequest::single(serial, instruction))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PowerToggle => f.write_str("Power toggle"),
            Self::SetMode(mode) => write!(f, "Mode set to {mode}"),
            Self::SetTemperature(t) => write!(f, "Temperature set to {t} °C"),
            Self::SetFanSpeed(s) => write!(f, "Fan speed set to {s}"),
            Self::SetLock { lock, engaged } => {
                let state = if *engaged { "locked" } else { "unlocked" };
                write!(f, "{lock} lock {state}")
            }
        }
    }
}

// ── FleetCommand ─────────────────────────────────────────────────────

/// Commands addressed to every device at once. Never debounced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FleetCommand {
    Power { on: bool },
    UnlockAll,
}

impl FleetCommand {
    /// Instructions for the fleet control endpoint (`None` for unlock-all,
    /// which has its own endpoint).
    pub fn instructions(&self) -> Option<Vec<Instruction>> {
        match self {
            Self::Power { on } => {
                let mode = if *on { RunMode::Auto } else { RunMode::Off };
                Some(vec![Instruction::new("IduMode", mode.code())])
            }
            Self::UnlockAll => None,
        }
    }
}
