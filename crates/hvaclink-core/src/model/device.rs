// ── Device domain types ──
//
// Canonical indoor-unit representation. Built from `WireDevice` records in
// `convert.rs`; incremental updates arrive as `DevicePatch` values and are
// shallow-merged with `DevicePatch::apply`.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── DeviceSn ─────────────────────────────────────────────────────────

/// Stable device serial number; the registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceSn(String);

impl DeviceSn {
    pub fn new(serial: impl Into<String>) -> Self {
        Self(serial.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceSn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceSn {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for DeviceSn {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for DeviceSn {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ── RunMode ──────────────────────────────────────────────────────────

/// Operating mode, carried on the wire as a numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Off,
    Fan,
    Cool,
    Heat,
    Dry,
    Auto,
    /// A code outside the known set, kept as-is.
    Other(i64),
}

impl RunMode {
    pub const fn code(self) -> i64 {
        match self {
            Self::Off => 0,
            Self::Fan => 65,
            Self::Cool => 66,
            Self::Heat => 67,
            Self::Dry => 70,
            Self::Auto => 192,
            Self::Other(code) => code,
        }
    }

    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Off,
            65 => Self::Fan,
            66 => Self::Cool,
            67 => Self::Heat,
            70 => Self::Dry,
            192 => Self::Auto,
            other => Self::Other(other),
        }
    }

    pub const fn is_off(self) -> bool {
        matches!(self, Self::Off)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::Fan => f.write_str("fan"),
            Self::Cool => f.write_str("cool"),
            Self::Heat => f.write_str("heat"),
            Self::Dry => f.write_str("dry"),
            Self::Auto => f.write_str("auto"),
            Self::Other(code) => write!(f, "mode {code}"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "fan" | "supply-air" => Ok(Self::Fan),
            "cool" | "cooling" => Ok(Self::Cool),
            "heat" | "heating" => Ok(Self::Heat),
            "dry" | "dehumidify" => Ok(Self::Dry),
            "auto" | "automatic" => Ok(Self::Auto),
            other => other
                .parse::<i64>()
                .map(Self::from_code)
                .map_err(|_| format!("unknown run mode: {s}")),
        }
    }
}

// ── Locks ────────────────────────────────────────────────────────────

/// Per-device lock flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFlags {
    /// Cooling lower limit engaged.
    pub min_temp: bool,
    /// Heating upper limit engaged.
    pub max_temp: bool,
    pub mode: bool,
    pub on_off: bool,
    pub fan_speed: bool,
    pub remote: bool,
    pub wired_control: bool,
}

impl LockFlags {
    pub fn any(&self) -> bool {
        self.min_temp
            || self.max_temp
            || self.mode
            || self.on_off
            || self.fan_speed
            || self.remote
            || self.wired_control
    }
}

// ── RoomAssignment ───────────────────────────────────────────────────

/// Read-only placement of a device in the building.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAssignment {
    pub room_code: Option<i64>,
    pub room_name: Option<String>,
    pub floor: Option<String>,
    pub building: Option<String>,
}

// ── Device ───────────────────────────────────────────────────────────

/// Last-known state of one indoor unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub serial: DeviceSn,
    /// Backend database id (needed for delete).
    pub record_id: Option<i64>,
    pub name: String,
    pub online: bool,
    /// Measured room temperature, °C.
    pub room_temperature: Option<f64>,
    /// Commanded set-point, °C.
    pub set_temperature: u8,
    /// Fan speed level, 0–6.
    pub fan_speed: u8,
    pub auto_fan: bool,
    pub run_mode: RunMode,
    pub swing_horizontal: bool,
    pub swing_vertical: bool,
    pub locks: LockFlags,
    pub min_temp_limit: Option<f64>,
    pub max_temp_limit: Option<f64>,
    pub room: Option<RoomAssignment>,
}

impl Device {
    /// A device with nothing known beyond its serial.
    pub fn new(serial: DeviceSn) -> Self {
        Self {
            name: serial.to_string(),
            serial,
            record_id: None,
            online: true,
            room_temperature: None,
            set_temperature: 0,
            fan_speed: 0,
            auto_fan: false,
            run_mode: RunMode::Off,
            swing_horizontal: false,
            swing_vertical: false,
            locks: LockFlags::default(),
            min_temp_limit: None,
            max_temp_limit: None,
            room: None,
        }
    }

    pub fn is_on(&self) -> bool {
        !self.run_mode.is_off()
    }
}

// ── DevicePatch ──────────────────────────────────────────────────────

/// Partial device update. `None` fields leave the target untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevicePatch {
    pub record_id: Option<i64>,
    pub name: Option<String>,
    pub online: Option<bool>,
    pub room_temperature: Option<f64>,
    pub set_temperature: Option<u8>,
    pub fan_speed: Option<u8>,
    pub auto_fan: Option<bool>,
    pub run_mode: Option<RunMode>,
    pub swing_horizontal: Option<bool>,
    pub swing_vertical: Option<bool>,
    pub min_temp_lock: Option<bool>,
    pub max_temp_lock: Option<bool>,
    pub mode_lock: Option<bool>,
    pub on_off_lock: Option<bool>,
    pub fan_speed_lock: Option<bool>,
    pub remote_lock: Option<bool>,
    pub wired_control_lock: Option<bool>,
    pub min_temp_limit: Option<f64>,
    pub max_temp_limit: Option<f64>,
    pub room: Option<RoomAssignment>,
}

impl DevicePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Shallow-merge this patch into `device`.
    pub fn apply(&self, device: &mut Device) {
        fn set<T: Clone>(target: &mut T, value: Option<&T>) {
            if let Some(v) = value {
                target.clone_from(v);
            }
        }

        if self.record_id.is_some() {
            device.record_id = self.record_id;
        }
        set(&mut device.name, self.name.as_ref());
        set(&mut device.online, self.online.as_ref());
        if self.room_temperature.is_some() {
            device.room_temperature = self.room_temperature;
        }
        set(&mut device.set_temperature, self.set_temperature.as_ref());
        set(&mut device.fan_speed, self.fan_speed.as_ref());
        set(&mut device.auto_fan, self.auto_fan.as_ref());
        set(&mut device.run_mode, self.run_mode.as_ref());
        set(&mut device.swing_horizontal, self.swing_horizontal.as_ref());
        set(&mut device.swing_vertical, self.swing_vertical.as_ref());

        set(&mut device.locks.min_temp, self.min_temp_lock.as_ref());
        set(&mut device.locks.max_temp, self.max_temp_lock.as_ref());
        set(&mut device.locks.mode, self.mode_lock.as_ref());
        set(&mut device.locks.on_off, self.on_off_lock.as_ref());
        set(&mut device.locks.fan_speed, self.fan_speed_lock.as_ref());
        set(&mut device.locks.remote, self.remote_lock.as_ref());
        set(&mut device.locks.wired_control, self.wired_control_lock.as_ref());

        if self.min_temp_limit.is_some() {
            device.min_temp_limit = self.min_temp_limit;
        }
        if self.max_temp_limit.is_some() {
            device.max_temp_limit = self.max_temp_limit;
        }
        if self.room.is_some() {
            device.room.clone_from(&self.room);
        }
    }
}
