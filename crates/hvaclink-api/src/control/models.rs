// Control API wire types
//
// Request and response shapes for the HVAC control backend. Device records
// arrive both as full objects (list endpoint, snapshot pushes) and as partial
// `updates` objects (patch pushes), so every field on `WireDevice` is
// optional. The backend is loose about scalar encodings (flags show up as
// `0`/`1`, `true`/`false`, or `"lock"`/`"unlock"`), so those fields go
// through the lenient deserializers at the bottom of this file.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Envelope ─────────────────────────────────────────────────────────

/// Standard response envelope: `{ status, message, data }`.
///
/// Success responses may still carry an error `status` (e.g. `500`) in the
/// body; `ControlClient` checks that before handing `data` to callers.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

/// Wrapper used by list-style payloads: `{ metadata: [...] }`.
#[derive(Debug, Deserialize)]
pub struct Metadata<T> {
    #[serde(default = "Vec::new")]
    pub metadata: Vec<T>,
}

// ── Devices ──────────────────────────────────────────────────────────

/// Record id: numeric on most endpoints, stringified on some.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// An indoor unit as the backend reports it (full record or partial update).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireDevice {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "deviceSn")]
    pub device_sn: Option<String>,
    /// `0` = online.
    #[serde(default, deserialize_with = "de::flag")]
    pub off_line: Option<bool>,
    /// Measured room temperature.
    #[serde(default, deserialize_with = "de::number")]
    pub inner_board_t1: Option<f64>,
    #[serde(default, deserialize_with = "de::number")]
    pub set_temperature: Option<f64>,
    #[serde(default, deserialize_with = "de::number")]
    pub fan_speed: Option<f64>,
    #[serde(default, deserialize_with = "de::flag")]
    pub is_auto_fan: Option<bool>,
    #[serde(default, deserialize_with = "de::flag")]
    pub left_right_swing: Option<bool>,
    #[serde(default, deserialize_with = "de::flag")]
    pub up_down_swing: Option<bool>,
    #[serde(default, deserialize_with = "de::integer")]
    pub run_mode: Option<i64>,

    #[serde(default, deserialize_with = "de::number")]
    pub heat_temp_up_lock: Option<f64>,
    #[serde(default, deserialize_with = "de::flag")]
    pub is_heat_temp_up_lock: Option<bool>,
    #[serde(default, deserialize_with = "de::number")]
    pub cool_temp_down_lock: Option<f64>,
    #[serde(default, deserialize_with = "de::flag")]
    pub is_cool_temp_down_lock: Option<bool>,

    #[serde(default, deserialize_with = "de::flag")]
    pub on_off_limit: Option<bool>,
    #[serde(default, deserialize_with = "de::flag")]
    pub fan_limit: Option<bool>,
    #[serde(default, deserialize_with = "de::flag")]
    pub mode_limit: Option<bool>,
    #[serde(default, deserialize_with = "de::flag")]
    pub remote_control_lock: Option<bool>,
    #[serde(default, deserialize_with = "de::flag")]
    pub wire_controlock: Option<bool>,
    #[serde(default, deserialize_with = "de::flag")]
    pub idu_lock_mode: Option<bool>,
    #[serde(default, deserialize_with = "de::flag")]
    pub idu_lock: Option<bool>,
    #[serde(default, deserialize_with = "de::flag")]
    pub auto_lock: Option<bool>,
    #[serde(default, deserialize_with = "de::flag")]
    pub wind_speed_lock: Option<bool>,
    #[serde(default, deserialize_with = "de::flag")]
    pub switch_lock: Option<bool>,

    #[serde(default, rename = "tenantRoom")]
    pub tenant_room: Option<TenantRoom>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantRoom {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::integer")]
    pub assigned_code: Option<i64>,
    #[serde(default)]
    pub assigned_name: Option<String>,
    #[serde(default)]
    pub floor: Option<Floor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Floor {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::integer")]
    pub assigned_code: Option<i64>,
    #[serde(default)]
    pub assigned_name: Option<String>,
    #[serde(default)]
    pub building: Option<Building>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Building {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::integer")]
    pub assigned_code: Option<i64>,
    #[serde(default)]
    pub assigned_name: Option<String>,
}

// ── Control requests ─────────────────────────────────────────────────

/// Device type code the backend expects for indoor units.
pub const INDOOR_UNIT_DEVICE_TYPE: u8 = 4;

/// One vendor instruction: `{ command, parameter }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub command: String,
    pub parameter: i64,
}

impl Instruction {
    pub fn new(command: impl Into<String>, parameter: i64) -> Self {
        Self {
            command: command.into(),
            parameter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInstructions {
    #[serde(rename = "deviceType")]
    pub device_type: u8,
    pub instructions: Vec<Instruction>,
}

/// Body of `PUT /hvacs/midea-control-by-device-sn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    /// The device serial number.
    pub device_name: String,
    pub content: Vec<DeviceInstructions>,
}

impl ControlRequest {
    /// Single-instruction request for one indoor unit.
    pub fn single(serial: impl Into<String>, instruction: Instruction) -> Self {
        Self {
            device_name: serial.into(),
            content: vec![DeviceInstructions {
                device_type: INDOOR_UNIT_DEVICE_TYPE,
                instructions: vec![instruction],
            }],
        }
    }
}

/// `data` of a successful control call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlAck {
    #[serde(default)]
    pub messages: Option<Value>,
}

impl ControlAck {
    /// Human-readable summary of the backend's `messages` field, which is
    /// either a string or an array of strings.
    pub fn summary(&self) -> Option<String> {
        match self.messages.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(", "))
                }
            }
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

// ── Device creation ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    Lock,
    #[default]
    Unlock,
}

/// Body of `POST /hvacs/midea`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateDeviceRequest {
    #[serde(rename = "deviceSn")]
    pub device_sn: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub idu_fault: String,
    pub left_right_swing: i64,
    pub up_down_swing: i64,
    pub fan_speed: i64,
    pub is_auto_fan: i64,
    pub inner_board_t1: i64,
    pub set_temperature: i64,
    pub run_mode: i64,
    #[serde(rename = "IduMachineMode")]
    pub idu_machine_mode: i64,
    pub heat_temp_up_lock: i64,
    pub is_heat_temp_up_lock: LockState,
    pub cool_temp_down_lock: i64,
    pub is_cool_temp_down_lock: LockState,
    pub idu_lock_mode: i64,
    pub idu_lock: i64,
    pub auto_lock: i64,
    pub wind_speed_lock: i64,
    pub switch_lock: i64,
    pub wire_controlock: i64,
    pub remote_control_lock: i64,
    pub off_line: i64,
    pub sub_device_type_id: i64,
}

// ── History ──────────────────────────────────────────────────────────

/// One row of the device state history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(default)]
    pub hvac_device_id: Option<i64>,
    #[serde(default, rename = "deviceSn")]
    pub device_sn: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::number")]
    pub set_temperature: Option<f64>,
    #[serde(default, deserialize_with = "de::number")]
    pub inner_board_t1: Option<f64>,
    #[serde(default, deserialize_with = "de::number")]
    pub fan_speed: Option<f64>,
    #[serde(default, deserialize_with = "de::integer")]
    pub run_mode: Option<i64>,
    #[serde(default, deserialize_with = "de::flag")]
    pub off_line: Option<bool>,
    pub timestamp: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub run_mode_reason_message: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// `data` of `GET /hvacs/midea-history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub metadata: Vec<HistoryEntry>,
    #[serde(default)]
    pub pagination: Pagination,
}

// ── Weather ──────────────────────────────────────────────────────────

/// One weather observation as pushed on the realtime weather channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub coord: Option<Coord>,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
    pub main: WeatherMain,
    #[serde(default)]
    pub wind: Option<Wind>,
    /// Unix timestamp of the observation.
    pub dt: i64,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub id: i64,
    pub main: String,
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Temperatures are in Kelvin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeatherMain {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub deg: Option<f64>,
}

// ── Lenient deserializers ────────────────────────────────────────────

mod de {
    use super::{Deserialize, Deserializer, Value};

    /// Accepts `bool`, numbers (non-zero = true), and the strings
    /// `"lock"`/`"unlock"`, `"on"`/`"off"`, `"true"`/`"false"`, `"1"`/`"0"`.
    pub(super) fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "lock" | "locked" | "on" | "true" | "1" => Some(true),
                "unlock" | "unlocked" | "off" | "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    /// Accepts numbers and numeric strings.
    pub(super) fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// Accepts integers, integral floats, and integer strings.
    pub(super) fn integer<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            #[allow(clippy::as_conversions, clippy::cast_possible_truncation)]
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn wire_device_tolerates_mixed_encodings() {
        let device: WireDevice = serde_json::from_value(json!({
            "id": "17",
            "name": "Lobby IDU",
            "deviceSn": "ABC123",
            "off_line": 0,
            "inner_board_t1": "24.5",
            "set_temperature": 22,
            "fan_speed": 3,
            "is_auto_fan": true,
            "run_mode": 66,
            "is_heat_temp_up_lock": "lock",
            "is_cool_temp_down_lock": "unlock",
            "remote_control_lock": 1,
            "wire_controlock": null,
            "firmware": "v2"
        }))
        .unwrap();

        assert_eq!(device.id, Some(RecordId::Text("17".into())));
        assert_eq!(device.device_sn.as_deref(), Some("ABC123"));
        assert_eq!(device.off_line, Some(false));
        assert_eq!(device.inner_board_t1, Some(24.5));
        assert_eq!(device.run_mode, Some(66));
        assert_eq!(device.is_heat_temp_up_lock, Some(true));
        assert_eq!(device.is_cool_temp_down_lock, Some(false));
        assert_eq!(device.remote_control_lock, Some(true));
        assert_eq!(device.wire_controlock, None);
        assert!(device.extra.contains_key("firmware"));
    }

    #[test]
    fn partial_update_leaves_missing_fields_none() {
        let update: WireDevice = serde_json::from_value(json!({ "set_temperature": 25 })).unwrap();
        assert_eq!(update.set_temperature, Some(25.0));
        assert!(update.device_sn.is_none());
        assert!(update.run_mode.is_none());
    }

    #[test]
    fn control_request_serializes_vendor_shape() {
        let req = ControlRequest::single("ABC123", Instruction::new("SetTemperature", 25));
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "device_name": "ABC123",
                "content": [{
                    "deviceType": 4,
                    "instructions": [{ "command": "SetTemperature", "parameter": 25 }]
                }]
            })
        );
    }

    #[test]
    fn ack_summary_joins_message_arrays() {
        let ack: ControlAck =
            serde_json::from_value(json!({ "messages": ["Temperature set", "Fan set"] })).unwrap();
        assert_eq!(ack.summary().as_deref(), Some("Temperature set, Fan set"));

        let ack: ControlAck = serde_json::from_value(json!({ "messages": "Done" })).unwrap();
        assert_eq!(ack.summary().as_deref(), Some("Done"));
    }

    #[test]
    fn history_page_reads_camel_case_pagination() {
        let page: HistoryPage = serde_json::from_value(json!({
            "metadata": [{ "id": 1, "deviceSn": "ABC123", "timestamp": "2025-01-01T00:00:00Z" }],
            "pagination": {
                "total": 11, "page": 1, "limit": 10, "totalPages": 2,
                "hasNextPage": true, "hasPrevPage": false
            }
        }))
        .unwrap();
        assert_eq!(page.metadata.len(), 1);
        assert_eq!(page.pagination.total_pages, 2);
        assert!(page.pagination.has_next_page);
    }
}
