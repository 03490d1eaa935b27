// ── Realtime event decoding ──
//
// Turns raw realtime frames into closed event enums. Unknown event names
// are logged and dropped here; nothing downstream matches on strings.

use serde::Deserialize;
use serde_json::{Value, json};

use hvaclink_api::Frame;
use hvaclink_api::models::{Metadata, WeatherReport, WireDevice};

use crate::convert::devices_from_wire;
use crate::error::CoreError;
use crate::model::{Device, DevicePatch, DeviceSn};

// ── Wire event names ─────────────────────────────────────────────────

pub mod names {
    /// Emitted: request a full device snapshot.
    pub const REQUEST_ALL_DEVICES: &str = "getAllMideaData";
    /// Emitted: request the current weather.
    pub const REQUEST_WEATHER: &str = "get_realtime_weather";

    pub const SNAPSHOT: &str = "hvacMidea:getAllMideaData";
    pub const DEVICE_NEW: &str = "hvacMidea:new";
    pub const DEVICE_UPDATED: &str = "hvacMideaNastp:deviceUpdatedByDeviceSN";
    pub const FLEET_UPDATED: &str = "HvacMidea:deviceUpdatedAllDevices";
    pub const FLEET_UNLOCKED: &str = "HvacMidea:AllDevicesUnlocked";
    pub const DEVICE_DELETED: &str = "hvacMidea:delete";
    pub const DEVICES_SYNCED: &str = "mideaDevicesUpdated";

    pub const WEATHER: &str = "WEATHER:GET_REALTIME";
}

// ── DeviceEvent ──────────────────────────────────────────────────────

/// A device-registry event pushed by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Full collection; replaces the registry.
    Snapshot(Vec<Device>),
    /// A single device, new or re-announced. Merged into a known record.
    Upsert { serial: DeviceSn, patch: DevicePatch },
    /// Partial update for one device.
    Patch { serial: DeviceSn, patch: DevicePatch },
    /// A device was removed on the backend.
    Delete { serial: DeviceSn },
    /// The backend re-synced with the vendor cloud; a fresh snapshot
    /// should be requested.
    ResyncRequested { count: u64 },
}

#[derive(Deserialize)]
struct PatchPayload {
    #[serde(rename = "deviceSn")]
    device_sn: String,
    #[serde(default)]
    updates: WireDevice,
}

#[derive(Deserialize)]
struct SyncPayload {
    #[serde(default)]
    count: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotPayload {
    List(Vec<WireDevice>),
    Wrapped(Metadata<WireDevice>),
}

impl DeviceEvent {
    /// Decode a frame. `Ok(None)` means the event name is not a device
    /// event; `Err` means the name matched but the payload was malformed.
    pub fn decode(frame: &Frame) -> Result<Option<Self>, CoreError> {
        let event = match frame.event.as_str() {
            names::SNAPSHOT => {
                let records = match parse::<SnapshotPayload>(frame)? {
                    SnapshotPayload::List(list) => list,
                    SnapshotPayload::Wrapped(wrapped) => wrapped.metadata,
                };
                Self::Snapshot(devices_from_wire(&records))
            }
            names::DEVICE_NEW => {
                let wire: WireDevice = parse(frame)?;
                let device = Device::try_from(&wire)?;
                Self::Upsert {
                    serial: device.serial,
                    patch: DevicePatch::from(&wire),
                }
            }
            names::DEVICE_UPDATED | names::FLEET_UPDATED | names::FLEET_UNLOCKED => {
                let payload: PatchPayload = parse(frame)?;
                Self::Patch {
                    serial: DeviceSn::from(payload.device_sn),
                    patch: DevicePatch::from(&payload.updates),
                }
            }
            names::DEVICE_DELETED => {
                let wire: WireDevice = parse(frame)?;
                let serial = wire.device_sn.ok_or_else(|| {
                    CoreError::validation("delete event without a serial number")
                })?;
                Self::Delete {
                    serial: DeviceSn::from(serial),
                }
            }
            names::DEVICES_SYNCED => {
                let payload: SyncPayload = parse(frame)?;
                Self::ResyncRequested {
                    count: payload.count,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// The "request all devices" frame, sent on every connect and after a
/// backend resync.
pub fn request_all_devices(search: &str) -> Frame {
    Frame::new(names::REQUEST_ALL_DEVICES, json!({ "search": search }))
}

// ── WeatherEvent ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum WeatherEvent {
    /// Latest observations; empty when the backend had none.
    Reports(Vec<WeatherReport>),
}

#[derive(Deserialize)]
struct WeatherPayload {
    #[serde(default)]
    metadata: Option<Vec<WeatherReport>>,
}

impl WeatherEvent {
    pub fn decode(frame: &Frame) -> Result<Option<Self>, CoreError> {
        match frame.event.as_str() {
            names::WEATHER => {
                let payload: WeatherPayload = if frame.data.is_null() {
                    WeatherPayload { metadata: None }
                } else {
                    parse(frame)?
                };
                Ok(Some(Self::Reports(payload.metadata.unwrap_or_default())))
            }
            _ => Ok(None),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn parse<T: for<'de> Deserialize<'de>>(frame: &Frame) -> Result<T, CoreError> {
    T::deserialize(&frame.data).map_err(|e| {
        CoreError::Internal(format!("malformed `{}` payload: {e}", frame.event))
    })
}

/// Optional parameters for the weather request frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherQuery {
    pub search: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl WeatherQuery {
    pub fn to_frame(&self) -> Frame {
        let mut data = serde_json::Map::new();
        if let Some(ref search) = self.search {
            data.insert("search".into(), Value::from(search.as_str()));
        }
        if let Some(lat) = self.latitude {
            data.insert("latitude".into(), Value::from(lat));
        }
        if let Some(lon) = self.longitude {
            data.insert("longitude".into(), Value::from(lon));
        }
        Frame::new(names::REQUEST_WEATHER, Value::Object(data))
    }
}
