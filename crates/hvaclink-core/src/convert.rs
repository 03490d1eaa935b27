// ── API-to-domain type conversions ──
//
// Bridges `hvaclink_api` wire records into `hvaclink_core::model` types.
// A `WireDevice` may be a full record or a partial update, so the primary
// conversion is `WireDevice -> DevicePatch`; a full `Device` is a fresh
// device with that patch applied.

use hvaclink_api::models::{RecordId, TenantRoom, WireDevice};

use crate::error::CoreError;
use crate::model::{Device, DevicePatch, DeviceSn, RoomAssignment, RunMode};

// ── Helpers ────────────────────────────────────────────────────────

/// Round a wire number into a `u8` level, saturating at the type bounds.
#[allow(
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn to_level(value: f64) -> u8 {
    value.round().clamp(0.0, f64::from(u8::MAX)) as u8
}

fn record_id(id: Option<&RecordId>) -> Option<i64> {
    match id? {
        RecordId::Int(n) => Some(*n),
        RecordId::Text(s) => s.trim().parse().ok(),
    }
}

fn room_from_wire(room: &TenantRoom) -> RoomAssignment {
    let floor = room.floor.as_ref();
    RoomAssignment {
        room_code: room.assigned_code,
        room_name: room.assigned_name.clone().or_else(|| room.name.clone()),
        floor: floor.and_then(|f| f.assigned_name.clone().or_else(|| f.name.clone())),
        building: floor
            .and_then(|f| f.building.as_ref())
            .and_then(|b| b.assigned_name.clone().or_else(|| b.name.clone())),
    }
}

// ── Conversions ────────────────────────────────────────────────────

impl From<&WireDevice> for DevicePatch {
    fn from(w: &WireDevice) -> Self {
        Self {
            record_id: record_id(w.id.as_ref()),
            name: w.name.clone(),
            online: w.off_line.map(|off| !off),
            room_temperature: w.inner_board_t1,
            set_temperature: w.set_temperature.map(to_level),
            fan_speed: w.fan_speed.map(to_level),
            auto_fan: w.is_auto_fan,
            run_mode: w.run_mode.map(RunMode::from_code),
            swing_horizontal: w.left_right_swing,
            swing_vertical: w.up_down_swing,
            min_temp_lock: w.is_cool_temp_down_lock,
            max_temp_lock: w.is_heat_temp_up_lock,
            mode_lock: w.idu_lock_mode,
            on_off_lock: w.switch_lock,
            fan_speed_lock: w.wind_speed_lock,
            remote_lock: w.remote_control_lock,
            wired_control_lock: w.wire_controlock,
            min_temp_limit: w.cool_temp_down_lock,
            max_temp_limit: w.heat_temp_up_lock,
            room: w.tenant_room.as_ref().map(room_from_wire),
        }
    }
}

impl TryFrom<&WireDevice> for Device {
    type Error = CoreError;

    fn try_from(w: &WireDevice) -> Result<Self, Self::Error> {
        let serial = w
            .device_sn
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::validation("device record has no serial number"))?;

        let mut device = Device::new(DeviceSn::from(serial));
        DevicePatch::from(w).apply(&mut device);
        Ok(device)
    }
}

/// Convert a batch of wire records, skipping (and logging) any without a
/// serial number.
pub fn devices_from_wire(records: &[WireDevice]) -> Vec<Device> {
    records
        .iter()
        .filter_map(|w| match Device::try_from(w) {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::warn!(error = %e, id = ?w.id, "skipping device record");
                None
            }
        })
        .collect()
}
