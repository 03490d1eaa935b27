// ── Device registry ──
//
// The single shared mutable structure: serial -> last-known device state.
// Snapshots replace it atomically; patches shallow-merge; deletes remove.

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::event::DeviceEvent;
use crate::feed::DeviceFeed;
use crate::model::{Device, DevicePatch, DeviceSn};

use super::collection::EntityCollection;

/// In-memory registry of devices keyed by serial number.
pub struct DeviceRegistry {
    devices: EntityCollection<Device>,
    last_sync: watch::Sender<Option<DateTime<Utc>>>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (last_sync, _) = watch::channel(None);
        Self {
            devices: EntityCollection::new(),
            last_sync,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// All devices in backend order.
    pub fn get_all(&self) -> Vec<Device> {
        self.devices
            .snapshot()
            .iter()
            .map(|d| Device::clone(d))
            .collect()
    }

    pub fn get_by_id(&self, serial: &str) -> Option<Device> {
        self.devices.get(serial).map(|d| Device::clone(&d))
    }

    pub fn contains(&self, serial: &str) -> bool {
        self.devices.get(serial).is_some()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of mutations applied so far.
    pub fn version(&self) -> u64 {
        self.devices.version()
    }

    /// When the last full snapshot was applied.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.borrow()
    }

    /// Subscribe to registry snapshots.
    pub fn subscribe(&self) -> DeviceFeed {
        DeviceFeed::new(self.devices.subscribe())
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Replace the whole registry. Devices absent from `devices` are gone
    /// afterwards; a serial appearing twice keeps its last record.
    pub fn replace_all(&self, devices: Vec<Device>) {
        let count = devices.len();
        self.devices
            .replace_all(devices.into_iter().map(|d| (d.serial.to_string(), d)));
        self.last_sync.send_replace(Some(Utc::now()));
        debug!(count, "registry replaced");
    }

    /// Merge `patch` into the device with this serial. Unknown serials are
    /// a logged no-op; returns whether a device was updated.
    pub fn apply_patch(&self, serial: &str, patch: &DevicePatch) -> bool {
        let applied = self.devices.modify(serial, |device| patch.apply(device));
        if !applied {
            debug!(serial, "patch for unknown device ignored");
        }
        applied
    }

    /// Merge `patch` into the device with this serial, adding the device
    /// first if it is unknown. Returns `true` if it was new.
    pub fn upsert(&self, serial: &DeviceSn, patch: &DevicePatch) -> bool {
        self.devices.merge(
            serial.to_string(),
            || Device::new(serial.clone()),
            |device| patch.apply(device),
        )
    }

    /// Remove one device. Unknown serials are a logged no-op.
    pub fn remove(&self, serial: &str) -> Option<Device> {
        let removed = self.devices.remove(serial).map(|d| Device::clone(&d));
        if removed.is_none() {
            debug!(serial, "delete for unknown device ignored");
        }
        removed
    }

    /// Apply a decoded realtime event. Returns `true` if the registry changed.
    pub fn apply(&self, event: &DeviceEvent) -> bool {
        match event {
            DeviceEvent::Snapshot(devices) => {
                self.replace_all(devices.clone());
                true
            }
            DeviceEvent::Upsert { serial, patch } => {
                self.upsert(serial, patch);
                true
            }
            DeviceEvent::Patch { serial, patch } => self.apply_patch(serial.as_str(), patch),
            DeviceEvent::Delete { serial } => self.remove(serial.as_str()).is_some(),
            DeviceEvent::ResyncRequested { .. } => false,
        }
    }

    /// Serials currently present, in order.
    pub fn serials(&self) -> Vec<DeviceSn> {
        self.devices
            .snapshot()
            .iter()
            .map(|d| d.serial.clone())
            .collect()
    }
}
