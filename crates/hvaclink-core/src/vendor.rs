// ── Vendor gateway store ──
//
// What the manufacturer gateway last reported: its indoor-unit listing,
// the system record from the last group setting, and per-unit properties.
// One loading flag covers all three requests.

use std::sync::Arc;

use tokio::sync::watch;

use hvaclink_api::vendor::models::{HvacSystem, IndoorUnit, UnitProperties};

pub struct VendorStore {
    system: watch::Sender<Option<Arc<HvacSystem>>>,
    units: watch::Sender<Arc<Vec<IndoorUnit>>>,
    properties: watch::Sender<Arc<Vec<UnitProperties>>>,
    loading: watch::Sender<bool>,
}

impl Default for VendorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorStore {
    pub fn new() -> Self {
        Self {
            system: watch::channel(None).0,
            units: watch::channel(Arc::new(Vec::new())).0,
            properties: watch::channel(Arc::new(Vec::new())).0,
            loading: watch::channel(false).0,
        }
    }

    pub fn system(&self) -> Option<Arc<HvacSystem>> {
        self.system.borrow().clone()
    }

    pub fn units(&self) -> Arc<Vec<IndoorUnit>> {
        self.units.borrow().clone()
    }

    pub fn subscribe_units(&self) -> watch::Receiver<Arc<Vec<IndoorUnit>>> {
        self.units.subscribe()
    }

    pub fn properties(&self) -> Arc<Vec<UnitProperties>> {
        self.properties.borrow().clone()
    }

    /// Serial numbers of every listed unit, in gateway order.
    pub fn serials(&self) -> Vec<String> {
        self.units.borrow().iter().map(|u| u.device_sn.clone()).collect()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Forget everything the gateway reported.
    pub fn reset(&self) {
        self.system.send_replace(None);
        self.units.send_replace(Arc::new(Vec::new()));
        self.properties.send_replace(Arc::new(Vec::new()));
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.loading.send_replace(loading);
    }

    pub(crate) fn set_units(&self, units: Vec<IndoorUnit>) {
        self.units.send_replace(Arc::new(units));
    }

    /// A system record also carries the current unit listing.
    pub(crate) fn set_system(&self, system: HvacSystem) {
        self.set_units(system.indoor_devices.clone());
        self.system.send_replace(Some(Arc::new(system)));
    }

    pub(crate) fn set_properties(&self, properties: Vec<UnitProperties>) {
        self.properties.send_replace(Arc::new(properties));
    }
}
