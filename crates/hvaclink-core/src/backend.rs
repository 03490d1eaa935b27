// ── Control backend seam ──
//
// Everything the session and dispatcher need from the control API, as a
// trait object. `ControlClient` is the production implementation; tests
// plug in an in-memory recorder. The vendor gateway gets its own seam.

use async_trait::async_trait;

use hvaclink_api::Error as ApiError;
use hvaclink_api::vendor::models::{GroupSetting, HvacSystem, IndoorUnit, UnitProperties};
use hvaclink_api::{ControlClient, VendorClient};
use hvaclink_api::models::{
    ControlAck, ControlRequest, CreateDeviceRequest, HistoryPage, Instruction, WireDevice,
};

#[async_trait]
pub trait ControlBackend: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<WireDevice>, ApiError>;

    async fn control_device(&self, request: &ControlRequest) -> Result<ControlAck, ApiError>;

    /// Returns the device record after the toggle.
    async fn toggle_power(&self, serial: &str) -> Result<WireDevice, ApiError>;

    async fn control_all(&self, instructions: &[Instruction]) -> Result<Option<String>, ApiError>;

    async fn unlock_all(&self) -> Result<Option<String>, ApiError>;

    async fn create_device(&self, request: &CreateDeviceRequest) -> Result<WireDevice, ApiError>;

    async fn delete_device(&self, id: i64) -> Result<Option<String>, ApiError>;

    async fn device_history(&self, search: &str, page: u32) -> Result<HistoryPage, ApiError>;
}

#[async_trait]
impl ControlBackend for ControlClient {
    async fn list_devices(&self) -> Result<Vec<WireDevice>, ApiError> {
        ControlClient::list_devices(self).await
    }

    async fn control_device(&self, request: &ControlRequest) -> Result<ControlAck, ApiError> {
        ControlClient::control_device(self, request).await
    }

    async fn toggle_power(&self, serial: &str) -> Result<WireDevice, ApiError> {
        ControlClient::toggle_power(self, serial).await
    }

    async fn control_all(&self, instructions: &[Instruction]) -> Result<Option<String>, ApiError> {
        ControlClient::control_all(self, instructions).await
    }

    async fn unlock_all(&self) -> Result<Option<String>, ApiError> {
        ControlClient::unlock_all(self).await
    }

    async fn create_device(&self, request: &CreateDeviceRequest) -> Result<WireDevice, ApiError> {
        ControlClient::create_device(self, request).await
    }

    async fn delete_device(&self, id: i64) -> Result<Option<String>, ApiError> {
        ControlClient::delete_device(self, id).await
    }

    async fn device_history(&self, search: &str, page: u32) -> Result<HistoryPage, ApiError> {
        ControlClient::device_history(self, search, page).await
    }
}

// ── Vendor gateway seam ──────────────────────────────────────────────

/// The manufacturer gateway, reached separately from the control API.
#[async_trait]
pub trait VendorBackend: Send + Sync {
    async fn list_units(&self) -> Result<Vec<IndoorUnit>, ApiError>;

    async fn group_setting(&self, setting: &GroupSetting) -> Result<HvacSystem, ApiError>;

    async fn unit_properties(&self, serials: &[String]) -> Result<Vec<UnitProperties>, ApiError>;
}

#[async_trait]
impl VendorBackend for VendorClient {
    async fn list_units(&self) -> Result<Vec<IndoorUnit>, ApiError> {
        VendorClient::list_units(self).await
    }

    async fn group_setting(&self, setting: &GroupSetting) -> Result<HvacSystem, ApiError> {
        VendorClient::group_setting(self, setting).await
    }

    async fn unit_properties(&self, serials: &[String]) -> Result<Vec<UnitProperties>, ApiError> {
        VendorClient::unit_properties(self, serials).await
    }
}
