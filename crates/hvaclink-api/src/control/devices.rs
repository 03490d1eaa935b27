// Per-device endpoints: list, control, power toggle, create, delete.

use tracing::debug;

use crate::control::ControlClient;
use crate::control::models::{
    ControlAck, ControlRequest, CreateDeviceRequest, Metadata, WireDevice,
};
use crate::error::Error;

/// Page size the dashboard list view uses.
pub const DEVICE_LIST_LIMIT: u32 = 30;

impl ControlClient {
    /// List indoor units.
    ///
    /// `GET /hvacs/midea/nastp?device_type=idu&page=1&limit=30`
    pub async fn list_devices(&self) -> Result<Vec<WireDevice>, Error> {
        let limit = DEVICE_LIST_LIMIT.to_string();
        let url = self.endpoint(
            "hvacs/midea/nastp",
            &[("device_type", "idu"), ("page", "1"), ("limit", &limit)],
        )?;
        let page: Metadata<WireDevice> = self.get(url).await?.into_data()?;
        debug!(count = page.metadata.len(), "listed devices");
        Ok(page.metadata)
    }

    /// Send instructions to one device.
    ///
    /// `PUT /hvacs/midea-control-by-device-sn`
    pub async fn control_device(&self, request: &ControlRequest) -> Result<ControlAck, Error> {
        let url = self.endpoint("hvacs/midea-control-by-device-sn", &[])?;
        let envelope = self.put::<ControlAck>(url, Some(request)).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Toggle a device's power. Returns the device record after the toggle.
    ///
    /// `PUT /hvacs/midea/power-on-off?device_sn={serial}`
    pub async fn toggle_power(&self, serial: &str) -> Result<WireDevice, Error> {
        let url = self.endpoint("hvacs/midea/power-on-off", &[("device_sn", serial)])?;
        self.put::<WireDevice>(url, None::<&()>).await?.into_data()
    }

    /// Register a new device. The realtime channel announces it afterwards.
    ///
    /// `POST /hvacs/midea`
    pub async fn create_device(&self, request: &CreateDeviceRequest) -> Result<WireDevice, Error> {
        let url = self.endpoint("hvacs/midea", &[])?;
        self.post::<WireDevice>(url, request).await?.into_data()
    }

    /// Delete a device by its database id. Returns the backend's message.
    ///
    /// `DELETE /hvacs/delete-midea?midea_id={id}`
    pub async fn delete_device(&self, id: i64) -> Result<Option<String>, Error> {
        let id = id.to_string();
        let url = self.endpoint("hvacs/delete-midea", &[("midea_id", &id)])?;
        let envelope = self.delete::<serde_json::Value>(url).await?;
        Ok(envelope.message)
    }
}
