// Fleet-wide endpoints: master control and unlock-all.

use crate::control::ControlClient;
use crate::control::models::Instruction;
use crate::error::Error;

impl ControlClient {
    /// Apply instructions to every device at once. The body is a bare
    /// instruction array.
    ///
    /// `PUT /hvacs/midea-control-all-devices`
    pub async fn control_all(&self, instructions: &[Instruction]) -> Result<Option<String>, Error> {
        let url = self.endpoint("hvacs/midea-control-all-devices", &[])?;
        let envelope = self
            .put::<serde_json::Value>(url, Some(&instructions))
            .await?;
        Ok(envelope.message)
    }

    /// Release every lock on every device.
    ///
    /// `PUT /hvacs/midea/all-unlock`
    pub async fn unlock_all(&self) -> Result<Option<String>, Error> {
        let url = self.endpoint("hvacs/midea/all-unlock", &[])?;
        let envelope = self.put::<serde_json::Value>(url, None::<&()>).await?;
        Ok(envelope.message)
    }
}
