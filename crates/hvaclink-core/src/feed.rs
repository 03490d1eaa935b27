// ── Registry change feed ──

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::Device;

type Published = Arc<Vec<Arc<Device>>>;

/// One subscriber's view of the device registry.
///
/// Each call to [`changed`](Self::changed) yields a whole snapshot, never a
/// partially applied event.
pub struct DeviceFeed {
    receiver: watch::Receiver<Published>,
}

impl DeviceFeed {
    pub(crate) fn new(receiver: watch::Receiver<Published>) -> Self {
        Self { receiver }
    }

    /// Devices as of the last snapshot this subscriber observed.
    pub fn current(&self) -> Vec<Device> {
        unpack(&self.receiver.borrow())
    }

    /// Wait for the registry to change. `None` once the registry is gone.
    pub async fn changed(&mut self) -> Option<Vec<Device>> {
        self.receiver.changed().await.ok()?;
        Some(unpack(&self.receiver.borrow_and_update()))
    }
}

fn unpack(published: &Published) -> Vec<Device> {
    published.iter().map(|d| Device::clone(d)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::model::{Device, DeviceSn};
    use crate::store::DeviceRegistry;

    #[tokio::test]
    async fn changed_yields_the_next_whole_snapshot() {
        let registry = DeviceRegistry::new();
        let mut feed = registry.subscribe();
        assert!(feed.current().is_empty());

        registry.replace_all(vec![
            Device::new(DeviceSn::from("A")),
            Device::new(DeviceSn::from("B")),
        ]);

        let snapshot = feed.changed().await.unwrap();
        let serials: Vec<_> = snapshot.iter().map(|d| d.serial.to_string()).collect();
        assert_eq!(serials, ["A", "B"]);
        assert_eq!(feed.current().len(), 2);
    }

    #[tokio::test]
    async fn changed_ends_when_the_registry_is_dropped() {
        let registry = DeviceRegistry::new();
        let mut feed = registry.subscribe();
        drop(registry);
        assert!(feed.changed().await.is_none());
    }
}
