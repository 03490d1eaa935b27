// ── Weather store ──
//
// Latest outdoor observations pushed over the weather channel, plus a
// loading flag that is set while a request is outstanding.

use std::sync::Arc;

use tokio::sync::watch;

use crate::event::WeatherEvent;
use crate::model::WeatherReport;

pub struct WeatherStore {
    reports: watch::Sender<Arc<Vec<WeatherReport>>>,
    loading: watch::Sender<bool>,
}

impl Default for WeatherStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherStore {
    pub fn new() -> Self {
        let (reports, _) = watch::channel(Arc::new(Vec::new()));
        let (loading, _) = watch::channel(false);
        Self { reports, loading }
    }

    pub fn reports(&self) -> Arc<Vec<WeatherReport>> {
        self.reports.borrow().clone()
    }

    /// The first report, which is what single-location displays show.
    pub fn current(&self) -> Option<WeatherReport> {
        self.reports.borrow().first().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<WeatherReport>>> {
        self.reports.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.loading.send_replace(loading);
    }

    /// Apply a decoded weather event. Clears the loading flag.
    pub fn apply(&self, event: WeatherEvent) {
        match event {
            WeatherEvent::Reports(reports) => {
                tracing::debug!(count = reports.len(), "weather reports received");
                self.reports.send_replace(Arc::new(reports));
            }
        }
        self.set_loading(false);
    }
}
