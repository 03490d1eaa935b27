// Device history endpoint.

use crate::control::ControlClient;
use crate::control::models::HistoryPage;
use crate::error::Error;

/// Page size of the history log.
pub const HISTORY_PAGE_LIMIT: u32 = 10;

impl ControlClient {
    /// Fetch one page of the device state history, optionally filtered.
    ///
    /// `GET /hvacs/midea-history?page={page}&limit=10&search={search}`
    pub async fn device_history(&self, search: &str, page: u32) -> Result<HistoryPage, Error> {
        let page = page.max(1).to_string();
        let limit = HISTORY_PAGE_LIMIT.to_string();
        let url = self.endpoint(
            "hvacs/midea-history",
            &[("page", &page), ("limit", &limit), ("search", search)],
        )?;
        self.get(url).await?.into_data()
    }
}
