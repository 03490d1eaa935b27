// Control API surface: REST endpoints for device state and commands.

mod client;
mod devices;
mod fleet;
mod history;
pub mod models;

pub use client::ControlClient;
pub(crate) use client::backend_error;
pub use devices::DEVICE_LIST_LIMIT;
pub use history::HISTORY_PAGE_LIMIT;
