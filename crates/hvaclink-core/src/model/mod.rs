// ── Domain model ──

mod device;

pub use device::{Device, DevicePatch, DeviceSn, LockFlags, RoomAssignment, RunMode};

// History rows and weather reports are surfaced as the backend shapes them.
pub use hvaclink_api::models::{HistoryEntry, Pagination, WeatherReport};
