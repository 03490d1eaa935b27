//! Reactive device layer between `hvaclink-api` and consumers (CLI, UIs).
//!
//! - **[`HvacSession`]**: the facade. [`start()`](HvacSession::start) opens
//!   the realtime channels, whose pushes keep the [`DeviceRegistry`]
//!   current; [`shutdown()`](HvacSession::shutdown) tears everything down.
//!
//! - **[`DeviceRegistry`]**: serial-keyed device state with atomic snapshot
//!   replacement and shallow-merge patches, published through
//!   `tokio::sync::watch` so readers never see a half-applied event.
//!
//! - **[`CommandDispatcher`]**: validates user intents and debounces them
//!   per (device, [`CommandClass`]) through a [`Coalescer`], so a burst of
//!   set-point changes sends only the last one.
//!
//! - **[`DialControl`]**: the Idle / Dragging / Committing binding that
//!   keeps a control's displayed value steady while the user drags it.
//!
//! - **[`VendorStore`]**: the manufacturer gateway's unit listing, group
//!   settings and per-unit properties, fetched on demand.
//!
//! - **[`Notifier`]**: every success, failure, and connection change as a
//!   [`Notification`].

pub mod backend;
pub mod channel;
pub mod command;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod feed;
pub mod history;
pub mod interaction;
pub mod model;
pub mod notify;
pub mod session;
pub mod store;
pub mod vendor;
pub mod weather;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::{ControlBackend, VendorBackend};
pub use channel::RealtimeChannel;
pub use command::{
    Coalescer, Command, CommandClass, DebounceWindows, FAN_SPEED_RANGE, FleetCommand, LockKind,
    TEMPERATURE_RANGE,
};
pub use config::{SessionConfig, TlsVerification};
pub use dispatch::{CommandDispatcher, FleetActivity};
pub use error::{CoreError, UNREACHABLE_MESSAGE};
pub use event::{DeviceEvent, WeatherEvent, WeatherQuery};
pub use feed::DeviceFeed;
pub use history::HistoryLog;
pub use interaction::{DialControl, DialKind, InteractionState};
pub use model::{
    Device, DevicePatch, DeviceSn, HistoryEntry, LockFlags, Pagination, RoomAssignment, RunMode,
    WeatherReport,
};
pub use notify::{Notification, NotificationLevel, Notifier};
pub use session::{ConnectionState, HvacSession};
pub use store::DeviceRegistry;
pub use vendor::VendorStore;
pub use weather::WeatherStore;

// Wire types consumers need to build requests.
pub use hvaclink_api::ReconnectConfig;
pub use hvaclink_api::models::{CreateDeviceRequest, LockState};
pub use hvaclink_api::vendor::models::{GroupSetting, HvacSystem, IndoorUnit, UnitProperties};
