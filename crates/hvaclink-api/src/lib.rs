// hvaclink-api: Async Rust client for the HVAC control API and realtime channel

pub mod control;
pub mod error;
pub mod realtime;
pub mod transport;
pub mod vendor;

pub use control::ControlClient;
pub use control::models;
pub use error::Error;
pub use realtime::{Frame, RealtimeHandle, RealtimeMessage, ReconnectConfig};
pub use transport::{TlsMode, TransportConfig};
pub use vendor::VendorClient;
