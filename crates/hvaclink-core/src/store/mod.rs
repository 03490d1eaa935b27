// ── Reactive data storage ──

mod collection;
mod registry;

pub use registry::DeviceRegistry;
