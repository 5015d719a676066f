//! Cloudroid - cloud emulator allocation for Android end-to-end tests
//!
//! Brokers Genymotion Cloud emulator instances for a test runner: resolves a
//! device query to a recipe, allocates an instance that no other worker
//! holds, prepares it for testing and releases it afterwards.
//!
//! ## Architecture
//!
//! Cloudroid is organized into specialized crates:
//!
//! - `cloudroid-core`: configuration, lifecycle events, path resolution
//! - `cloudroid-emulator-bridge`: ADB connection tool, app installer, instrumentation
//! - `cloudroid-genycloud`: recipe resolution, registry, allocator and the driver

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod logging;
pub mod session;

// Re-export main components for library usage
pub use cloudroid_core as core;
pub use cloudroid_emulator_bridge as bridge;
pub use cloudroid_genycloud as genycloud;

/// Prelude module for convenient imports
pub mod prelude {
    pub use cloudroid_core::{EventBus, FarmConfig};
    pub use cloudroid_genycloud::{DeviceQuery, GenyCloudDriver, LocalDeviceRegistry};
    pub use crate::session::DriverFactory;
}
