//! Genymotion Cloud allocation driver
//!
//! Resolves device queries to cloud recipes, allocates emulator instances
//! shared safely between concurrent test workers, prepares them for test
//! execution and releases them afterwards.

pub mod allocator;
pub mod client;
pub mod driver;
pub mod error;
pub mod instance;
pub mod naming;
pub mod query;
pub mod recipe;
pub mod registry;
pub mod services;

#[cfg(test)]
mod testing;

pub use allocator::{CloudInstanceAllocator, InstanceAllocator};
pub use client::CloudClient;
pub use driver::{DriverState, GenyCloudDriver, GenyCloudDriverDeps};
pub use error::{AllocationError, CloudError, DriverError, Result};
pub use instance::{Allocation, DeviceHandle, Instance, InstanceState};
pub use naming::InstanceNaming;
pub use query::{CloudRecipeResolver, RecipeResolver};
pub use recipe::{DeviceQuery, Recipe};
pub use registry::{AllocationFuture, DeviceRegistry, LocalDeviceRegistry};
pub use services::{InstanceLifecycleService, InstanceLookupService};

/// Provider name used in operator diagnostics
pub const PROVIDER_NAME: &str = "Genycloud";

/// Driver name before any instance is bound
pub const UNBOUND_DRIVER_NAME: &str = "Unspecified Genymotion Cloud Emulator";
