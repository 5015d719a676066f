//! Device Registry
//!
//! Process-wide inventory of instances held by this test run. Workers share
//! one registry; a reservation is an atomic insert keyed by instance uuid, so
//! two workers that pick the same idle instance cannot both keep it.

use std::collections::HashSet;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::AllocationError;
use crate::instance::Allocation;

/// Deferred lookup-or-create step run under the registry's guarantee
pub type AllocationFuture<'a> = BoxFuture<'a, Result<Allocation, AllocationError>>;

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Run `allocate` and reserve the instance it yields.
    ///
    /// Fails with [`AllocationError::AlreadyReserved`] when the instance is
    /// held by someone else; the allocation is then discarded.
    async fn allocate_device(&self, allocate: AllocationFuture<'_>) -> Result<Allocation, AllocationError>;

    /// Release a reservation. Releasing an unknown id is not an error.
    async fn dispose_device(&self, device_id: &str) -> Result<(), AllocationError>;

    /// Whether `device_id` is currently reserved
    fn includes(&self, device_id: &str) -> bool;
}

/// In-memory registry shared by the workers of one process
#[derive(Default)]
pub struct LocalDeviceRegistry {
    reserved: Mutex<HashSet<String>>,
}

impl LocalDeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids currently reserved
    pub fn reserved(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.reserved.lock().iter().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl DeviceRegistry for LocalDeviceRegistry {
    async fn allocate_device(&self, allocate: AllocationFuture<'_>) -> Result<Allocation, AllocationError> {
        let allocation = allocate.await?;
        let uuid = &allocation.instance.uuid;

        if !self.reserved.lock().insert(uuid.clone()) {
            debug!("Lost reservation race for {}", uuid);
            return Err(AllocationError::AlreadyReserved(uuid.clone()));
        }

        info!("Reserved instance {}", uuid);
        Ok(allocation)
    }

    async fn dispose_device(&self, device_id: &str) -> Result<(), AllocationError> {
        if self.reserved.lock().remove(device_id) {
            info!("Released instance {}", device_id);
        } else {
            debug!("Nothing reserved for {}", device_id);
        }
        Ok(())
    }

    fn includes(&self, device_id: &str) -> bool {
        self.reserved.lock().contains(device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::an_instance;
    use futures::FutureExt;

    fn allocation(uuid: &str) -> AllocationFuture<'static> {
        let instance = an_instance(uuid);
        async move { Ok(Allocation { instance, is_new: false }) }.boxed()
    }

    #[tokio::test]
    async fn test_reserve_and_dispose() {
        let registry = LocalDeviceRegistry::new();

        let allocation = registry.allocate_device(allocation("i1")).await.unwrap();
        assert_eq!(allocation.instance.uuid, "i1");
        assert!(registry.includes("i1"));

        registry.dispose_device("i1").await.unwrap();
        assert!(!registry.includes("i1"));
    }

    #[tokio::test]
    async fn test_double_booking_is_rejected() {
        let registry = LocalDeviceRegistry::new();
        registry.allocate_device(allocation("i1")).await.unwrap();

        let err = registry.allocate_device(allocation("i1")).await.unwrap_err();
        assert_eq!(err, AllocationError::AlreadyReserved("i1".to_string()));
        assert_eq!(registry.reserved(), vec!["i1".to_string()]);
    }

    #[tokio::test]
    async fn test_dispose_unknown_is_ok() {
        let registry = LocalDeviceRegistry::new();
        registry.dispose_device("never-reserved").await.unwrap();
        registry.dispose_device("never-reserved").await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_allocation_reserves_nothing() {
        let registry = LocalDeviceRegistry::new();
        let failing: AllocationFuture<'static> =
            async { Err(AllocationError::Registry("lookup failed".to_string())) }.boxed();

        assert!(registry.allocate_device(failing).await.is_err());
        assert!(registry.reserved().is_empty());
    }
}
