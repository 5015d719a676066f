//! Instance Allocator
//!
//! Turns a recipe into a ready, adb-reachable instance:
//! - reserve an idle family instance, or start a new one, through the registry
//! - wait for the instance to come online
//! - open an adb tunnel if the cloud has not done so yet

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cloudroid_core::AllocationConfig;
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::error::AllocationError;
use crate::instance::{Allocation, Instance};
use crate::recipe::Recipe;
use crate::registry::DeviceRegistry;
use crate::services::{InstanceLifecycleService, InstanceLookupService};

#[async_trait]
pub trait InstanceAllocator: Send + Sync {
    /// A reserved, online and connected instance of `recipe`
    async fn allocate_device(&self, recipe: &Recipe) -> Result<Allocation, AllocationError>;
}

pub struct CloudInstanceAllocator {
    registry: Arc<dyn DeviceRegistry>,
    lookup: Arc<InstanceLookupService>,
    lifecycle: Arc<InstanceLifecycleService>,
    config: AllocationConfig,
}

impl CloudInstanceAllocator {
    pub fn new(
        registry: Arc<dyn DeviceRegistry>,
        lookup: Arc<InstanceLookupService>,
        lifecycle: Arc<InstanceLifecycleService>,
        config: AllocationConfig,
    ) -> Self {
        Self {
            registry,
            lookup,
            lifecycle,
            config,
        }
    }

    async fn find_or_create(&self, recipe: &Recipe) -> Result<Allocation, AllocationError> {
        if let Some(instance) = self.lookup.find_free_instance(&recipe.uuid).await? {
            info!("Reusing instance {} for {}", instance.uuid, recipe);
            return Ok(Allocation { instance, is_new: false });
        }

        let instance = self.lifecycle.create_instance(&recipe.uuid).await?;
        info!("Started instance {} for {}", instance.uuid, recipe);
        Ok(Allocation { instance, is_new: true })
    }

    async fn reserve(&self, recipe: &Recipe) -> Result<Allocation, AllocationError> {
        let mut attempt = 1;
        loop {
            match self.registry.allocate_device(self.find_or_create(recipe).boxed()).await {
                Err(AllocationError::AlreadyReserved(uuid)) if attempt < self.config.reservation_attempts => {
                    debug!("Instance {} taken by another worker, retrying ({}/{})",
                        uuid, attempt, self.config.reservation_attempts);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn wait_for_boot(&self, instance: Instance) -> Result<Instance, AllocationError> {
        let interval = Duration::from_millis(self.config.boot_poll_interval_ms);
        let mut current = instance;

        for poll in 1..=self.config.boot_poll_attempts {
            if current.is_online() {
                return Ok(current);
            }
            debug!("Instance {} is {:?}, polling ({}/{})",
                current.uuid, current.state, poll, self.config.boot_poll_attempts);
            tokio::time::sleep(interval).await;
            current = self.lookup.get_instance(&current.uuid).await?;
        }

        if current.is_online() {
            return Ok(current);
        }
        Err(AllocationError::BootTimeout {
            uuid: current.uuid,
            state: current.state,
        })
    }

    async fn adb_connect_if_needed(&self, instance: Instance) -> Result<Instance, AllocationError> {
        if instance.is_adb_connected() {
            return Ok(instance);
        }
        Ok(self.lifecycle.adb_connect_instance(&instance.uuid).await?)
    }

    async fn prepare(&self, instance: Instance) -> Result<Instance, AllocationError> {
        let instance = self.wait_for_boot(instance).await?;
        self.adb_connect_if_needed(instance).await
    }
}

#[async_trait]
impl InstanceAllocator for CloudInstanceAllocator {
    async fn allocate_device(&self, recipe: &Recipe) -> Result<Allocation, AllocationError> {
        let Allocation { instance, is_new } = self.reserve(recipe).await?;
        let uuid = instance.uuid.clone();

        match self.prepare(instance).await {
            Ok(instance) => Ok(Allocation { instance, is_new }),
            Err(e) => {
                warn!("Instance {} never became usable: {}", uuid, e);
                if let Err(release) = self.registry.dispose_device(&uuid).await {
                    warn!("Failed to release instance {}: {}", uuid, release);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudError;
    use crate::instance::InstanceState;
    use crate::naming::InstanceNaming;
    use crate::registry::LocalDeviceRegistry;
    use crate::testing::{an_instance, MockCloudClient};

    struct Fixture {
        client: Arc<MockCloudClient>,
        registry: Arc<LocalDeviceRegistry>,
        allocator: Arc<CloudInstanceAllocator>,
    }

    fn naming() -> InstanceNaming {
        InstanceNaming::new("cloudroid", "s1")
    }

    fn config() -> AllocationConfig {
        AllocationConfig {
            boot_poll_interval_ms: 1,
            boot_poll_attempts: 5,
            reservation_attempts: 3,
        }
    }

    fn fixture(client: MockCloudClient, config: AllocationConfig) -> Fixture {
        let client = Arc::new(client);
        let registry = Arc::new(LocalDeviceRegistry::new());
        let lookup = Arc::new(InstanceLookupService::new(client.clone(), naming(), registry.clone()));
        let lifecycle = Arc::new(InstanceLifecycleService::new(client.clone(), naming()));
        let allocator = Arc::new(CloudInstanceAllocator::new(registry.clone(), lookup, lifecycle, config));
        Fixture { client, registry, allocator }
    }

    fn idle_instance(uuid: &str) -> Instance {
        Instance {
            name: Some(format!("cloudroid.s1.{}", uuid)),
            recipe_uuid: Some("r1".to_string()),
            ..an_instance(uuid)
        }
    }

    fn recipe() -> Recipe {
        Recipe::new("r1", "Pixel_4")
    }

    #[tokio::test]
    async fn test_reuses_idle_instance() {
        let f = fixture(MockCloudClient::new(), config());
        f.client.add_instance(idle_instance("warm"));

        let allocation = f.allocator.allocate_device(&recipe()).await.unwrap();

        assert!(!allocation.is_new);
        assert_eq!(allocation.instance.uuid, "warm");
        assert!(f.registry.includes("warm"));
        assert!(f.client.started().is_empty());
        assert!(f.client.connected().is_empty());
    }

    #[tokio::test]
    async fn test_cold_boots_when_nothing_is_idle() {
        let f = fixture(MockCloudClient::booting_after(3), config());

        let allocation = f.allocator.allocate_device(&recipe()).await.unwrap();

        assert!(allocation.is_new);
        assert_eq!(allocation.instance.state, InstanceState::Online);
        assert!(allocation.instance.is_adb_connected());
        assert_eq!(f.client.connected(), vec![allocation.instance.uuid.clone()]);
        assert!(f.registry.includes(&allocation.instance.uuid));
    }

    #[tokio::test]
    async fn test_boot_timeout_releases_reservation() {
        let f = fixture(MockCloudClient::booting_after(u32::MAX), config());

        let err = f.allocator.allocate_device(&recipe()).await.unwrap_err();

        assert!(matches!(err, AllocationError::BootTimeout { state: InstanceState::Creating, .. }));
        assert!(f.registry.reserved().is_empty());
    }

    #[tokio::test]
    async fn test_cloud_failure_is_propagated() {
        let f = fixture(MockCloudClient::new(), config());
        f.client.fail_with(CloudError::Request("503".to_string()));

        let err = f.allocator.allocate_device(&recipe()).await.unwrap_err();
        assert_eq!(err, AllocationError::Cloud(CloudError::Request("503".to_string())));
    }

    /// Registry where another worker grabs the first instance we look up
    struct RacingRegistry {
        inner: LocalDeviceRegistry,
        raced: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl DeviceRegistry for RacingRegistry {
        async fn allocate_device(
            &self,
            allocate: crate::registry::AllocationFuture<'_>,
        ) -> Result<Allocation, AllocationError> {
            let allocation = allocate.await?;
            if !self.raced.swap(true, std::sync::atomic::Ordering::SeqCst) {
                let stolen = allocation.clone();
                self.inner.allocate_device(async move { Ok(stolen) }.boxed()).await?;
            }
            self.inner.allocate_device(async move { Ok(allocation) }.boxed()).await
        }

        async fn dispose_device(&self, device_id: &str) -> Result<(), AllocationError> {
            self.inner.dispose_device(device_id).await
        }

        fn includes(&self, device_id: &str) -> bool {
            self.inner.includes(device_id)
        }
    }

    #[tokio::test]
    async fn test_lost_race_retries_lookup() {
        let client = Arc::new(MockCloudClient::new());
        client.add_instance(idle_instance("warm"));
        let registry = Arc::new(RacingRegistry {
            inner: LocalDeviceRegistry::new(),
            raced: std::sync::atomic::AtomicBool::new(false),
        });
        let lookup = Arc::new(InstanceLookupService::new(client.clone(), naming(), registry.clone()));
        let lifecycle = Arc::new(InstanceLifecycleService::new(client.clone(), naming()));
        let allocator = CloudInstanceAllocator::new(registry.clone(), lookup, lifecycle, config());

        let allocation = allocator.allocate_device(&recipe()).await.unwrap();

        assert!(allocation.is_new);
        assert_ne!(allocation.instance.uuid, "warm");
        assert!(registry.includes("warm"));
        assert!(registry.includes(&allocation.instance.uuid));
    }

    #[tokio::test]
    async fn test_reservation_attempts_are_bounded() {
        let client = Arc::new(MockCloudClient::new());
        client.add_instance(idle_instance("warm"));
        let registry = Arc::new(RacingRegistry {
            inner: LocalDeviceRegistry::new(),
            raced: std::sync::atomic::AtomicBool::new(false),
        });
        let lookup = Arc::new(InstanceLookupService::new(client.clone(), naming(), registry.clone()));
        let lifecycle = Arc::new(InstanceLifecycleService::new(client.clone(), naming()));
        let single_attempt = AllocationConfig { reservation_attempts: 1, ..config() };
        let allocator = CloudInstanceAllocator::new(registry, lookup, lifecycle, single_attempt);

        let err = allocator.allocate_device(&recipe()).await.unwrap_err();
        assert_eq!(err, AllocationError::AlreadyReserved("warm".to_string()));
        assert!(client.started().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_workers_never_share_an_instance() {
        let f = fixture(MockCloudClient::new(), config());
        f.client.add_instance(idle_instance("warm"));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let allocator = f.allocator.clone();
                tokio::spawn(async move { allocator.allocate_device(&recipe()).await })
            })
            .collect();

        let mut uuids = Vec::new();
        for task in tasks {
            uuids.push(task.await.unwrap().unwrap().instance.uuid);
        }

        let reused = uuids.iter().filter(|uuid| uuid.as_str() == "warm").count();
        assert_eq!(reused, 1);

        uuids.sort();
        uuids.dedup();
        assert_eq!(uuids.len(), 4);
        assert_eq!(f.registry.reserved().len(), 4);
    }
}
