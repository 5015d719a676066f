//! Instance lookup and lifecycle services over the cloud client

use std::sync::Arc;

use tracing::{debug, info};

use crate::client::CloudClient;
use crate::error::CloudError;
use crate::instance::Instance;
use crate::naming::InstanceNaming;
use crate::registry::DeviceRegistry;

/// Finds instances this session may use
pub struct InstanceLookupService {
    client: Arc<dyn CloudClient>,
    naming: InstanceNaming,
    registry: Arc<dyn DeviceRegistry>,
}

impl InstanceLookupService {
    pub fn new(
        client: Arc<dyn CloudClient>,
        naming: InstanceNaming,
        registry: Arc<dyn DeviceRegistry>,
    ) -> Self {
        Self { client, naming, registry }
    }

    /// An instance of `recipe_uuid` started by this session, still alive and
    /// not held by any worker
    pub async fn find_free_instance(&self, recipe_uuid: &str) -> Result<Option<Instance>, CloudError> {
        let instances = self.client.instances().await?;
        let free = instances.into_iter().find(|instance| {
            instance.recipe_uuid.as_deref() == Some(recipe_uuid)
                && instance.name.as_deref().map_or(false, |name| self.naming.is_family_member(name))
                && !instance.is_terminated()
                && !self.registry.includes(&instance.uuid)
        });

        match &free {
            Some(instance) => debug!("Found free instance {} for recipe {}", instance.uuid, recipe_uuid),
            None => debug!("No free instance for recipe {}", recipe_uuid),
        }
        Ok(free)
    }

    pub async fn get_instance(&self, uuid: &str) -> Result<Instance, CloudError> {
        self.client.instance(uuid).await
    }
}

/// Creates, connects and deletes instances
pub struct InstanceLifecycleService {
    client: Arc<dyn CloudClient>,
    naming: InstanceNaming,
}

impl InstanceLifecycleService {
    pub fn new(client: Arc<dyn CloudClient>, naming: InstanceNaming) -> Self {
        Self { client, naming }
    }

    /// Start a new family instance from a recipe
    pub async fn create_instance(&self, recipe_uuid: &str) -> Result<Instance, CloudError> {
        let name = self.naming.generate_name();
        info!("Starting instance {} from recipe {}", name, recipe_uuid);
        self.client.start_instance(recipe_uuid, &name).await
    }

    pub async fn adb_connect_instance(&self, uuid: &str) -> Result<Instance, CloudError> {
        info!("Connecting adb to instance {}", uuid);
        self.client.adb_connect(uuid).await
    }

    pub async fn delete_instance(&self, uuid: &str) -> Result<Instance, CloudError> {
        info!("Deleting instance {}", uuid);
        self.client.stop_instance(uuid).await
    }
}
