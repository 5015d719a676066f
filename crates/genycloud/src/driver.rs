//! Genymotion Cloud allocation driver
//!
//! Brokers one cloud emulator for one test worker:
//! - resolve the device query to a recipe
//! - allocate (reuse or cold boot) an instance through the registry
//! - announce the boot, probe the API level, turn animations off
//! - run instrumentation for the test session
//! - release the reservation and stop instrumentation on cleanup

use std::path::Path;
use std::sync::Arc;

use cloudroid_core::{DeviceEvent, EventEmitter, PathResolver};
use cloudroid_emulator_bridge::{ConnectionTool, InstallHelper, InstrumentationController};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::allocator::InstanceAllocator;
use crate::error::{AllocationError, DriverError, Result};
use crate::instance::{Allocation, DeviceHandle, Instance};
use crate::query::RecipeResolver;
use crate::recipe::{DeviceQuery, Recipe};
use crate::registry::DeviceRegistry;
use crate::services::InstanceLifecycleService;
use crate::UNBOUND_DRIVER_NAME;

/// What the driver is currently bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    /// No instance acquired yet
    Unbound,
    /// An instance was acquired and prepared
    Bound {
        instance: Instance,
        recipe_name: String,
        api_level: u32,
    },
}

impl DriverState {
    /// Operator-facing device name
    pub fn name(&self) -> String {
        match self {
            DriverState::Unbound => UNBOUND_DRIVER_NAME.to_string(),
            DriverState::Bound { instance, .. } => instance.to_string(),
        }
    }
}

/// Collaborators the driver is built from
pub struct GenyCloudDriverDeps {
    pub recipes: Arc<dyn RecipeResolver>,
    pub allocator: Arc<dyn InstanceAllocator>,
    pub registry: Arc<dyn DeviceRegistry>,
    pub lifecycle: Arc<InstanceLifecycleService>,
    pub emitter: Arc<dyn EventEmitter>,
    pub adb: Arc<dyn ConnectionTool>,
    pub installer: Arc<dyn InstallHelper>,
    pub instrumentation: Arc<dyn InstrumentationController>,
    pub paths: Arc<dyn PathResolver>,
}

pub struct GenyCloudDriver {
    deps: GenyCloudDriverDeps,
    state: RwLock<DriverState>,
    // Held for the whole of an acquisition
    acquiring: Mutex<()>,
}

impl GenyCloudDriver {
    pub fn new(deps: GenyCloudDriverDeps) -> Self {
        Self {
            deps,
            state: RwLock::new(DriverState::Unbound),
            acquiring: Mutex::new(()),
        }
    }

    pub fn name(&self) -> String {
        self.state.read().name()
    }

    pub fn state(&self) -> DriverState {
        self.state.read().clone()
    }

    /// API level of the bound instance
    pub fn api_level(&self) -> Option<u32> {
        match &*self.state.read() {
            DriverState::Bound { api_level, .. } => Some(*api_level),
            DriverState::Unbound => None,
        }
    }

    /// Resolve `query`, allocate an instance and make it ready for tests.
    ///
    /// Nothing is committed to the driver state unless every step succeeds.
    /// A reservation taken for an instance that then fails preparation is
    /// released before the error is returned. Overlapping calls on one driver
    /// run one at a time, so at most one of them binds an instance.
    pub async fn acquire_free_device(&self, query: &DeviceQuery) -> Result<DeviceHandle> {
        let _acquiring = self.acquiring.lock().await;
        if matches!(*self.state.read(), DriverState::Bound { .. }) {
            return Err(DriverError::AlreadyBound { name: self.name() });
        }

        let recipe = self
            .deps
            .recipes
            .get_recipe_from_query(query)
            .await
            .map_err(AllocationError::from)?
            .ok_or_else(|| DriverError::RecipeNotFound { query: query.to_string() })?;
        info!("Resolved {} to {}", query, recipe);

        let Allocation { instance, is_new } = self.deps.allocator.allocate_device(&recipe).await?;
        info!("Allocated {} (cold boot: {})", instance, is_new);

        let api_level = match self.prepare(&recipe, &instance, is_new).await {
            Ok(api_level) => api_level,
            Err(e) => {
                self.release_after_failure(&instance, &e).await;
                return Err(e);
            }
        };

        let handle = instance.handle();
        *self.state.write() = DriverState::Bound {
            instance,
            recipe_name: recipe.name,
            api_level,
        };
        Ok(handle)
    }

    async fn prepare(&self, recipe: &Recipe, instance: &Instance, is_new: bool) -> Result<u32> {
        self.deps
            .emitter
            .emit(&DeviceEvent::BootDevice {
                device_id: instance.adb_name.clone(),
                device_type: recipe.name.clone(),
                cold_boot: is_new,
            })
            .await?;

        let api_level = self.deps.adb.api_level(&instance.adb_name).await?;
        debug!("{} runs API level {}", instance.adb_name, api_level);

        self.deps.adb.disable_animations(&instance.adb_name).await?;
        Ok(api_level)
    }

    async fn release_after_failure(&self, instance: &Instance, cause: &DriverError) {
        warn!("Preparing {} failed, releasing it: {}", instance, cause);
        self.deps.adb.forget_device(&instance.adb_name);
        if let Err(e) = self.deps.registry.dispose_device(&instance.uuid).await {
            warn!("Failed to release {}: {}", instance.uuid, e);
        }
    }

    /// Install the app and its test binary on `device`
    pub async fn install_app(&self, device: &Instance, app_binary: &Path, test_binary: &Path) -> Result<()> {
        let app_binary = self.deps.paths.resolve_absolute_path(app_binary)?;
        let test_binary = self.deps.paths.resolve_absolute_path(test_binary)?;
        self.deps
            .installer
            .install(&device.adb_name, &app_binary, &test_binary)
            .await?;
        Ok(())
    }

    /// Remove the app and its test binary from `device`
    pub async fn uninstall_app(&self, device: &Instance, bundle_id: &str) -> Result<()> {
        self.deps.installer.uninstall(&device.adb_name, bundle_id).await?;
        Ok(())
    }

    /// Start the test runner's instrumentation on `device`.
    ///
    /// The session stays alive until [`cleanup`](Self::cleanup) terminates it.
    pub async fn launch_instrumentation(
        &self,
        device: &Instance,
        runner: &str,
        user_args: &[(String, String)],
    ) -> Result<()> {
        self.deps
            .instrumentation
            .launch(&device.adb_name, runner, user_args)
            .await?;
        Ok(())
    }

    /// Release the reservation on `instance` and stop instrumentation.
    ///
    /// Both steps always run; the first failure is returned.
    pub async fn cleanup(&self, instance: &Instance, bundle_id: &str) -> Result<()> {
        debug!("Cleaning up {} after {}", instance.uuid, bundle_id);
        self.deps.adb.forget_device(&instance.adb_name);
        let disposed = self.deps.registry.dispose_device(&instance.uuid).await;
        let terminated = self.deps.instrumentation.terminate().await;

        disposed?;
        terminated?;
        Ok(())
    }

    /// Delete the cloud instance behind `instance`
    pub async fn shutdown(&self, instance: &Instance) -> Result<()> {
        self.deps
            .emitter
            .emit(&DeviceEvent::BeforeShutdownDevice { device_id: instance.adb_name.clone() })
            .await?;

        self.deps
            .lifecycle
            .delete_instance(&instance.uuid)
            .await
            .map_err(AllocationError::from)?;
        self.deps.adb.forget_device(&instance.adb_name);
        info!("Shut down {}", instance);

        self.deps
            .emitter
            .emit(&DeviceEvent::ShutdownDevice { device_id: instance.adb_name.clone() })
            .await?;
        Ok(())
    }
}
