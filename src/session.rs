//! Test session wiring
//!
//! One [`DriverFactory`] per test run: every worker gets its own driver, and
//! all drivers share the registry, the instance naming family and the ADB
//! client.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use cloudroid_core::{AbsolutePathResolver, EventEmitter, FarmConfig};
use cloudroid_emulator_bridge::{AdbClient, AppInstallHelper, MonitoredInstrumentation};
use cloudroid_genycloud::{
    CloudClient, CloudInstanceAllocator, CloudRecipeResolver, DeviceRegistry, GenyCloudDriver,
    GenyCloudDriverDeps, InstanceLifecycleService, InstanceLookupService, InstanceNaming,
};

/// Builds drivers that share one registry and one instance family
pub struct DriverFactory {
    config: FarmConfig,
    client: Arc<dyn CloudClient>,
    registry: Arc<dyn DeviceRegistry>,
    emitter: Arc<dyn EventEmitter>,
    naming: InstanceNaming,
    adb: Arc<AdbClient>,
}

impl DriverFactory {
    /// Validate the configuration and locate the Android SDK
    pub fn new(
        config: FarmConfig,
        client: Arc<dyn CloudClient>,
        registry: Arc<dyn DeviceRegistry>,
        emitter: Arc<dyn EventEmitter>,
    ) -> Result<Self> {
        config.validate().context("invalid configuration")?;
        let sdk_path = config
            .get_sdk_path()
            .context("Android SDK not found; set android.sdk_path or ANDROID_HOME")?;

        let naming = InstanceNaming::from_config(&config.naming);
        info!("Session {} using SDK at {:?}", naming.session_id(), sdk_path);

        Ok(Self {
            adb: Arc::new(AdbClient::new(sdk_path)),
            naming,
            config,
            client,
            registry,
            emitter,
        })
    }

    /// Session id shared by every instance name this factory produces
    pub fn session_id(&self) -> &str {
        self.naming.session_id()
    }

    /// A fresh, unbound driver for one worker
    pub fn create_driver(&self) -> GenyCloudDriver {
        let lookup = Arc::new(InstanceLookupService::new(
            self.client.clone(),
            self.naming.clone(),
            self.registry.clone(),
        ));
        let lifecycle = Arc::new(InstanceLifecycleService::new(self.client.clone(), self.naming.clone()));
        let allocator = Arc::new(CloudInstanceAllocator::new(
            self.registry.clone(),
            lookup,
            lifecycle.clone(),
            self.config.allocation.clone(),
        ));

        GenyCloudDriver::new(GenyCloudDriverDeps {
            recipes: Arc::new(CloudRecipeResolver::new(self.client.clone())),
            allocator,
            registry: self.registry.clone(),
            lifecycle,
            emitter: self.emitter.clone(),
            adb: self.adb.clone(),
            installer: Arc::new(AppInstallHelper::new(self.adb.clone())),
            instrumentation: Arc::new(MonitoredInstrumentation::new(self.adb.clone())),
            paths: Arc::new(AbsolutePathResolver::new()),
        })
    }
}
