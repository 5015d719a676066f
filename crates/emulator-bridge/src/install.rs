//! App install and uninstall helpers

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::adb::{AdbClient, AdbError, InstallOptions};

/// Installs and removes the app under test and its test binary
#[async_trait]
pub trait InstallHelper: Send + Sync {
    /// Install the app binary, then the test binary
    async fn install(&self, serial: &str, app_binary: &Path, test_binary: &Path) -> Result<(), AdbError>;

    /// Remove the app and its test package
    async fn uninstall(&self, serial: &str, bundle_id: &str) -> Result<(), AdbError>;
}

/// Install helper backed by `adb install`
pub struct AppInstallHelper {
    adb: Arc<AdbClient>,
    options: InstallOptions,
}

impl AppInstallHelper {
    pub fn new(adb: Arc<AdbClient>) -> Self {
        Self {
            adb,
            options: InstallOptions::for_testing(),
        }
    }

    /// Package name of the instrumentation APK for `bundle_id`
    pub fn test_package(bundle_id: &str) -> String {
        format!("{}.test", bundle_id)
    }
}

#[async_trait]
impl InstallHelper for AppInstallHelper {
    async fn install(&self, serial: &str, app_binary: &Path, test_binary: &Path) -> Result<(), AdbError> {
        info!("Installing {:?} on {}", app_binary, serial);
        self.adb.install_with_options(serial, app_binary, &self.options).await?;

        info!("Installing {:?} on {}", test_binary, serial);
        self.adb.install_with_options(serial, test_binary, &self.options).await?;
        Ok(())
    }

    async fn uninstall(&self, serial: &str, bundle_id: &str) -> Result<(), AdbError> {
        for package in [bundle_id.to_string(), Self::test_package(bundle_id)] {
            if self.adb.is_package_installed(serial, &package).await? {
                info!("Uninstalling {} from {}", package, serial);
                self.adb.uninstall(serial, &package).await?;
            } else {
                debug!("{} not installed on {}, skipping", package, serial);
            }
        }
        Ok(())
    }
}
