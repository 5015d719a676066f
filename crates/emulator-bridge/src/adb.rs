//! ADB (Android Debug Bridge) Client
//!
//! Communicates with allocated instances via ADB.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tracing::debug;

/// ADB errors
#[derive(Debug, thiserror::Error)]
pub enum AdbError {
    #[error("ADB not found at {0}")]
    NotFound(PathBuf),
    #[error("ADB command failed: {0}")]
    CommandFailed(String),
    #[error("Invalid API level reported by {serial}: {raw:?}")]
    InvalidApiLevel { serial: String, raw: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Global settings toggled to turn platform animations off
pub const ANIMATION_SCALE_SETTINGS: [&str; 3] = [
    "animator_duration_scale",
    "window_animation_scale",
    "transition_animation_scale",
];

/// Commands the allocation driver runs against a freshly allocated instance
#[async_trait]
pub trait ConnectionTool: Send + Sync {
    /// Platform API level of the device behind `serial`
    async fn api_level(&self, serial: &str) -> Result<u32, AdbError>;

    /// Turn platform animations off so UI automation is deterministic
    async fn disable_animations(&self, serial: &str) -> Result<(), AdbError>;

    /// Drop anything remembered about `serial`; tunnel serials are reused across instances
    fn forget_device(&self, serial: &str);
}

/// ADB Client
pub struct AdbClient {
    adb_path: PathBuf,
    api_levels: Mutex<HashMap<String, u32>>,
}

impl AdbClient {
    /// Create a new ADB client from an SDK root
    pub fn new(sdk_path: PathBuf) -> Self {
        let platform_tools = sdk_path.join("platform-tools");
        let adb_path = if cfg!(windows) {
            platform_tools.join("adb.exe")
        } else {
            platform_tools.join("adb")
        };
        Self::with_executable(adb_path)
    }

    /// Create a client around an explicit `adb` executable
    pub fn with_executable(adb_path: PathBuf) -> Self {
        Self {
            adb_path,
            api_levels: Mutex::new(HashMap::new()),
        }
    }

    /// Get the ADB executable path
    pub fn adb_path(&self) -> &Path {
        &self.adb_path
    }

    /// Check if ADB is available
    pub fn is_available(&self) -> bool {
        self.adb_path.exists()
    }

    /// Run an ADB command
    async fn run(&self, args: &[&str]) -> Result<String, AdbError> {
        if !self.is_available() {
            return Err(AdbError::NotFound(self.adb_path.clone()));
        }

        debug!("adb {:?}", args);

        let output = Command::new(&self.adb_path)
            .args(args)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AdbError::CommandFailed(stderr.to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run an ADB command for a specific device
    async fn run_for_device(&self, serial: &str, args: &[&str]) -> Result<String, AdbError> {
        let mut full_args = vec!["-s", serial];
        full_args.extend(args);
        self.run(&full_args).await
    }

    /// Spawn a long-running ADB command for a specific device
    pub fn spawn_for_device(&self, serial: &str, args: &[&str]) -> Result<Child, AdbError> {
        if !self.is_available() {
            return Err(AdbError::NotFound(self.adb_path.clone()));
        }

        debug!("adb -s {} {:?} (spawned)", serial, args);

        let child = Command::new(&self.adb_path)
            .arg("-s")
            .arg(serial)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        Ok(child)
    }

    /// Run a shell command on device
    pub async fn shell(&self, serial: &str, command: &str) -> Result<String, AdbError> {
        self.run_for_device(serial, &["shell", command]).await
    }

    /// Install an APK with additional options
    pub async fn install_with_options(
        &self,
        serial: &str,
        apk_path: &Path,
        options: &InstallOptions,
    ) -> Result<(), AdbError> {
        let path_str = apk_path.to_string_lossy();
        let mut args = vec!["install"];
        args.extend(options.to_args());
        args.push(&path_str);

        self.run_for_device(serial, &args).await?;
        Ok(())
    }

    /// Uninstall a package
    pub async fn uninstall(&self, serial: &str, package: &str) -> Result<(), AdbError> {
        self.run_for_device(serial, &["uninstall", package]).await?;
        Ok(())
    }

    /// Check whether a package is installed
    pub async fn is_package_installed(&self, serial: &str, package: &str) -> Result<bool, AdbError> {
        let output = self.shell(serial, &format!("pm list packages {}", package)).await?;
        let expected = format!("package:{}", package);
        Ok(output.lines().any(|line| line.trim() == expected))
    }

    /// Get device property
    pub async fn get_prop(&self, serial: &str, prop: &str) -> Result<String, AdbError> {
        let output = self.shell(serial, &format!("getprop {}", prop)).await?;
        Ok(output.trim().to_string())
    }

    /// Get SDK version
    pub async fn get_sdk_version(&self, serial: &str) -> Result<u32, AdbError> {
        let version = self.get_prop(serial, "ro.build.version.sdk").await?;
        parse_api_level(serial, &version)
    }

    /// Force stop a package
    pub async fn force_stop(&self, serial: &str, package: &str) -> Result<(), AdbError> {
        self.shell(serial, &format!("am force-stop {}", package)).await?;
        Ok(())
    }
}

#[async_trait]
impl ConnectionTool for AdbClient {
    async fn api_level(&self, serial: &str) -> Result<u32, AdbError> {
        if let Some(level) = self.api_levels.lock().get(serial).copied() {
            return Ok(level);
        }

        let level = self.get_sdk_version(serial).await?;
        self.api_levels.lock().insert(serial.to_string(), level);
        Ok(level)
    }

    async fn disable_animations(&self, serial: &str) -> Result<(), AdbError> {
        for setting in ANIMATION_SCALE_SETTINGS {
            self.shell(serial, &format!("settings put global {} 0", setting)).await?;
        }
        Ok(())
    }

    fn forget_device(&self, serial: &str) {
        if self.api_levels.lock().remove(serial).is_some() {
            debug!("Forgot cached API level of {}", serial);
        }
    }
}

/// Parse the output of `getprop ro.build.version.sdk`
pub fn parse_api_level(serial: &str, raw: &str) -> Result<u32, AdbError> {
    raw.trim().parse().map_err(|_| AdbError::InvalidApiLevel {
        serial: serial.to_string(),
        raw: raw.to_string(),
    })
}

/// APK install options
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Replace existing app
    pub replace: bool,
    /// Allow version downgrade
    pub allow_downgrade: bool,
    /// Grant all permissions
    pub grant_permissions: bool,
    /// Allow test-only packages
    pub allow_test_packages: bool,
}

impl InstallOptions {
    /// Options used for app and test binaries under test
    pub fn for_testing() -> Self {
        Self {
            replace: true,
            grant_permissions: true,
            allow_test_packages: true,
            ..Default::default()
        }
    }

    /// Convert to command line flags
    pub fn to_args(&self) -> Vec<&'static str> {
        let mut args = Vec::new();

        if self.replace {
            args.push("-r");
        }
        if self.allow_downgrade {
            args.push("-d");
        }
        if self.grant_permissions {
            args.push("-g");
        }
        if self.allow_test_packages {
            args.push("-t");
        }

        args
    }
}
