//! Cloudroid Emulator Bridge
//!
//! ADB-side collaborators used once an emulator instance is allocated:
//! the connection tool, the app install helper and instrumentation control.

pub mod adb;
pub mod install;
pub mod instrumentation;

pub use adb::{AdbClient, AdbError, ConnectionTool, InstallOptions};
pub use install::{AppInstallHelper, InstallHelper};
pub use instrumentation::{InstrumentationController, MonitoredInstrumentation};
