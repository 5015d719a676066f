//! Instrumentation process control
//!
//! Test runs drive the app through an `am instrument` session. The session is
//! a child `adb` process; leaking it corrupts later runs on the same instance,
//! so termination is explicit and errors are reported.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::adb::{AdbClient, AdbError};

/// Controls the lifetime of an instrumentation session
#[async_trait]
pub trait InstrumentationController: Send + Sync {
    /// Start instrumenting `runner` on `serial`, replacing any running session
    async fn launch(&self, serial: &str, runner: &str, user_args: &[(String, String)]) -> Result<(), AdbError>;

    /// Stop the running session, if any
    async fn terminate(&self) -> Result<(), AdbError>;
}

/// Instrumentation launched as a monitored `adb shell am instrument` child
pub struct MonitoredInstrumentation {
    adb: Arc<AdbClient>,
    process: Mutex<Option<Child>>,
}

impl MonitoredInstrumentation {
    pub fn new(adb: Arc<AdbClient>) -> Self {
        Self {
            adb,
            process: Mutex::new(None),
        }
    }

    /// Arguments for `adb shell` that start instrumentation of `runner`
    pub fn instrument_args<'a>(runner: &'a str, user_args: &'a [(String, String)]) -> Vec<&'a str> {
        let mut args = vec!["shell", "am", "instrument", "-w", "-r"];
        for (key, value) in user_args {
            args.push("-e");
            args.push(key);
            args.push(value);
        }
        args.push(runner);
        args
    }

    /// Whether a launched session is still alive
    pub async fn is_running(&self) -> bool {
        let mut process = self.process.lock().await;
        match process.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

#[async_trait]
impl InstrumentationController for MonitoredInstrumentation {
    async fn launch(&self, serial: &str, runner: &str, user_args: &[(String, String)]) -> Result<(), AdbError> {
        self.terminate().await?;

        let args = Self::instrument_args(runner, user_args);
        let child = self.adb.spawn_for_device(serial, &args)?;
        info!("Instrumentation {} launched on {}", runner, serial);

        *self.process.lock().await = Some(child);
        Ok(())
    }

    async fn terminate(&self) -> Result<(), AdbError> {
        let Some(mut child) = self.process.lock().await.take() else {
            debug!("No instrumentation session to terminate");
            return Ok(());
        };

        if child.try_wait()?.is_none() {
            child.kill().await?;
            info!("Instrumentation session terminated");
        }
        Ok(())
    }
}
