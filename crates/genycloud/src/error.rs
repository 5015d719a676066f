//! Error types for the Genymotion Cloud driver

use cloudroid_core::{EventError, PathError};
use cloudroid_emulator_bridge::AdbError;
use thiserror::Error;

use crate::PROVIDER_NAME;

/// Failures reported by the cloud service client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloudError {
    #[error("Cloud request failed: {0}")]
    Request(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Unexpected cloud response: {0}")]
    InvalidResponse(String),
}

/// Failures while obtaining or reserving an instance
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("Instance {0} is already reserved by another worker")]
    AlreadyReserved(String),

    #[error("Timeout waiting for instance {uuid} to be ready (last state: {state:?})")]
    BootTimeout { uuid: String, state: crate::InstanceState },

    #[error("Registry error: {0}")]
    Registry(String),
}

/// Errors surfaced by the allocation driver
#[derive(Error, Debug)]
pub enum DriverError {
    #[error(
        "No {provider} devices found for recipe!\nHINT: Check that your {provider} account has a template associated with your device configuration: {query}",
        provider = PROVIDER_NAME
    )]
    RecipeNotFound { query: String },

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Notification(#[from] EventError),

    #[error(transparent)]
    ConnectionTool(#[from] AdbError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Driver is already bound to {name}; use a new driver for another device")]
    AlreadyBound { name: String },
}

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, DriverError>;
