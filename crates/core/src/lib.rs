//! Cloudroid Core - Shared configuration, events and utilities
//!
//! This crate provides the pieces every other Cloudroid crate leans on:
//! configuration loading, the device lifecycle event channel, binary path
//! resolution and the shared error type.

pub mod config;
pub mod events;
pub mod error;
pub mod paths;

pub use config::{FarmConfig, AllocationConfig, LoggingConfig, NamingConfig};
pub use events::{DeviceEvent, EventBus, EventEmitter, EventError, EventListener};
pub use error::{CoreError, Result};
pub use paths::{AbsolutePathResolver, PathError, PathResolver};

/// Cloudroid version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Cloudroid";
