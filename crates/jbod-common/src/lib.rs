//! jbod-net Common - Shared types and utilities
//!
//! This crate provides the disk-array geometry, configuration structures and
//! error definitions used across all jbod-net components.

pub mod config;
pub mod error;
pub mod layout;

pub use config::{CacheConfig, ClientConfig, LoggingConfig, RemoteConfig, ServerConfig};
pub use error::{Error, Result};
pub use layout::*;
