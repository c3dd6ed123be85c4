//! A3S ACI Core - Foundational Types
//!
//! Error and configuration types shared by the image builder and the CLI.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{BuildConfig, LogLevel, DEBUG_ENV, PATH_LIST_SEPARATOR};
pub use error::{AciError, Result};

/// A3S ACI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
