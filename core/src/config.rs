use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Separator between the image path and the local path of an asset option.
#[cfg(windows)]
pub const PATH_LIST_SEPARATOR: char = ';';

/// Separator between the image path and the local path of an asset option.
#[cfg(not(windows))]
pub const PATH_LIST_SEPARATOR: char = ':';

/// Environment variable that turns on debug output.
pub const DEBUG_ENV: &str = "A3S_ACI_DEBUG";

/// Image build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// ACI image name (e.g. "example.com/app")
    pub name: String,

    /// Exec arguments; defaults to the installed binary
    pub exec: Vec<String>,

    /// User the app runs as
    pub user: String,

    /// Group the app runs as
    pub group: String,

    /// Asset options in `<image path><sep><local path>` form
    pub assets: Vec<String>,

    /// Output archive path
    pub output: PathBuf,

    /// Binary to pick when the build produced several
    pub use_binary: Option<String>,

    /// Extra manifest labels
    pub labels: BTreeMap<String, String>,

    /// Emit per-node debug events
    pub debug: bool,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            exec: Vec::new(),
            user: "0".to_string(),
            group: "0".to_string(),
            assets: Vec::new(),
            output: PathBuf::from("image.aci"),
            use_binary: None,
            labels: BTreeMap::new(),
            debug: false,
            log_level: LogLevel::Warn,
        }
    }
}

impl BuildConfig {
    /// Turn on debug output, raising the log level accordingly.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        if debug {
            self.log_level = LogLevel::Debug;
        }
        self
    }

    /// Whether debug output was requested through the environment.
    pub fn debug_from_env() -> bool {
        std::env::var_os(DEBUG_ENV).is_some_and(|v| !v.is_empty())
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string for an `EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
