use std::path::PathBuf;

use thiserror::Error;

/// A3S ACI error types
#[derive(Error, Debug)]
pub enum AciError {
    /// Asset option did not split into exactly two paths
    #[error("Malformed asset option: '{spec}' - expected two absolute paths separated with '{separator}'")]
    MalformedAssetSpec { spec: String, separator: char },

    /// Asset paths failed validation
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    /// Symlink inside an asset resolves to a node outside of it
    #[error("Symlink {} points to {}, which is outside asset {}", path.display(), target.display(), root.display())]
    SymlinkEscapesAsset {
        path: PathBuf,
        target: PathBuf,
        root: PathBuf,
    },

    /// Asset tree contains a device, socket or fifo
    #[error("Unsupported node {} ({kind}) in asset, only regular files, directories and symlinks are supported", path.display())]
    UnsupportedNodeType { path: PathBuf, kind: String },

    /// Underlying filesystem operation failed
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Archive stream could not be written
    #[error("Archive write failed: {context}: {source}")]
    ArchiveWriteFailure {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// No usable binary in the build output directory
    #[error("Binary not found: {0}")]
    BinaryNotFound(String),

    /// External program is missing
    #[error("Command not found: {program}")]
    CommandNotFound { program: String },

    /// External program exited unsuccessfully
    #[error("Command failed (exit {code}): {command}")]
    CommandFailed { command: String, code: i32 },

    /// Image name does not satisfy ACI naming rules
    #[error("Invalid image name '{0}'")]
    InvalidName(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl AciError {
    /// Wrap an I/O error with a description of the failed operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        AciError::Io {
            context: context.into(),
            source,
        }
    }

    /// Wrap an I/O error raised while producing the archive.
    pub fn archive(context: impl Into<String>, source: std::io::Error) -> Self {
        AciError::ArchiveWriteFailure {
            context: context.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for AciError {
    fn from(err: serde_json::Error) -> Self {
        AciError::SerializationError(err.to_string())
    }
}

/// Result type alias for A3S ACI operations
pub type Result<T> = std::result::Result<T, AciError>;
