//! A3S ACI Builder - image staging and packaging.
//!
//! Stages a binary and its assets into an image rootfs and serializes the
//! result into an App Container Image (`.aci`, gzip-compressed tar).
//!
//! - [`asset`]: asset option parsing, tree copy, symlink containment
//! - [`archive`]: hardlink-aware archive walk and tar output
//! - [`stage`]: end-to-end image staging

pub mod archive;
pub mod asset;
pub mod binary;
pub mod command;
pub mod manifest;
pub mod stage;

// Re-export common types
pub use archive::{build_archive, EntryHeader, EntryKind, EntrySink, InodeRegistry, TarSink};
pub use asset::{copy_tree, resolve_asset, translate_symlink, AssetSpec, PlaceholderMap};
pub use binary::select_binary;
pub use command::run_command;
pub use manifest::{ImageManifest, MANIFEST_ENTRY};
pub use stage::{ImageStager, StagedImage};

/// A3S ACI Builder version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
