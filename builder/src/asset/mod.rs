//! Asset staging.
//!
//! Assets are local files or directory trees placed at a given path inside
//! the image rootfs. Each asset option is resolved and validated first, then
//! copied with symlink containment enforced.

pub mod copy;
pub mod spec;
pub mod symlink;

pub use copy::{copy_tree, CopyOptions, CopyStats};
pub use spec::{resolve_asset, AssetSpec, PlaceholderMap};
pub use symlink::{normalize_path, translate_symlink};

use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use a3s_aci_core::error::{AciError, Result};

/// Map an absolute image path onto the staging rootfs.
///
/// The image path is normalized first, so the result never leaves `rootfs`.
pub fn rootfs_path(rootfs: &Path, image_path: &Path) -> PathBuf {
    let normalized = normalize_path(image_path);
    let relative = normalized.strip_prefix("/").unwrap_or(normalized.as_path());
    rootfs.join(relative)
}

/// Resolve one asset option and copy it into `rootfs`.
///
/// Parent directories of the destination are created with mode 0755.
pub fn stage_asset(
    option: &str,
    rootfs: &Path,
    placeholders: &PlaceholderMap,
    separator: char,
    options: &CopyOptions,
) -> Result<CopyStats> {
    let asset = resolve_asset(option, placeholders, separator)?;

    let destination = rootfs_path(rootfs, &asset.destination);
    if let Some(parent) = destination.parent() {
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(parent)
            .map_err(|e| {
                AciError::io(
                    format!("Failed to create directory tree for asset '{}'", option),
                    e,
                )
            })?;
    }

    let stats = copy_tree(&asset.source, &destination, &asset.destination, options)?;

    tracing::info!(
        asset = %asset.destination.display(),
        source = %asset.source.display(),
        files = stats.files,
        directories = stats.directories,
        symlinks = stats.symlinks,
        "Staged asset"
    );

    Ok(stats)
}
