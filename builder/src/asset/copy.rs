//! Recursive asset tree copy.
//!
//! Mirrors a local directory (or single file) into the staging rootfs,
//! preserving permission bits and rewriting symlinks through
//! [`translate_symlink`]. The copy is fail-fast: the first error aborts the
//! whole asset.

use std::fs::{self, File, Permissions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, FileTypeExt, PermissionsExt};
use std::path::{Path, PathBuf};

use a3s_aci_core::error::{AciError, Result};
use walkdir::WalkDir;

use super::symlink::translate_symlink;

/// Options for a tree copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOptions {
    /// Emit a debug event for every copied node
    pub debug: bool,
}

/// Counters collected while copying one asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub directories: usize,
    pub files: usize,
    pub symlinks: usize,
    /// Bytes of regular file content copied
    pub bytes: u64,
}

/// Copy `source_root` to `destination_root`.
///
/// `asset_path` is the absolute path the asset will have inside the image;
/// it only affects how absolute symlink targets are rewritten.
///
/// `destination_root` must not exist yet, its parent must.
///
/// `source_root` is not dereferenced. If it is itself a symlink to a
/// directory elsewhere, the root entry is treated as a symlink and fails with
/// [`AciError::SymlinkEscapesAsset`] naming `source_root`; pass the resolved
/// directory instead.
pub fn copy_tree(
    source_root: &Path,
    destination_root: &Path,
    asset_path: &Path,
    options: &CopyOptions,
) -> Result<CopyStats> {
    let mut stats = CopyStats::default();
    // Directory modes are applied after their contents are written so that
    // read-only directories can still be populated.
    let mut dir_modes: Vec<(PathBuf, u32)> = Vec::new();

    for entry in WalkDir::new(source_root)
        .follow_links(false)
        .follow_root_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            AciError::io(
                format!("Failed to walk asset {}", source_root.display()),
                io::Error::from(e),
            )
        })?;

        let path = entry.path();
        let relative = path.strip_prefix(source_root).map_err(|_| {
            AciError::InvalidAsset(format!(
                "{} is not below asset root {}",
                path.display(),
                source_root.display()
            ))
        })?;
        let target = if relative.as_os_str().is_empty() {
            destination_root.to_path_buf()
        } else {
            destination_root.join(relative)
        };

        let metadata = entry.metadata().map_err(|e| {
            AciError::io(
                format!("Failed to read metadata for {}", path.display()),
                io::Error::from(e),
            )
        })?;
        let mode = metadata.permissions().mode() & 0o7777;
        let file_type = metadata.file_type();

        if file_type.is_dir() {
            fs::DirBuilder::new()
                .mode(mode | 0o700)
                .create(&target)
                .map_err(|e| {
                    AciError::io(format!("Failed to create directory {}", target.display()), e)
                })?;
            dir_modes.push((target, mode));
            stats.directories += 1;
        } else if file_type.is_file() {
            let copied = copy_regular_file(path, &target, mode)?;
            stats.files += 1;
            stats.bytes += copied;
        } else if file_type.is_symlink() {
            copy_symlink(path, &target, source_root, asset_path)?;
            stats.symlinks += 1;
        } else {
            return Err(AciError::UnsupportedNodeType {
                path: path.to_path_buf(),
                kind: node_kind(&file_type).to_string(),
            });
        }

        if options.debug {
            tracing::debug!(
                src = %path.display(),
                dest = %destination_root.join(relative).display(),
                "Copied asset node"
            );
        }
    }

    for (dir, mode) in dir_modes.iter().rev() {
        fs::set_permissions(dir, Permissions::from_mode(*mode)).map_err(|e| {
            AciError::io(format!("Failed to set permissions on {}", dir.display()), e)
        })?;
    }

    Ok(stats)
}

/// Stream a regular file to `dest` and apply `mode`. Returns bytes copied.
fn copy_regular_file(src: &Path, dest: &Path, mode: u32) -> Result<u64> {
    let mut reader = File::open(src)
        .map_err(|e| AciError::io(format!("Failed to open {}", src.display()), e))?;
    let mut writer = File::create(dest)
        .map_err(|e| AciError::io(format!("Failed to create {}", dest.display()), e))?;

    let copied = io::copy(&mut reader, &mut writer).map_err(|e| {
        AciError::io(
            format!("Failed to copy {} to {}", src.display(), dest.display()),
            e,
        )
    })?;

    writer
        .set_permissions(Permissions::from_mode(mode))
        .map_err(|e| AciError::io(format!("Failed to set permissions on {}", dest.display()), e))?;

    Ok(copied)
}

fn copy_symlink(src: &Path, dest: &Path, source_root: &Path, asset_path: &Path) -> Result<()> {
    let raw_target = fs::read_link(src)
        .map_err(|e| AciError::io(format!("Failed to read symlink {}", src.display()), e))?;

    let target = translate_symlink(src, &raw_target, source_root, asset_path)?;

    std::os::unix::fs::symlink(&target, dest).map_err(|e| {
        AciError::io(
            format!("Failed to create symlink {} -> {}", dest.display(), target.display()),
            e,
        )
    })
}

fn node_kind(file_type: &fs::FileType) -> &'static str {
    if file_type.is_fifo() {
        "fifo"
    } else if file_type.is_socket() {
        "socket"
    } else if file_type.is_char_device() {
        "character device"
    } else if file_type.is_block_device() {
        "block device"
    } else {
        "unknown"
    }
}
