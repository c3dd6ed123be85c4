//! Staged root serialization.
//!
//! Walks a fully staged image directory and hands one entry per node to an
//! [`EntrySink`]. Regular files sharing an inode are written once; later
//! occurrences become hard link entries pointing at the first path.

use std::fs::{self, File, Metadata};
use std::io;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::Path;

use a3s_aci_core::error::{AciError, Result};
use walkdir::WalkDir;

use super::entry::{EntryHeader, EntryKind, EntrySink};
use super::registry::{InodeKey, InodeRegistry};

/// Options for an archive walk.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    /// Emit a debug event for every archived node
    pub debug: bool,
}

/// Counters for one archive walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Entries handed to the sink
    pub entries: usize,
    /// Of which hard link entries
    pub hardlinks: usize,
    /// Content bytes handed to the sink
    pub bytes: u64,
}

/// Walk `staged_root` and emit its nodes to `sink`.
///
/// The root itself is not emitted, nor is the node whose relative path is
/// `reserved` (it is written separately by the caller). `registry` is
/// consumed: inode bookkeeping never outlives one archive.
///
/// On error the sink has received an arbitrary prefix of the entries and
/// its output must be discarded.
pub fn build_archive<S: EntrySink + ?Sized>(
    staged_root: &Path,
    reserved: &Path,
    sink: &mut S,
    mut registry: InodeRegistry,
    options: &WalkOptions,
) -> Result<WalkStats> {
    let mut stats = WalkStats::default();

    for entry in WalkDir::new(staged_root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            AciError::archive(
                format!("Failed to walk {}", staged_root.display()),
                io::Error::from(e),
            )
        })?;

        let path = entry.path();
        let relative = path.strip_prefix(staged_root).map_err(|_| {
            AciError::archive(
                format!("Failed to compute relative path for {}", path.display()),
                io::Error::new(io::ErrorKind::InvalidInput, "path outside staged root"),
            )
        })?;

        if relative == reserved {
            tracing::debug!(path = %relative.display(), "Skipping reserved entry");
            continue;
        }

        let metadata = entry.metadata().map_err(|e| {
            AciError::archive(
                format!("Failed to read metadata for {}", path.display()),
                io::Error::from(e),
            )
        })?;

        let mut header = header_for(relative, &metadata);
        let file_type = metadata.file_type();

        if file_type.is_file() {
            let key = InodeKey::from_metadata(&metadata);
            if let Some(first) = registry.record(key, relative) {
                header.kind = EntryKind::Hardlink { target: first };
                header.size = 0;
                sink.add_entry(&header, None).map_err(|e| {
                    AciError::archive(format!("Failed to add hard link {}", relative.display()), e)
                })?;
                stats.hardlinks += 1;
            } else {
                let mut file = File::open(path).map_err(|e| {
                    AciError::archive(format!("Failed to open {}", path.display()), e)
                })?;
                sink.add_entry(&header, Some(&mut file as &mut dyn io::Read)).map_err(|e| {
                    AciError::archive(format!("Failed to add file {}", relative.display()), e)
                })?;
                stats.bytes += header.size;
            }
        } else {
            if file_type.is_symlink() {
                let target = fs::read_link(path).map_err(|e| {
                    AciError::archive(format!("Failed to read symlink {}", path.display()), e)
                })?;
                header.kind = EntryKind::Symlink { target };
            } else if file_type.is_dir() {
                header.kind = EntryKind::Directory;
            } else {
                header.kind = special_kind(&file_type, metadata.rdev());
                if !sink.supports(&header.kind) {
                    tracing::warn!(
                        path = %relative.display(),
                        kind = ?header.kind,
                        "Special file not representable in archive, skipped"
                    );
                    continue;
                }
                tracing::warn!(
                    path = %relative.display(),
                    kind = ?header.kind,
                    "Archiving special file without content"
                );
            }
            header.size = 0;
            sink.add_entry(&header, None).map_err(|e| {
                AciError::archive(format!("Failed to add {}", relative.display()), e)
            })?;
        }

        stats.entries += 1;
        if options.debug {
            tracing::debug!(path = %relative.display(), kind = ?header.kind, "Archived node");
        }
    }

    tracing::debug!(
        entries = stats.entries,
        hardlinks = stats.hardlinks,
        inodes = registry.len(),
        "Archive walk complete"
    );

    Ok(stats)
}

/// Base header from metadata; the caller fixes up `kind` and `size`.
fn header_for(relative: &Path, metadata: &Metadata) -> EntryHeader {
    EntryHeader {
        path: relative.to_path_buf(),
        kind: EntryKind::Regular,
        mode: metadata.mode() & 0o7777,
        size: metadata.len(),
        mtime: metadata.mtime().max(0) as u64,
        uid: u64::from(metadata.uid()),
        gid: u64::from(metadata.gid()),
    }
}

fn special_kind(file_type: &fs::FileType, rdev: u64) -> EntryKind {
    let (major, minor) = split_dev(rdev);
    if file_type.is_char_device() {
        EntryKind::CharDevice { major, minor }
    } else if file_type.is_block_device() {
        EntryKind::BlockDevice { major, minor }
    } else if file_type.is_fifo() {
        EntryKind::Fifo
    } else {
        EntryKind::Socket
    }
}

/// Split a Linux `dev_t` into major and minor numbers.
fn split_dev(dev: u64) -> (u32, u32) {
    let major = ((dev >> 8) & 0xfff) | ((dev >> 32) & !0xfff);
    let minor = (dev & 0xff) | ((dev >> 12) & !0xff);
    (major as u32, minor as u32)
}
