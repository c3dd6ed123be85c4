//! Inode bookkeeping for hard link detection.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Filesystem identity of a file: device plus inode number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InodeKey {
    pub dev: u64,
    pub ino: u64,
}

impl InodeKey {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }
    }
}

/// Maps each inode to the first archive path its content was written under.
///
/// One registry belongs to exactly one archive build.
#[derive(Debug, Default)]
pub struct InodeRegistry {
    seen: HashMap<InodeKey, PathBuf>,
}

impl InodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` for `key` unless the inode was already seen.
    ///
    /// Returns the earlier path when there is one; the stored path is never
    /// replaced.
    pub fn record(&mut self, key: InodeKey, path: &Path) -> Option<PathBuf> {
        match self.seen.entry(key) {
            Entry::Occupied(existing) => Some(existing.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(path.to_path_buf());
                None
            }
        }
    }

    /// Path recorded for `key`, if any.
    pub fn first_path(&self, key: &InodeKey) -> Option<&Path> {
        self.seen.get(key).map(PathBuf::as_path)
    }

    /// Number of distinct inodes recorded.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_path_wins() {
        let mut registry = InodeRegistry::new();
        let key = InodeKey { dev: 1, ino: 42 };

        assert_eq!(registry.record(key, Path::new("rootfs/a")), None);
        assert_eq!(
            registry.record(key, Path::new("rootfs/b")),
            Some(PathBuf::from("rootfs/a"))
        );
        assert_eq!(registry.first_path(&key), Some(Path::new("rootfs/a")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_inode_other_device_is_distinct() {
        let mut registry = InodeRegistry::new();
        assert!(registry.record(InodeKey { dev: 1, ino: 7 }, Path::new("x")).is_none());
        assert!(registry.record(InodeKey { dev: 2, ino: 7 }, Path::new("y")).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_key_from_metadata_matches_hard_link() {
        let tmp = tempfile::TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        std::fs::write(&a, "x").unwrap();
        std::fs::hard_link(&a, &b).unwrap();

        let ka = InodeKey::from_metadata(&std::fs::metadata(&a).unwrap());
        let kb = InodeKey::from_metadata(&std::fs::metadata(&b).unwrap());
        assert_eq!(ka, kb);
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = InodeRegistry::new();
        assert!(registry.is_empty());
    }
}
