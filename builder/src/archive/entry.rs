//! Archive entry model and the sink that receives entries.

use std::io::{self, Read};
use std::path::PathBuf;

/// Kind of an archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    Directory,
    /// Symbolic link, target exactly as stored on disk
    Symlink { target: PathBuf },
    /// Hard link to an entry emitted earlier in the same archive
    Hardlink { target: PathBuf },
    CharDevice { major: u32, minor: u32 },
    BlockDevice { major: u32, minor: u32 },
    Fifo,
    Socket,
}

impl EntryKind {
    /// Whether entries of this kind carry file content.
    pub fn has_content(&self) -> bool {
        matches!(self, EntryKind::Regular)
    }
}

/// Header metadata for one archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Path relative to the staged root
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Permission bits (including setuid/setgid/sticky)
    pub mode: u32,
    /// Content size; zero for everything but regular files
    pub size: u64,
    /// Modification time, seconds since the epoch
    pub mtime: u64,
    pub uid: u64,
    pub gid: u64,
}

/// Destination of archive entries, in emission order.
///
/// `content` is present only for [`EntryKind::Regular`] entries and yields
/// exactly `header.size` bytes.
pub trait EntrySink {
    fn add_entry(&mut self, header: &EntryHeader, content: Option<&mut dyn Read>)
        -> io::Result<()>;

    /// Whether the output format can represent `kind`. Unsupported entries
    /// are skipped by the walker and not counted.
    fn supports(&self, _kind: &EntryKind) -> bool {
        true
    }
}
