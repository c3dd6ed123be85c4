//! ACI archive assembly.
//!
//! A staged image directory is walked depth-first and every node becomes
//! one entry in a gzip-compressed tar stream. Hard-linked regular files are
//! stored once and referenced by link entries afterwards.

pub mod entry;
pub mod registry;
pub mod tar_sink;
pub mod walker;

pub use entry::{EntryHeader, EntryKind, EntrySink};
pub use registry::{InodeKey, InodeRegistry};
pub use tar_sink::TarSink;
pub use walker::{build_archive, WalkOptions, WalkStats};
