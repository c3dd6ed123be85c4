//! Gzip-compressed tar output for archive entries.

use std::io::{self, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{EntryType, Header};

use a3s_aci_core::error::{AciError, Result};

use super::entry::{EntryHeader, EntryKind, EntrySink};
use crate::manifest::{ImageManifest, MANIFEST_ENTRY};

/// Writes entries as a `.tar.gz` stream.
pub struct TarSink<W: Write> {
    builder: tar::Builder<GzEncoder<W>>,
}

impl<W: Write> TarSink<W> {
    pub fn new(writer: W) -> Self {
        let encoder = GzEncoder::new(writer, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.follow_symlinks(false);
        Self { builder }
    }

    /// Write the reserved manifest entry.
    pub fn append_manifest(&mut self, manifest: &ImageManifest) -> Result<()> {
        let bytes = manifest.to_json_bytes()?;
        let mtime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_mode(0o644);
        header.set_size(bytes.len() as u64);
        header.set_mtime(mtime);

        self.builder
            .append_data(&mut header, MANIFEST_ENTRY, &bytes[..])
            .map_err(|e| AciError::archive("Failed to write manifest", e))
    }

    /// Write the tar and gzip trailers and return the underlying writer.
    pub fn finish(self) -> Result<W> {
        let encoder = self
            .builder
            .into_inner()
            .map_err(|e| AciError::archive("Failed to finalize tar stream", e))?;
        encoder
            .finish()
            .map_err(|e| AciError::archive("Failed to finalize gzip stream", e))
    }
}

impl<W: Write> EntrySink for TarSink<W> {
    fn add_entry(
        &mut self,
        entry: &EntryHeader,
        content: Option<&mut dyn Read>,
    ) -> io::Result<()> {
        let mut header = Header::new_gnu();
        header.set_mode(entry.mode);
        header.set_mtime(entry.mtime);
        header.set_uid(entry.uid);
        header.set_gid(entry.gid);
        header.set_size(0);

        match &entry.kind {
            EntryKind::Regular => {
                header.set_entry_type(EntryType::Regular);
                header.set_size(entry.size);
                match content {
                    Some(reader) => self.builder.append_data(&mut header, &entry.path, reader),
                    None => Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("regular entry {} has no content", entry.path.display()),
                    )),
                }
            }
            EntryKind::Directory => {
                header.set_entry_type(EntryType::Directory);
                self.builder
                    .append_data(&mut header, &entry.path, io::empty())
            }
            EntryKind::Symlink { target } => {
                header.set_entry_type(EntryType::Symlink);
                self.builder.append_link(&mut header, &entry.path, target)
            }
            EntryKind::Hardlink { target } => {
                header.set_entry_type(EntryType::Link);
                self.builder.append_link(&mut header, &entry.path, target)
            }
            EntryKind::CharDevice { major, minor } => {
                header.set_entry_type(EntryType::Char);
                header.set_device_major(*major)?;
                header.set_device_minor(*minor)?;
                self.builder
                    .append_data(&mut header, &entry.path, io::empty())
            }
            EntryKind::BlockDevice { major, minor } => {
                header.set_entry_type(EntryType::Block);
                header.set_device_major(*major)?;
                header.set_device_minor(*minor)?;
                self.builder
                    .append_data(&mut header, &entry.path, io::empty())
            }
            EntryKind::Fifo => {
                header.set_entry_type(EntryType::Fifo);
                self.builder
                    .append_data(&mut header, &entry.path, io::empty())
            }
            EntryKind::Socket => {
                // tar has no socket entry type
                tracing::warn!(path = %entry.path.display(), "Socket not representable in tar, skipped");
                Ok(())
            }
        }
    }

    fn supports(&self, kind: &EntryKind) -> bool {
        !matches!(kind, EntryKind::Socket)
    }
}
