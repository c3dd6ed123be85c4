//! Image staging and packaging.
//!
//! Lays out an ACI build directory:
//!
//! ```text
//! <work>/aci/
//! └── rootfs/
//!     ├── <binary>
//!     └── <assets...>
//! ```
//!
//! and serializes it, with a generated manifest, into a `.aci` archive.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use a3s_aci_core::config::{BuildConfig, PATH_LIST_SEPARATOR};
use a3s_aci_core::error::{AciError, Result};
use sha2::{Digest, Sha256};

use crate::archive::{build_archive, InodeRegistry, TarSink, WalkOptions};
use crate::asset::{stage_asset, CopyOptions, PlaceholderMap};
use crate::manifest::{App, ImageManifest, MANIFEST_ENTRY, ROOTFS_DIR};

/// Result of a successful packaging run.
#[derive(Debug, Clone)]
pub struct StagedImage {
    /// Path of the written archive
    pub path: PathBuf,
    /// SHA256 digest of the archive (hex, without prefix)
    pub digest: String,
    /// Archive size in bytes
    pub size: u64,
    /// Filesystem entries written, excluding the manifest
    pub entries: usize,
    /// Of which hard links
    pub hardlinks: usize,
}

impl StagedImage {
    /// Get the digest with "sha256:" prefix.
    pub fn prefixed_digest(&self) -> String {
        format!("sha256:{}", self.digest)
    }
}

/// Builder for staging and packaging one image.
pub struct ImageStager {
    /// Scratch directory; `aci/` is created inside it
    work_dir: PathBuf,
    /// Binary to install at the rootfs top level
    binary: PathBuf,
    /// Placeholders available to asset options
    placeholders: PlaceholderMap,
    /// Separator used in asset options
    separator: char,
    config: BuildConfig,
}

impl ImageStager {
    pub fn new(work_dir: impl Into<PathBuf>, binary: impl Into<PathBuf>, config: BuildConfig) -> Self {
        Self {
            work_dir: work_dir.into(),
            binary: binary.into(),
            placeholders: PlaceholderMap::new(),
            separator: PATH_LIST_SEPARATOR,
            config,
        }
    }

    /// Set the placeholder table used for asset options.
    pub fn with_placeholders(mut self, placeholders: PlaceholderMap) -> Self {
        self.placeholders = placeholders;
        self
    }

    /// Override the asset option separator.
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn aci_dir(&self) -> PathBuf {
        self.work_dir.join("aci")
    }

    pub fn rootfs_dir(&self) -> PathBuf {
        self.aci_dir().join(ROOTFS_DIR)
    }

    /// Stage the rootfs and write the archive to the configured output.
    pub fn build(&self) -> Result<StagedImage> {
        let binary_name = self.binary_name()?;
        let manifest = self.manifest(&binary_name)?;

        tracing::info!(
            name = %self.config.name,
            output = %self.config.output.display(),
            "Building image"
        );

        self.stage(&binary_name)?;
        self.write_archive(&manifest)
    }

    /// Create the rootfs, install the binary and copy all assets.
    pub fn stage(&self, binary_name: &str) -> Result<()> {
        let rootfs = self.rootfs_dir();
        fs::create_dir_all(&rootfs).map_err(|e| {
            AciError::io(format!("Failed to create rootfs directory {}", rootfs.display()), e)
        })?;

        self.install_binary(&rootfs.join(binary_name))?;

        let options = CopyOptions {
            debug: self.config.debug,
        };
        for option in &self.config.assets {
            stage_asset(option, &rootfs, &self.placeholders, self.separator, &options)?;
        }

        Ok(())
    }

    /// Manifest describing the staged image.
    pub fn manifest(&self, binary_name: &str) -> Result<ImageManifest> {
        let exec = if self.config.exec.is_empty() {
            vec![format!("/{}", binary_name)]
        } else {
            self.config.exec.clone()
        };

        let mut manifest = ImageManifest::new(
            &self.config.name,
            App {
                exec,
                user: self.config.user.clone(),
                group: self.config.group.clone(),
            },
        )?;
        for (name, value) in &self.config.labels {
            manifest = manifest.with_label(name, value);
        }
        Ok(manifest)
    }

    /// Serialize the staged directory. A partially written output is removed.
    pub fn write_archive(&self, manifest: &ImageManifest) -> Result<StagedImage> {
        let output = &self.config.output;
        let result = self.write_archive_to(output, manifest);
        if result.is_err() {
            if let Err(e) = fs::remove_file(output) {
                tracing::warn!(output = %output.display(), error = %e, "Failed to remove partial archive");
            }
        }
        result
    }

    fn write_archive_to(&self, output: &Path, manifest: &ImageManifest) -> Result<StagedImage> {
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(output)
            .map_err(|e| AciError::io(format!("Failed to create {}", output.display()), e))?;

        let mut sink = TarSink::new(BufWriter::new(file));
        sink.append_manifest(manifest)?;

        let options = WalkOptions {
            debug: self.config.debug,
        };
        let stats = build_archive(
            &self.aci_dir(),
            Path::new(MANIFEST_ENTRY),
            &mut sink,
            InodeRegistry::new(),
            &options,
        )?;

        let mut writer = sink.finish()?;
        writer
            .flush()
            .map_err(|e| AciError::archive(format!("Failed to flush {}", output.display()), e))?;
        drop(writer);

        let digest = sha256_file(output)?;
        let size = fs::metadata(output)
            .map_err(|e| AciError::io(format!("Failed to stat {}", output.display()), e))?
            .len();

        tracing::info!(
            output = %output.display(),
            entries = stats.entries,
            hardlinks = stats.hardlinks,
            size,
            "Wrote image"
        );

        Ok(StagedImage {
            path: output.to_path_buf(),
            digest,
            size,
            entries: stats.entries,
            hardlinks: stats.hardlinks,
        })
    }

    fn binary_name(&self) -> Result<String> {
        self.binary
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AciError::ConfigError(format!("Invalid binary path {}", self.binary.display()))
            })
    }

    fn install_binary(&self, dest: &Path) -> Result<()> {
        tracing::debug!(
            src = %self.binary.display(),
            dest = %dest.display(),
            "Installing binary"
        );

        fs::copy(&self.binary, dest).map_err(|e| {
            AciError::io(
                format!("Failed to copy binary {} to {}", self.binary.display(), dest.display()),
                e,
            )
        })?;
        fs::set_permissions(dest, fs::Permissions::from_mode(0o755))
            .map_err(|e| AciError::io(format!("Failed to set permissions on {}", dest.display()), e))
    }
}

/// Compute SHA256 digest of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| {
        AciError::io(format!("Failed to open file for hashing {}", path.display()), e)
    })?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| AciError::io(format!("Failed to hash {}", path.display()), e))?;
    Ok(hex::encode(hasher.finalize()))
}
