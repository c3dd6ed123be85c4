//! ACI image manifest.
//!
//! The manifest is the reserved `manifest` entry at the top of every ACI
//! archive. It is serialized separately from the rootfs walk.

use serde::{Deserialize, Serialize};

use a3s_aci_core::error::{AciError, Result};

/// Name of the reserved manifest entry in the archive.
pub const MANIFEST_ENTRY: &str = "manifest";

/// Directory holding the image filesystem inside the archive.
pub const ROOTFS_DIR: &str = "rootfs";

/// App Container spec version written to manifests.
pub const AC_VERSION: &str = "0.8.11";

/// Image manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    pub ac_kind: String,
    pub ac_version: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<App>,
}

/// Manifest label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

/// How the image is executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub exec: Vec<String>,
    pub user: String,
    pub group: String,
}

impl ImageManifest {
    /// Create a manifest for `name`, labelled with the host os and arch.
    pub fn new(name: &str, app: App) -> Result<Self> {
        validate_image_name(name)?;
        Ok(Self {
            ac_kind: "ImageManifest".to_string(),
            ac_version: AC_VERSION.to_string(),
            name: name.to_string(),
            labels: vec![
                Label {
                    name: "os".to_string(),
                    value: std::env::consts::OS.to_string(),
                },
                Label {
                    name: "arch".to_string(),
                    value: host_arch().to_string(),
                },
            ],
            app: Some(app),
        })
    }

    /// Add or replace a label.
    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.labels.iter_mut().find(|l| l.name == name) {
            Some(existing) => existing.value = value,
            None => self.labels.push(Label { name, value }),
        }
        self
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Architecture label in ACI terms.
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "aarch64",
        "x86" => "i386",
        other => other,
    }
}

/// Check an image name against the ACI identifier rules.
///
/// Lower-case letters and digits, separated by single `-`, `.`, `_`, `~`
/// or `/` characters.
pub fn validate_image_name(name: &str) -> Result<()> {
    let is_alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let is_sep = |c: char| matches!(c, '-' | '.' | '_' | '~' | '/');

    let valid = name.starts_with(is_alnum)
        && name.ends_with(is_alnum)
        && name.chars().all(|c| is_alnum(c) || is_sep(c))
        && !name
            .as_bytes()
            .windows(2)
            .any(|w| is_sep(w[0] as char) && is_sep(w[1] as char));

    if valid {
        Ok(())
    } else {
        Err(AciError::InvalidName(name.to_string()))
    }
}
