//! Asset option parsing and validation.
//!
//! An asset option has the form `<image path><sep><local path>`, where
//! `<sep>` is the platform path-list separator. Both halves may contain
//! placeholder tokens (e.g. `<GOPATH>`) which are substituted before the
//! paths are validated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use a3s_aci_core::error::{AciError, Result};

use super::symlink::normalize_path;

/// Token → replacement table applied to asset paths.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderMap {
    entries: BTreeMap<String, String>,
}

impl PlaceholderMap {
    /// Create an empty placeholder table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token and its replacement.
    pub fn insert(&mut self, token: impl Into<String>, replacement: impl Into<String>) {
        self.entries.insert(token.into(), replacement.into());
    }

    /// Builder-style variant of [`PlaceholderMap::insert`].
    pub fn with(mut self, token: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.insert(token, replacement);
        self
    }

    /// Whether no token is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every occurrence of every token in `input`.
    ///
    /// The input is scanned once from left to right, so replacement text is
    /// never re-scanned and the result does not depend on token order. When
    /// two tokens match at the same offset the longer one wins.
    pub fn apply(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        loop {
            let next = self
                .entries
                .iter()
                .filter(|(token, _)| !token.is_empty())
                .filter_map(|(token, replacement)| {
                    rest.find(token.as_str()).map(|idx| (idx, token, replacement))
                })
                .min_by(|a, b| a.0.cmp(&b.0).then(b.1.len().cmp(&a.1.len())));

            match next {
                Some((idx, token, replacement)) => {
                    out.push_str(&rest[..idx]);
                    out.push_str(replacement);
                    rest = &rest[idx + token.len()..];
                }
                None => {
                    out.push_str(rest);
                    return out;
                }
            }
        }
    }
}

/// A validated asset: where it goes in the image and where it comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    /// Absolute, normalized path inside the image
    pub destination: PathBuf,
    /// Absolute path on the local filesystem
    pub source: PathBuf,
}

/// Split an asset option into its two raw halves without touching the filesystem.
fn split_asset_option(spec: &str, separator: char) -> Result<(&str, &str)> {
    let mut tokens = spec.split(separator);
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(destination), Some(source), None) => Ok((destination, source)),
        _ => Err(AciError::MalformedAssetSpec {
            spec: spec.to_string(),
            separator,
        }),
    }
}

/// Parse, substitute and validate an asset option.
///
/// The destination is normalized lexically, so `..` can never climb above
/// the image root. The source is stat'ed (following symlinks) and must be a
/// directory or a regular file. Nothing is copied here.
pub fn resolve_asset(
    spec: &str,
    placeholders: &PlaceholderMap,
    separator: char,
) -> Result<AssetSpec> {
    let (raw_destination, raw_source) = split_asset_option(spec, separator)?;

    let destination = PathBuf::from(placeholders.apply(raw_destination));
    let source = PathBuf::from(placeholders.apply(raw_source));

    tracing::debug!(
        spec,
        destination = %destination.display(),
        source = %source.display(),
        "Resolved asset paths"
    );

    validate_asset(&destination, &source)?;

    Ok(AssetSpec {
        destination: normalize_path(&destination),
        source,
    })
}

fn validate_asset(destination: &Path, source: &Path) -> Result<()> {
    if !destination.is_absolute() {
        return Err(AciError::InvalidAsset(format!(
            "image asset '{}' has to be an absolute path",
            destination.display()
        )));
    }
    if !source.is_absolute() {
        return Err(AciError::InvalidAsset(format!(
            "local asset '{}' has to be an absolute path",
            source.display()
        )));
    }

    let metadata = std::fs::metadata(source).map_err(|e| {
        AciError::InvalidAsset(format!("failed to stat {}: {}", source.display(), e))
    })?;

    if metadata.is_dir() || metadata.is_file() {
        Ok(())
    } else {
        Err(AciError::InvalidAsset(format!(
            "local asset {} is neither a file nor a directory",
            source.display()
        )))
    }
}
