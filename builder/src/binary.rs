//! Selection of the binary to package from a build output directory.

use std::path::Path;

use a3s_aci_core::error::{AciError, Result};

/// Pick the binary to package from `bin_dir`.
///
/// With a single entry it is used unless `preferred` names something else.
/// With several entries `preferred` is mandatory and must be among them.
pub fn select_binary(bin_dir: &Path, preferred: Option<&str>) -> Result<String> {
    let read_dir = std::fs::read_dir(bin_dir).map_err(|e| {
        AciError::io(format!("Failed to read directory {}", bin_dir.display()), e)
    })?;

    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry
            .map_err(|e| AciError::io(format!("Failed to read entry in {}", bin_dir.display()), e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    match (names.as_slice(), preferred) {
        ([], _) => Err(AciError::BinaryNotFound(format!(
            "no binaries found in {}",
            bin_dir.display()
        ))),
        ([only], None) => {
            tracing::debug!(binary = %only, "Found binary");
            Ok(only.clone())
        }
        ([only], Some(wanted)) if only == wanted => Ok(only.clone()),
        ([only], Some(wanted)) => Err(AciError::BinaryNotFound(format!(
            "no binary '{}' in {}, there is only '{}'",
            wanted,
            bin_dir.display(),
            only
        ))),
        (_, None) => Err(AciError::BinaryNotFound(format!(
            "found multiple binaries in {} and none was chosen, available: {}",
            bin_dir.display(),
            names.join(", ")
        ))),
        (_, Some(wanted)) => names
            .iter()
            .find(|name| name.as_str() == wanted)
            .cloned()
            .ok_or_else(|| {
                AciError::BinaryNotFound(format!(
                    "no binary '{}' in {}, available: {}",
                    wanted,
                    bin_dir.display(),
                    names.join(", ")
                ))
            }),
    }
}
