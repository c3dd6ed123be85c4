//! Symlink target rewriting for relocated assets.
//!
//! A symlink inside an asset must point at a node inside the same asset.
//! Relative targets stay relative and are recomputed from the link's own
//! directory, so they no longer mention the local root's name. Absolute
//! targets are re-anchored at the asset's path inside the image, because the
//! local source tree is not present at extraction time.

use std::path::{Component, Path, PathBuf};

use a3s_aci_core::error::{AciError, Result};

/// Lexically normalize a path, collapsing `.` and `..` components.
///
/// The filesystem is never consulted. `..` at the root of an absolute path
/// is dropped, and leading `..` of a relative path are kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Compute the target a copied symlink should carry.
///
/// * `symlink_path` - location of the symlink in the local source tree
/// * `raw_target` - the target as read with `readlink`
/// * `source_root` - root of the local asset
/// * `asset_path` - absolute path the asset occupies inside the image
///
/// Containment is checked component-wise, so `/assetX` is not inside `/asset`.
pub fn translate_symlink(
    symlink_path: &Path,
    raw_target: &Path,
    source_root: &Path,
    asset_path: &Path,
) -> Result<PathBuf> {
    let absolute = raw_target.is_absolute();

    let link_dir = normalize_path(symlink_path.parent().unwrap_or_else(|| Path::new("/")));
    let resolved = if absolute {
        normalize_path(raw_target)
    } else {
        normalize_path(&link_dir.join(raw_target))
    };

    let root = normalize_path(source_root);
    let relative = match resolved.strip_prefix(&root) {
        Ok(relative) => relative,
        Err(_) => {
            return Err(AciError::SymlinkEscapesAsset {
                path: symlink_path.to_path_buf(),
                target: resolved,
                root,
            })
        }
    };

    if absolute {
        Ok(normalize_path(&asset_path.join(relative)))
    } else {
        Ok(relative_path(&link_dir, &resolved))
    }
}

/// Express normalized `target` relative to normalized directory `base`.
fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base: Vec<_> = base.components().collect();
    let target: Vec<_> = target.components().collect();
    let common = base
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for component in &target[common..] {
        out.push(component.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(link: &str, target: &str) -> Result<PathBuf> {
        translate_symlink(
            Path::new(link),
            Path::new(target),
            Path::new("/home/user/asset"),
            Path::new("/assets"),
        )
    }

    // --- normalize_path ---

    #[test]
    fn test_normalize_collapses_dots() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }

    #[test]
    fn test_normalize_parent_at_root() {
        assert_eq!(normalize_path(Path::new("/../../etc")), PathBuf::from("/etc"));
    }

    #[test]
    fn test_normalize_relative_keeps_leading_parents() {
        assert_eq!(normalize_path(Path::new("../a/../../b")), PathBuf::from("../../b"));
    }

    #[test]
    fn test_normalize_trailing_slash() {
        assert_eq!(normalize_path(Path::new("/a/b/")), PathBuf::from("/a/b"));
    }

    // --- translate_symlink ---

    #[test]
    fn test_relative_target_inside_kept_verbatim() {
        let target = translate("/home/user/asset/dir/link", "../a.txt").unwrap();
        assert_eq!(target, PathBuf::from("../a.txt"));
    }

    #[test]
    fn test_relative_target_through_root_name_recomputed() {
        let target = translate("/home/user/asset/link", "../asset/a.txt").unwrap();
        assert_eq!(target, PathBuf::from("a.txt"));

        let target = translate("/home/user/asset/dir/link", "./../dir/../../asset/b/c").unwrap();
        assert_eq!(target, PathBuf::from("../b/c"));
    }

    #[test]
    fn test_relative_target_to_own_directory() {
        let target = translate("/home/user/asset/dir/self", ".").unwrap();
        assert_eq!(target, PathBuf::from("."));

        let target = translate("/home/user/asset/dir/up", "..").unwrap();
        assert_eq!(target, PathBuf::from(".."));
    }

    #[test]
    fn test_relative_sibling_target() {
        let target = translate("/home/user/asset/link", "a.txt").unwrap();
        assert_eq!(target, PathBuf::from("a.txt"));
    }

    #[test]
    fn test_relative_target_escaping() {
        let err = translate("/home/user/asset/dir/link", "../../outside").unwrap_err();
        match err {
            AciError::SymlinkEscapesAsset { path, target, root } => {
                assert_eq!(path, PathBuf::from("/home/user/asset/dir/link"));
                assert_eq!(target, PathBuf::from("/home/user/outside"));
                assert_eq!(root, PathBuf::from("/home/user/asset"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_absolute_target_reanchored() {
        let target = translate("/home/user/asset/bin/tool", "/home/user/asset/lib/tool.so").unwrap();
        assert_eq!(target, PathBuf::from("/assets/lib/tool.so"));
    }

    #[test]
    fn test_absolute_target_with_dots_reanchored() {
        let target = translate("/home/user/asset/link", "/home/user/asset/x/../y").unwrap();
        assert_eq!(target, PathBuf::from("/assets/y"));
    }

    #[test]
    fn test_absolute_target_to_asset_root() {
        let target = translate("/home/user/asset/sub/up", "/home/user/asset").unwrap();
        assert_eq!(target, PathBuf::from("/assets"));
    }

    #[test]
    fn test_absolute_target_outside_rejected() {
        // Containment does not depend on the target existing.
        let err = translate("/home/user/asset/link", "/no/such/place").unwrap_err();
        assert!(matches!(err, AciError::SymlinkEscapesAsset { .. }));
    }

    #[test]
    fn test_sibling_with_shared_prefix_rejected() {
        let err = translate("/home/user/asset/link", "/home/user/assetX/file").unwrap_err();
        assert!(matches!(err, AciError::SymlinkEscapesAsset { .. }));

        let err = translate("/home/user/asset/link", "../assetX/file").unwrap_err();
        assert!(matches!(err, AciError::SymlinkEscapesAsset { .. }));
    }

    #[test]
    fn test_unnormalized_source_root() {
        let target = translate_symlink(
            Path::new("/src/./data/link"),
            Path::new("a.txt"),
            Path::new("/src/./data/"),
            Path::new("/assets/data"),
        )
        .unwrap();
        assert_eq!(target, PathBuf::from("a.txt"));
    }
}
