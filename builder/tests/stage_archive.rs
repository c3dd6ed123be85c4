//! End-to-end staging tests: assets in, `.aci` archive out.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use a3s_aci_builder::{ImageManifest, ImageStager, MANIFEST_ENTRY};
use a3s_aci_core::{AciError, BuildConfig};
use flate2::read::GzDecoder;
use tempfile::TempDir;

struct Entry {
    path: String,
    kind: tar::EntryType,
    link: Option<PathBuf>,
    data: Vec<u8>,
}

fn read_archive(path: &Path) -> Vec<Entry> {
    let file = fs::File::open(path).unwrap();
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive
        .entries()
        .unwrap()
        .map(|e| {
            let mut e = e.unwrap();
            let path = e.path().unwrap().to_string_lossy().to_string();
            let kind = e.header().entry_type();
            let link = e.link_name().unwrap().map(|l| l.into_owned());
            let mut data = Vec::new();
            e.read_to_end(&mut data).unwrap();
            Entry {
                path,
                kind,
                link,
                data,
            }
        })
        .collect()
}

fn fake_binary(dir: &Path) -> PathBuf {
    let bin = dir.join("hello");
    fs::write(&bin, "#!/bin/sh\necho hello\n").unwrap();
    bin
}

fn config(output: PathBuf, assets: Vec<String>) -> BuildConfig {
    BuildConfig {
        name: "example.com/hello".to_string(),
        output,
        assets,
        ..Default::default()
    }
}

#[test]
fn test_asset_with_relative_symlink() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src").join("data");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("a.txt"), "hi").unwrap();
    std::os::unix::fs::symlink("a.txt", src.join("link")).unwrap();

    let output = tmp.path().join("hello.aci");
    let stager = ImageStager::new(
        tmp.path().join("work"),
        fake_binary(tmp.path()),
        config(output.clone(), vec![format!("/assets/data:{}", src.display())]),
    );
    let image = stager.build().unwrap();

    assert_eq!(image.path, output);
    assert_eq!(image.digest.len(), 64);
    assert!(image.size > 0);

    let entries = read_archive(&output);
    assert_eq!(entries[0].path, MANIFEST_ENTRY);
    let manifest: ImageManifest = serde_json::from_slice(&entries[0].data).unwrap();
    assert_eq!(manifest.name, "example.com/hello");
    assert_eq!(manifest.app.unwrap().exec, vec!["/hello".to_string()]);

    // Manifest is written exactly once.
    assert_eq!(entries.iter().filter(|e| e.path == MANIFEST_ENTRY).count(), 1);

    let file = entries
        .iter()
        .find(|e| e.path == "rootfs/assets/data/a.txt")
        .unwrap();
    assert_eq!(file.kind, tar::EntryType::Regular);
    assert_eq!(file.data, b"hi");

    let link = entries
        .iter()
        .find(|e| e.path == "rootfs/assets/data/link")
        .unwrap();
    assert_eq!(link.kind, tar::EntryType::Symlink);
    assert_eq!(link.link.as_deref(), Some(Path::new("a.txt")));

    // Once extracted, the link resolves to the copied file.
    let extracted = tmp.path().join("extracted");
    let mut archive = tar::Archive::new(GzDecoder::new(fs::File::open(&output).unwrap()));
    archive.unpack(&extracted).unwrap();
    assert_eq!(
        fs::read_to_string(extracted.join("rootfs/assets/data/link")).unwrap(),
        "hi"
    );
}

#[test]
fn test_absolute_symlink_rewritten_to_image_path() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("share");
    fs::create_dir_all(src.join("v1")).unwrap();
    fs::write(src.join("v1").join("data.bin"), [1u8, 2, 3]).unwrap();
    std::os::unix::fs::symlink(src.join("v1"), src.join("current")).unwrap();

    let output = tmp.path().join("hello.aci");
    let stager = ImageStager::new(
        tmp.path().join("work"),
        fake_binary(tmp.path()),
        config(output.clone(), vec![format!("/usr/share/app:{}", src.display())]),
    );
    stager.build().unwrap();

    let entries = read_archive(&output);
    let link = entries
        .iter()
        .find(|e| e.path == "rootfs/usr/share/app/current")
        .unwrap();
    assert_eq!(link.link.as_deref(), Some(Path::new("/usr/share/app/v1")));
}

#[test]
fn test_escaping_symlink_fails_without_output() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("data");
    fs::create_dir_all(&src).unwrap();
    std::os::unix::fs::symlink("/etc/hostname", src.join("host")).unwrap();

    let output = tmp.path().join("hello.aci");
    let stager = ImageStager::new(
        tmp.path().join("work"),
        fake_binary(tmp.path()),
        config(output.clone(), vec![format!("/data:{}", src.display())]),
    );
    let err = stager.build().unwrap_err();

    assert!(matches!(err, AciError::SymlinkEscapesAsset { .. }));
    assert!(!output.exists());
}

#[test]
fn test_missing_asset_source_fails() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("hello.aci");
    let stager = ImageStager::new(
        tmp.path().join("work"),
        fake_binary(tmp.path()),
        config(
            output.clone(),
            vec![format!("/data:{}", tmp.path().join("missing").display())],
        ),
    );
    let err = stager.build().unwrap_err();
    assert!(matches!(err, AciError::InvalidAsset(_)));
    assert!(!output.exists());
}

#[test]
fn test_hard_linked_files_stored_once() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("hello.aci");
    let stager = ImageStager::new(
        tmp.path().join("work"),
        fake_binary(tmp.path()),
        config(output.clone(), Vec::new()),
    );

    stager.stage("hello").unwrap();
    let rootfs = stager.rootfs_dir();
    fs::hard_link(rootfs.join("hello"), rootfs.join("hello-alias")).unwrap();

    let manifest = stager.manifest("hello").unwrap();
    let image = stager.write_archive(&manifest).unwrap();
    assert_eq!(image.hardlinks, 1);

    let entries = read_archive(&output);
    let content: Vec<_> = entries
        .iter()
        .filter(|e| e.path.starts_with("rootfs/hello"))
        .collect();
    assert_eq!(content.len(), 2);

    let regular: Vec<_> = content
        .iter()
        .filter(|e| e.kind == tar::EntryType::Regular)
        .collect();
    let links: Vec<_> = content
        .iter()
        .filter(|e| e.kind == tar::EntryType::Link)
        .collect();
    assert_eq!(regular.len(), 1);
    assert_eq!(links.len(), 1);
    assert_eq!(regular[0].path, "rootfs/hello");
    assert!(links[0].data.is_empty());
    assert_eq!(links[0].link.as_deref(), Some(Path::new("rootfs/hello")));
}

#[test]
fn test_placeholder_in_asset_option() {
    let tmp = TempDir::new().unwrap();
    let project = tmp.path().join("project");
    fs::create_dir_all(project.join("conf")).unwrap();
    fs::write(project.join("conf").join("app.toml"), "debug = false\n").unwrap();

    let output = tmp.path().join("hello.aci");
    let placeholders = a3s_aci_builder::PlaceholderMap::new()
        .with("<PROJPATH>", project.to_string_lossy());
    let stager = ImageStager::new(
        tmp.path().join("work"),
        fake_binary(tmp.path()),
        config(
            output.clone(),
            vec!["/etc/app.toml:<PROJPATH>/conf/app.toml".to_string()],
        ),
    )
    .with_placeholders(placeholders);
    stager.build().unwrap();

    let entries = read_archive(&output);
    let conf = entries
        .iter()
        .find(|e| e.path == "rootfs/etc/app.toml")
        .unwrap();
    assert_eq!(conf.data, b"debug = false\n");
}
