//! CLI command definitions and dispatch.

mod build;
mod go;
mod version;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use a3s_aci_builder::{ImageStager, PlaceholderMap};
use a3s_aci_core::BuildConfig;

use crate::output::format_bytes;

/// Placeholder for the directory the command was started in.
pub const PROJPATH_PLACEHOLDER: &str = "<PROJPATH>";

/// A3S ACI: package binaries and assets as App Container Images.
#[derive(Parser)]
#[command(name = "a3s-aci", version, about)]
pub struct Cli {
    /// Print debug output (also enabled by A3S_ACI_DEBUG)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Package a prebuilt binary
    Build(build::BuildArgs),
    /// Build a Go package with `go install` and package it
    Go(go::GoArgs),
    /// Show version information
    Version(version::VersionArgs),
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub fn dispatch(cli: Cli, debug: bool) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Build(args) => build::execute(args, debug),
        Command::Go(args) => go::execute(args, debug),
        Command::Version(args) => version::execute(args),
    }
}

/// Options shared by every packaging command.
#[derive(clap::Args)]
pub struct ImageArgs {
    /// Binary to package when the build produced several
    #[arg(long = "use-binary")]
    pub use_binary: Option<String>,

    /// Asset to add, as <image path>:<local path> (repeatable)
    #[arg(long = "asset")]
    pub assets: Vec<String>,

    /// Exec argument for the app (repeatable, defaults to the binary)
    #[arg(long = "exec")]
    pub exec: Vec<String>,

    /// Manifest label as KEY=VALUE (repeatable)
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// User the app runs as
    #[arg(long, default_value = "0")]
    pub user: String,

    /// Group the app runs as
    #[arg(long, default_value = "0")]
    pub group: String,

    /// Output file (default: <last name component>.aci)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

impl ImageArgs {
    /// Turn the arguments into a build configuration for image `name`.
    pub fn into_config(self, name: &str, debug: bool) -> Result<BuildConfig, String> {
        let output = self.output.unwrap_or_else(|| default_output(name));
        Ok(BuildConfig {
            name: name.to_string(),
            exec: self.exec,
            user: self.user,
            group: self.group,
            assets: self.assets,
            output,
            use_binary: self.use_binary,
            labels: parse_labels(&self.labels)?,
            ..Default::default()
        }
        .with_debug(debug))
    }
}

/// Default archive name: last component of the image name plus `.aci`.
pub(crate) fn default_output(name: &str) -> PathBuf {
    let base = name.rsplit('/').find(|s| !s.is_empty()).unwrap_or("image");
    PathBuf::from(format!("{}.aci", base))
}

/// Parse KEY=VALUE pairs into a map.
pub(crate) fn parse_labels(labels: &[String]) -> Result<BTreeMap<String, String>, String> {
    let mut map = BTreeMap::new();
    for label in labels {
        let (key, value) = label
            .split_once('=')
            .ok_or_else(|| format!("Invalid label (expected KEY=VALUE): {label}"))?;
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

/// Placeholders every command provides.
pub(crate) fn base_placeholders() -> Result<PlaceholderMap, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    Ok(PlaceholderMap::new().with(PROJPATH_PLACEHOLDER, cwd.to_string_lossy()))
}

/// Stage `binary` with `config` in `work_dir` and report the result.
pub(crate) fn package(
    work_dir: &Path,
    binary: PathBuf,
    config: BuildConfig,
    placeholders: PlaceholderMap,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = ImageStager::new(work_dir, binary, config)
        .with_placeholders(placeholders)
        .build()?;

    println!(
        "Wrote {} ({}, {})",
        image.path.display(),
        format_bytes(image.size),
        image.prefixed_digest()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output() {
        assert_eq!(default_output("example.com/my/app"), PathBuf::from("app.aci"));
        assert_eq!(default_output("hello"), PathBuf::from("hello.aci"));
        assert_eq!(default_output("example.com/app/"), PathBuf::from("app.aci"));
    }

    #[test]
    fn test_parse_labels_valid() {
        let labels = vec!["version=1.0".to_string(), "url=http://x?a=1".to_string()];
        let map = parse_labels(&labels).unwrap();
        assert_eq!(map.get("version"), Some(&"1.0".to_string()));
        assert_eq!(map.get("url"), Some(&"http://x?a=1".to_string()));
    }

    #[test]
    fn test_parse_labels_invalid() {
        assert!(parse_labels(&["NOEQUALS".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parses_build() {
        let cli = Cli::try_parse_from([
            "a3s-aci",
            "--debug",
            "build",
            "--bin-dir",
            "/tmp/bin",
            "--name",
            "example.com/hello",
            "--asset",
            "/etc/app:/home/me/app",
            "--asset",
            "/data:<PROJPATH>/data",
        ])
        .unwrap();
        assert!(cli.debug);
        match cli.command {
            Command::Build(args) => {
                assert_eq!(args.bin_dir, PathBuf::from("/tmp/bin"));
                assert_eq!(args.image.assets.len(), 2);
            }
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn test_into_config() {
        let args = ImageArgs {
            use_binary: None,
            assets: vec![],
            exec: vec![],
            labels: vec!["a=b".to_string()],
            user: "0".to_string(),
            group: "0".to_string(),
            output: None,
        };
        let config = args.into_config("example.com/hello", true).unwrap();
        assert_eq!(config.output, PathBuf::from("hello.aci"));
        assert!(config.debug);
        assert_eq!(config.labels.get("a"), Some(&"b".to_string()));
    }
}
