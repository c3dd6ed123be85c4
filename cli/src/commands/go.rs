//! `a3s-aci go` command: build a Go package and package it.
//!
//! Runs `go install` into a temporary GOPATH with a static, stripped build
//! and packages the produced binary.

use std::path::Path;

use clap::Args;

use a3s_aci_builder::{run_command, select_binary};

use super::ImageArgs;

/// Placeholder for the temporary GOPATH of the build.
pub const GOPATH_PLACEHOLDER: &str = "<GOPATH>";

#[derive(Args)]
pub struct GoArgs {
    /// Go package to build (e.g., "example.com/cmd/hello" or "./cmd/hello")
    pub package: String,

    /// Image name (default: the package path without version)
    #[arg(short = 'n', long = "name")]
    pub name: Option<String>,

    /// Go toolchain to invoke
    #[arg(long = "go-binary", default_value = "go")]
    pub go_binary: String,

    #[command(flatten)]
    pub image: ImageArgs,
}

pub fn execute(args: GoArgs, debug: bool) -> Result<(), Box<dyn std::error::Error>> {
    let work = tempfile::Builder::new().prefix("a3s-aci-go-").tempdir()?;
    let gopath = work.path().join("gopath");
    let gobin = gopath.join("bin");
    std::fs::create_dir_all(&gobin)?;

    let install = go_install_args(&args.go_binary, &args.package);
    let env = vec![
        ("GOPATH".to_string(), gopath.to_string_lossy().into_owned()),
        ("GOBIN".to_string(), gobin.to_string_lossy().into_owned()),
        ("CGO_ENABLED".to_string(), "0".to_string()),
    ];
    run_command(&install, &env, None)?;

    let binary = select_binary(&gobin, args.image.use_binary.as_deref())?;
    tracing::debug!(binary = %binary, package = %args.package, "Built Go binary");

    let name = args.name.clone().unwrap_or_else(|| image_name_for(&args.package));
    let placeholders = super::base_placeholders()?.with(GOPATH_PLACEHOLDER, gopath.to_string_lossy());
    let config = args.image.into_config(&name, debug)?;

    super::package(&work.path().join("stage"), gobin.join(binary), config, placeholders)
}

/// Command line for a static, stripped `go install`.
fn go_install_args(go: &str, package: &str) -> Vec<String> {
    let target = if is_local_package(package) || package.contains('@') {
        package.to_string()
    } else {
        format!("{}@latest", package)
    };
    vec![
        go.to_string(),
        "install".to_string(),
        "-a".to_string(),
        "-tags".to_string(),
        "netgo".to_string(),
        "-ldflags=-w".to_string(),
        target,
    ]
}

fn is_local_package(package: &str) -> bool {
    package.starts_with('.') || Path::new(package).is_absolute()
}

/// Image name derived from a package path: version suffix dropped, lowercased.
fn image_name_for(package: &str) -> String {
    let path = package.split('@').next().unwrap_or(package);
    let path = path.trim_start_matches("./").trim_matches('/');
    if path.is_empty() || path == "." {
        return "app".to_string();
    }
    path.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_install_args_remote_gets_latest() {
        let args = go_install_args("go", "example.com/cmd/hello");
        assert_eq!(args.last().unwrap(), "example.com/cmd/hello@latest");
        assert_eq!(&args[..6], &["go", "install", "-a", "-tags", "netgo", "-ldflags=-w"]);
    }

    #[test]
    fn test_go_install_args_keeps_version_and_local() {
        let args = go_install_args("go", "example.com/cmd/hello@v1.2.0");
        assert_eq!(args.last().unwrap(), "example.com/cmd/hello@v1.2.0");

        let args = go_install_args("go", "./cmd/hello");
        assert_eq!(args.last().unwrap(), "./cmd/hello");
    }

    #[test]
    fn test_image_name_for() {
        assert_eq!(image_name_for("example.com/Cmd/hello@v1"), "example.com/cmd/hello");
        assert_eq!(image_name_for("./cmd/hello"), "cmd/hello");
        assert_eq!(image_name_for("."), "app");
    }
}
