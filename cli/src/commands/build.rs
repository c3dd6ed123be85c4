//! `a3s-aci build` command: package a prebuilt binary.
//!
//! Picks the binary from a directory, stages it together with the
//! requested assets and writes a `.aci` archive.

use std::path::PathBuf;

use clap::Args;

use a3s_aci_builder::select_binary;

use super::ImageArgs;

/// Placeholder for the directory holding the binary.
pub const BINDIR_PLACEHOLDER: &str = "<BINDIR>";

#[derive(Args)]
pub struct BuildArgs {
    /// Directory containing the built binary
    #[arg(long = "bin-dir")]
    pub bin_dir: PathBuf,

    /// Image name (e.g., "example.com/hello")
    #[arg(short = 'n', long = "name")]
    pub name: String,

    #[command(flatten)]
    pub image: ImageArgs,
}

pub fn execute(args: BuildArgs, debug: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !args.bin_dir.is_dir() {
        return Err(format!("Binary directory '{}' is not a directory", args.bin_dir.display()).into());
    }

    let binary = select_binary(&args.bin_dir, args.image.use_binary.as_deref())?;
    tracing::debug!(binary = %binary, bin_dir = %args.bin_dir.display(), "Selected binary");

    let placeholders = super::base_placeholders()?
        .with(BINDIR_PLACEHOLDER, args.bin_dir.to_string_lossy());
    let config = args.image.into_config(&args.name, debug)?;

    let work = tempfile::Builder::new().prefix("a3s-aci-").tempdir()?;
    super::package(work.path(), args.bin_dir.join(binary), config, placeholders)
}
