//! `a3s-aci version` command.

use clap::Args;

#[derive(Args)]
pub struct VersionArgs;

pub fn execute(_args: VersionArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("a3s-aci version {}", a3s_aci_core::VERSION);
    Ok(())
}
