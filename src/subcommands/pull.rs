use crate::cli::Cli;
use crate::error::Result;
use log::*;
use std::path::Path;

pub fn run(cli: &Cli, remote: &str, local: &Path) -> Result<()> {
    debug!("pulling {} to {}", remote, local.display());
    let written = super::resolve_device(cli)?.pull(remote, local, true)?;
    println!("{} -> {} ({} bytes)", remote, local.display(), written);
    Ok(())
}
