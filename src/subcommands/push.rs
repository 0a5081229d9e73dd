use crate::cli::Cli;
use crate::error::Result;
use log::*;
use std::path::Path;

pub fn run(cli: &Cli, local: &Path, remote: &str, verify: bool) -> Result<()> {
    debug!("pushing {} to {}", local.display(), remote);
    let sent = super::resolve_device(cli)?.push(local, remote, verify, true)?;
    println!("{} -> {} ({} bytes)", local.display(), remote, sent);
    Ok(())
}
