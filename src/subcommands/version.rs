use crate::cli::Cli;
use crate::error::Result;

pub fn run(cli: &Cli) -> Result<()> {
    let version = super::adb_host(cli).version()?;
    println!("{}", version);
    Ok(())
}
