use crate::cli::{Cli, OutputType};
use crate::error::Result;
use crate::output;

pub fn run(cli: &Cli, path: &str) -> Result<()> {
    let stat = super::resolve_device(cli)?.stat(path)?;
    match cli.output {
        OutputType::Json => output::print_json(&stat),
        _ => println!("{}", stat),
    }
    Ok(())
}
