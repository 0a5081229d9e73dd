use crate::cli::{Cli, OutputType};
use crate::error::Result;
use crate::output;

pub fn run(cli: &Cli) -> Result<()> {
    let devices = super::adb_host(cli).devices()?;
    match cli.output {
        OutputType::Table => output::print_table(&devices),
        OutputType::Json => output::print_json(&devices),
        OutputType::Plain => output::print_plain(&devices),
    }
    Ok(())
}
