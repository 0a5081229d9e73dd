use crate::cli::{Cli, OutputType};
use crate::error::Result;
use crate::output;

pub fn run(cli: &Cli, path: &str) -> Result<()> {
    let entries = super::resolve_device(cli)?.list(path)?;
    match cli.output {
        OutputType::Table => output::print_table(&entries),
        OutputType::Json => output::print_json(&entries),
        OutputType::Plain => output::print_plain(&entries),
    }
    Ok(())
}
