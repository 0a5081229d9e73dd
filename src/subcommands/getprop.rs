use crate::cli::{Cli, OutputType};
use crate::error::Result;
use crate::output;

pub async fn run(cli: &Cli, propnames: &[String]) -> Result<()> {
    let device = super::resolve_device(cli)?;

    // No names means the full property dump, verbatim.
    if propnames.is_empty() {
        println!("{}", device.shell_output("getprop")?);
        return Ok(());
    }

    if propnames.len() == 1 {
        println!("{}", device.getprop(&propnames[0])?);
        return Ok(());
    }

    let props = device.getprops_parallel(propnames).await;
    match cli.output {
        OutputType::Json => output::print_json(&props),
        _ => {
            // Preserve the order properties were asked for.
            for name in propnames {
                if let Some(value) = props.get(name) {
                    println!("{}: {}", name, value);
                }
            }
        }
    }
    Ok(())
}
