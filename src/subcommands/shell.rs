use crate::cli::Cli;
use crate::error::Result;
use std::io::Write;

/// Runs the command and mirrors the device-side exit code, so scripts
/// wrapping this subcommand behave like a local invocation.
pub fn run(cli: &Cli, command: &[String]) -> Result<()> {
    let command = command.join(" ");
    let result = super::resolve_device(cli)?.shell(&command)?;

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    stdout.write_all(result.stdout.as_bytes())?;
    stderr.write_all(result.stderr.as_bytes())?;
    stdout.flush()?;

    if !result.success() {
        std::process::exit(result.exit_code);
    }
    Ok(())
}
