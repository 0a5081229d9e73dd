use crate::cli::{Cli, ServerOperation};
use crate::error::{AdbError, Result};
use log::*;

pub fn run(cli: &Cli, operation: ServerOperation) -> Result<()> {
    let host = super::adb_host(cli);
    match operation {
        ServerOperation::Start => {
            if host.is_running() {
                println!("ADB server is already running");
            } else {
                debug!("starting ADB server");
                host.start()?;
                println!("ADB server started");
            }
        }
        ServerOperation::Status => {
            if host.is_running() {
                println!("ADB server is running (version {})", host.version()?);
            } else {
                println!("ADB server is not running");
            }
        }
        ServerOperation::Kill => match host.kill() {
            Ok(()) => println!("ADB server stopped"),
            // A refused connection means there was nothing to stop.
            Err(AdbError::Connection(e)) if e.contains("refused") => {
                println!("ADB server is not running");
            }
            Err(e) => return Err(e),
        },
    }
    Ok(())
}
