pub mod devices;
pub mod getprop;
pub mod ls;
pub mod pull;
pub mod push;
pub mod server;
pub mod shell;
pub mod stat;
pub mod version;

use crate::adb::server::AdbHost;
use crate::cli::Cli;
use crate::device::AdbDevice;
use crate::error::Result;
use std::time::Duration;

pub(crate) fn adb_host(cli: &Cli) -> AdbHost {
    AdbHost::new(&cli.host, cli.port, Duration::from_secs(cli.timeout))
}

/// Build the device handle for this invocation. A serial flag may be a
/// prefix, so it is resolved against the live device list first.
pub(crate) fn resolve_device(cli: &Cli) -> Result<AdbDevice> {
    let device = AdbDevice::new(&cli.host, cli.port, Duration::from_secs(cli.timeout));
    match &cli.serial {
        Some(needle) => {
            let found = adb_host(cli).find_device(needle)?;
            Ok(device.with_serial(found.id))
        }
        None => Ok(device),
    }
}
