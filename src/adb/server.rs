use crate::adb::protocol::HostCommand;
use crate::adb::transport::Transport;
use crate::error::{AdbError, Result};
use crate::types::{Device, DeviceState};
use log::*;
use regex::Regex;
use std::net::{TcpStream, ToSocketAddrs};
use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;

const SERVER_START_DELAY: Duration = Duration::from_secs(1);
const SERVER_CHECK_TIMEOUT: Duration = Duration::from_millis(500);

// "0123456789ABCDEF       device product:blazer model:Blazer device:blazer transport_id:1"
static DEVICE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+(\S+)\s*(.*)$").unwrap());

/// Host services of the ADB server: enumeration and lifecycle. Every
/// call opens its own short-lived transport.
pub struct AdbHost {
    host: String,
    port: u16,
    timeout: Duration,
}

impl AdbHost {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    fn transport(&self) -> Result<Transport> {
        Transport::connect(&self.host, self.port, self.timeout)
    }

    /// Server protocol version, e.g. 41.
    pub fn version(&self) -> Result<u32> {
        let raw = self
            .transport()?
            .request_with_string_block(&HostCommand::Version.format(&[]))?;
        u32::from_str_radix(&raw, 16)
            .map_err(|_| AdbError::Protocol(format!("invalid version string {:?}", raw)))
    }

    /// Snapshot of connected devices. A value, not a live view:
    /// callers pass it around instead of sharing mutable state.
    pub fn devices(&self) -> Result<Vec<Device>> {
        let block = self
            .transport()?
            .request_with_string_block(&HostCommand::DevicesLong.format(&[]))?;
        Ok(block.lines().filter_map(parse_device_line).collect())
    }

    /// Resolve a serial prefix to exactly one device.
    pub fn find_device(&self, needle: &str) -> Result<Device> {
        let devices = self.devices()?;
        let matches: Vec<&Device> = devices
            .iter()
            .filter(|d| d.id.as_str().starts_with(needle))
            .collect();
        match matches.len() {
            0 => Err(AdbError::DeviceNotFound(needle.to_string())),
            1 => Ok(matches[0].clone()),
            _ => Err(AdbError::MultipleDevicesFound),
        }
    }

    /// Ask the server to exit. The server closes the connection
    /// right after acknowledging.
    pub fn kill(&self) -> Result<()> {
        self.transport()?
            .send_command(&HostCommand::Kill.format(&[]))
    }

    /// Cheap liveness probe: can we open the server port?
    pub fn is_running(&self) -> bool {
        let address = match format!("{}:{}", self.host, self.port).to_socket_addrs() {
            Ok(mut addrs) => match addrs.next() {
                Some(addr) => addr,
                None => return false,
            },
            Err(_) => return false,
        };
        TcpStream::connect_timeout(&address, SERVER_CHECK_TIMEOUT).is_ok()
    }

    /// Start the server by spawning the `adb` binary (honors
    /// `ADB_PATH`).
    pub fn start(&self) -> Result<()> {
        info!("starting adb server on port {}", self.port);
        let adb = std::env::var("ADB_PATH").unwrap_or_else(|_| "adb".to_string());
        let output = Command::new(&adb)
            .args(["-P", &self.port.to_string(), "start-server"])
            .output()
            .map_err(|e| AdbError::Server(format!("failed to execute {}: {}", adb, e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AdbError::Server(format!(
                "failed to start adb server: {}",
                stderr.trim()
            )));
        }
        std::thread::sleep(SERVER_START_DELAY);
        Ok(())
    }
}

/// Parse one `host:devices-l` line. Returns `None` for blanks.
fn parse_device_line(line: &str) -> Option<Device> {
    let captures = DEVICE_LINE.captures(line.trim())?;
    let serial = captures.get(1)?.as_str();
    if serial.is_empty() {
        return None;
    }
    let mut device = Device::new(serial).with_state(DeviceState::parse(captures.get(2)?.as_str()));

    // Remainder is "key:value" pairs; unknown keys are ignored.
    if let Some(rest) = captures.get(3) {
        for pair in rest.as_str().split_whitespace() {
            if let Some((key, value)) = pair.split_once(':') {
                match key {
                    "product" => device.product = Some(value.to_string()),
                    "model" => device.model = Some(value.to_string()),
                    "device" => device.device = Some(value.to_string()),
                    "transport_id" => device.transport_id = value.parse().ok(),
                    _ => {}
                }
            }
        }
    }
    Some(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, MockServer};
    use std::io::Write as _;

    fn host_for(server: &MockServer) -> AdbHost {
        AdbHost::new(
            server.addr.ip().to_string(),
            server.addr.port(),
            Duration::from_secs(2),
        )
    }

    #[test]
    fn parse_short_line() {
        let device = parse_device_line("00d14B141FDCH0001U         device").unwrap();
        assert_eq!(device.id.as_str(), "00d14B141FDCH0001U");
        assert_eq!(device.state, DeviceState::Device);
        assert!(device.model.is_none());
    }

    #[test]
    fn parse_full_line() {
        let line = "00d14B141FDCH0001U device usb:1-9 product:blazer model:Blazer device:blazer transport_id:1";
        let device = parse_device_line(line).unwrap();
        assert_eq!(device.product.as_deref(), Some("blazer"));
        assert_eq!(device.model.as_deref(), Some("Blazer"));
        assert_eq!(device.device.as_deref(), Some("blazer"));
        assert_eq!(device.transport_id, Some(1));
    }

    #[test]
    fn parse_emulator_line_without_usb() {
        let line = "emulator-5554 device product:sdk_gphone64_x86_64 model:sdk_gphone64_x86_64 device:emu64xa transport_id:3";
        let device = parse_device_line(line).unwrap();
        assert_eq!(device.id.as_str(), "emulator-5554");
        assert_eq!(device.transport_id, Some(3));
    }

    #[test]
    fn parse_unauthorized_line() {
        let device = parse_device_line("abc123 unauthorized").unwrap();
        assert_eq!(device.state, DeviceState::Unauthorized);
        assert!(!device.is_available());
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(parse_device_line("").is_none());
        assert!(parse_device_line("   ").is_none());
    }

    #[test]
    fn version_parses_hex_block() {
        let server = MockServer::spawn(|stream| {
            let command = testing::expect_command(stream);
            testing::send_okay(stream);
            stream.write_all(b"00040029").unwrap();
            command.into_bytes()
        });
        let host = host_for(&server);
        assert_eq!(host.version().unwrap(), 0x29);
        assert_eq!(server.finish(), b"host:version");
    }

    #[test]
    fn devices_returns_typed_snapshot() {
        let server = MockServer::spawn(|stream| {
            testing::expect_command(stream);
            testing::send_okay(stream);
            let listing = "emulator-5554 device product:sdk model:sdk device:emu transport_id:3\nabc123 offline\n";
            let block = format!("{:04x}{}", listing.len(), listing);
            stream.write_all(block.as_bytes()).unwrap();
            Vec::new()
        });
        let host = host_for(&server);
        let devices = host.devices().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id.as_str(), "emulator-5554");
        assert!(devices[0].is_available());
        assert_eq!(devices[1].state, DeviceState::Offline);
        server.finish();
    }

    #[test]
    fn find_device_matches_unique_prefix() {
        let listing = "emulator-5554 device\nemulator-5556 device\nserialXYZ device\n";
        for (needle, expectation) in [
            ("serial", Ok("serialXYZ")),
            ("emulator-5554", Ok("emulator-5554")),
            ("emulator", Err(())),
            ("nope", Err(())),
        ] {
            let listing = listing.to_string();
            let server = MockServer::spawn(move |stream| {
                testing::expect_command(stream);
                testing::send_okay(stream);
                let block = format!("{:04x}{}", listing.len(), listing);
                stream.write_all(block.as_bytes()).unwrap();
                Vec::new()
            });
            let host = host_for(&server);
            match (host.find_device(needle), expectation) {
                (Ok(device), Ok(serial)) => assert_eq!(device.id.as_str(), serial),
                (Err(AdbError::DeviceNotFound(n)), Err(())) => assert_eq!(n, "nope"),
                (Err(AdbError::MultipleDevicesFound), Err(())) => {}
                (got, want) => panic!("needle {:?}: got {:?}, want {:?}", needle, got, want),
            }
            server.finish();
        }
    }
}
