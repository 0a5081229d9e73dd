use crate::adb::protocol::HostCommand;
use crate::adb::transport::Transport;
use crate::error::{AdbError, Result};
use log::*;
use serde::{Deserialize, Serialize};

pub const MSG_STDOUT: u8 = 1;
pub const MSG_STDERR: u8 = 2;
pub const MSG_EXIT: u8 = 3;

const HEADER_LEN: usize = 5;

/// Reported when the stream ends without an exit frame.
pub const UNKNOWN_EXIT_CODE: i32 = 255;

/// Outcome of one shell-v2 conversation, built once the terminal
/// message is seen. `output` preserves arrival order across stdout and
/// stderr.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellResult {
    pub command: String,
    pub exit_code: i32,
    pub output: String,
    pub stdout: String,
    pub stderr: String,
}

impl ShellResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A command executed through the `shell,v2:` sub-protocol.
pub struct ShellCommand {
    command: String,
}

impl ShellCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Issue the command on an open transport and decode the
    /// multiplexed reply. The transport is consumed by the
    /// conversation and should be discarded afterwards.
    pub fn execute(&self, transport: &mut Transport) -> Result<ShellResult> {
        transport.send_command(&HostCommand::ShellV2.format(&[&self.command]))?;
        decode(transport, &self.command)
    }
}

/// Decode a shell-v2 stream: 1-byte kind, u32-LE payload length,
/// payload. Zero-length frames are legal no-ops. The exit frame's
/// single payload byte is the process exit code and ends the loop; a
/// clean close at a header boundary ends it with the sentinel 255.
pub fn decode(transport: &mut Transport, command: &str) -> Result<ShellResult> {
    let mut stdout: Vec<u8> = Vec::new();
    let mut stderr: Vec<u8> = Vec::new();
    let mut combined: Vec<u8> = Vec::new();
    let mut exit_code = UNKNOWN_EXIT_CODE;

    loop {
        let header = match transport.connection().read_exact_or_eof(HEADER_LEN)? {
            Some(header) => header,
            None => {
                warn!("shell stream closed without an exit frame");
                break;
            }
        };
        let kind = header[0];
        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&header[1..5]);
        let length = u32::from_le_bytes(length_bytes) as usize;
        if length == 0 {
            continue;
        }
        let payload = transport.connection().read_exact(length)?;
        match kind {
            MSG_STDOUT => {
                stdout.extend_from_slice(&payload);
                combined.extend_from_slice(&payload);
            }
            MSG_STDERR => {
                stderr.extend_from_slice(&payload);
                combined.extend_from_slice(&payload);
            }
            MSG_EXIT => {
                exit_code = i32::from(payload[0]);
                break;
            }
            other => {
                return Err(AdbError::Protocol(format!(
                    "unknown shell message kind {}",
                    other
                )))
            }
        }
    }

    debug!("shell command {:?} exited with {}", command, exit_code);
    Ok(ShellResult {
        command: command.to_string(),
        exit_code,
        output: String::from_utf8_lossy(&combined).into_owned(),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}
