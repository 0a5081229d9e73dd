use crate::adb::protocol::{DirEntry, FileStat, HostCommand};
use crate::adb::shell::{ShellCommand, ShellResult};
use crate::adb::sync::SyncEngine;
use crate::adb::transport::Transport;
use crate::error::{AdbError, Result};
use crate::types::DeviceId;
use indicatif::{ProgressBar, ProgressStyle};
use log::*;
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::Path;
use std::time::Duration;

/// High-level operations against one device. Thin call sites over the
/// protocol core: each operation opens a fresh transport, selects the
/// device, converses and closes. Cheap to clone, so callers can fan
/// out across tasks.
#[derive(Debug, Clone)]
pub struct AdbDevice {
    host: String,
    port: u16,
    timeout: Duration,
    serial: Option<DeviceId>,
}

impl AdbDevice {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            serial: None,
        }
    }

    /// Target a specific device instead of "any".
    pub fn with_serial(mut self, serial: impl Into<DeviceId>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Open a transport and bind it to this device.
    fn transport(&self) -> Result<Transport> {
        let mut transport = Transport::connect(&self.host, self.port, self.timeout)?;
        let selector = match &self.serial {
            Some(serial) => HostCommand::TransportSerial.format(&[serial.as_str()]),
            None => HostCommand::TransportAny.format(&[]),
        };
        transport.send_command(&selector)?;
        Ok(transport)
    }

    /// Run a command through shell-v2 and collect the full result.
    pub fn shell(&self, command: &str) -> Result<ShellResult> {
        let mut transport = self.transport()?;
        ShellCommand::new(command).execute(&mut transport)
    }

    /// Shortcut for callers that only want combined output.
    pub fn shell_output(&self, command: &str) -> Result<String> {
        Ok(self.shell(command)?.output.trim().to_string())
    }

    /// Get a single device property
    pub fn getprop(&self, name: &str) -> Result<String> {
        self.shell_output(&format!("getprop {}", name))
    }

    /// Fetch several properties concurrently, one transport per
    /// property. Properties that fail to resolve are omitted.
    pub async fn getprops_parallel(&self, names: &[String]) -> HashMap<String, String> {
        let mut tasks = Vec::new();
        for name in names {
            let device = self.clone();
            let name = name.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                let value = device.getprop(&name);
                (name, value)
            }));
        }

        let mut props = HashMap::new();
        for task in tasks {
            if let Ok((name, Ok(value))) = task.await {
                props.insert(name, value);
            }
        }
        props
    }

    /// Stat a remote path.
    pub fn stat(&self, remote: &str) -> Result<FileStat> {
        let mut sync = SyncEngine::open(self.transport()?)?;
        let stat = sync.stat(remote)?;
        sync.quit()?;
        Ok(stat)
    }

    /// List a remote directory.
    pub fn list(&self, remote: &str) -> Result<Vec<DirEntry>> {
        let mut sync = SyncEngine::open(self.transport()?)?;
        let entries = sync.list(remote)?;
        sync.quit()?;
        Ok(entries)
    }

    /// Push a local file, returning the bytes sent.
    pub fn push(&self, local: &Path, remote: &str, verify: bool, progress: bool) -> Result<u64> {
        let mut sync = SyncEngine::open(self.transport()?)?;
        if progress {
            let total = fs::metadata(local)?.len();
            sync = sync.with_progress(transfer_bar(total));
        }
        let sent = sync.push(local, remote, None, verify)?;
        sync.quit()?;
        Ok(sent)
    }

    /// Pull a remote file into `local`, returning the bytes written.
    /// Restores the remote permission bits on unix.
    pub fn pull(&self, remote: &str, local: &Path, progress: bool) -> Result<u64> {
        let mut sync = SyncEngine::open(self.transport()?)?;
        let stat = sync.stat(remote)?;
        if !stat.is_file() {
            return Err(AdbError::FileTransfer(format!(
                "can only pull regular files: {} is a {}",
                remote,
                stat.file_type()
            )));
        }
        if progress {
            sync = sync.with_progress(transfer_bar(u64::from(stat.size)));
        }

        let mut file = File::create(local)?;
        let written = sync.pull(remote, &mut file)?;
        sync.quit()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(local, fs::Permissions::from_mode(stat.mode & 0o777))?;
        }

        info!("pulled {} to {}", remote, local.display());
        Ok(written)
    }
}

fn transfer_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}
