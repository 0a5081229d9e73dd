use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// File type constants (from stat.h)
// =============================================================================

pub const S_IFMT: u32 = 0o170000; // bit mask for the file type bit field
pub const S_IFSOCK: u32 = 0o140000; // socket
pub const S_IFLNK: u32 = 0o120000; // symbolic link
pub const S_IFREG: u32 = 0o100000; // regular file
pub const S_IFBLK: u32 = 0o060000; // block device
pub const S_IFDIR: u32 = 0o040000; // directory
pub const S_IFCHR: u32 = 0o020000; // character device
pub const S_IFIFO: u32 = 0o010000; // FIFO

// =============================================================================
// Host commands
// =============================================================================

/// The host commands this client issues, as templates.
#[derive(Debug, Clone, Copy)]
pub enum HostCommand {
    // Server operations
    Version,
    Devices,
    DevicesLong,
    Kill,

    // Device selection
    TransportAny,
    TransportSerial,

    // Sub-protocol entry points
    Shell,
    ShellV2,
    Sync,
}

impl HostCommand {
    fn template(&self) -> &'static str {
        match self {
            Self::Version => "host:version",
            Self::Devices => "host:devices",
            Self::DevicesLong => "host:devices-l",
            Self::Kill => "host:kill",

            Self::TransportAny => "host:transport-any",
            Self::TransportSerial => "host:transport:{}",

            Self::Shell => "shell:{}",
            Self::ShellV2 => "shell,v2:{}",
            Self::Sync => "sync:",
        }
    }

    pub fn format(&self, args: &[&str]) -> String {
        let template = self.template();
        if args.is_empty() {
            template.to_string()
        } else {
            template.replace("{}", &args.join(" "))
        }
    }
}

// =============================================================================
// Sync sub-protocol metadata
// =============================================================================

/// Remote file metadata from a sync `STAT` reply. An immutable
/// snapshot; nothing keeps it in sync with the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// Unix `st_mode` bits
    pub mode: u32,
    pub size: u32,
    /// Seconds since the epoch; `None` when the device reported 0,
    /// which means "no mtime available", not the epoch itself.
    pub mtime: Option<u32>,
}

impl FileStat {
    pub fn from_wire(mode: u32, size: u32, mtime: u32) -> Self {
        Self {
            mode,
            size,
            mtime: if mtime == 0 { None } else { Some(mtime) },
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    pub fn is_file(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & S_IFMT == S_IFLNK
    }

    pub fn mtime_utc(&self) -> Option<DateTime<Utc>> {
        self.mtime
            .and_then(|secs| DateTime::from_timestamp(i64::from(secs), 0))
    }

    pub fn file_type(&self) -> &'static str {
        match self.mode & S_IFMT {
            S_IFSOCK => "socket",
            S_IFLNK => "symlink",
            S_IFREG => "file",
            S_IFBLK => "block",
            S_IFDIR => "directory",
            S_IFCHR => "char",
            S_IFIFO => "fifo",
            _ => "unknown",
        }
    }

    /// `ls -l` style mode string, e.g. `drwxr-xr-x`.
    pub fn permissions_string(&self) -> String {
        let file_type = match self.mode & S_IFMT {
            S_IFIFO => "p",
            S_IFCHR => "c",
            S_IFDIR => "d",
            S_IFBLK => "b",
            S_IFREG => "-",
            S_IFLNK => "l",
            S_IFSOCK => "s",
            _ => "?",
        };
        format!(
            "{}{}{}{}",
            file_type,
            permission_triplet(self.mode >> 6, self.mode & 0o4000 != 0),
            permission_triplet(self.mode >> 3, self.mode & 0o2000 != 0),
            permission_triplet(self.mode, self.mode & 0o1000 != 0),
        )
    }
}

fn permission_triplet(mode: u32, special: bool) -> String {
    let mut triplet = String::with_capacity(3);
    triplet.push(if mode & 4 != 0 { 'r' } else { '-' });
    triplet.push(if mode & 2 != 0 { 'w' } else { '-' });
    triplet.push(match (mode & 1 != 0, special) {
        (false, false) => '-',
        (true, false) => 'x',
        (false, true) => 'S',
        (true, true) => 's',
    });
    triplet
}

impl fmt::Display for FileStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:>10} {}",
            self.permissions_string(),
            self.file_type(),
            self.size,
            self.mtime_utc()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
        )
    }
}

/// One row of a sync `LIST` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(flatten)]
    pub stat: FileStat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_formatting() {
        assert_eq!(HostCommand::Version.format(&[]), "host:version");
        assert_eq!(HostCommand::DevicesLong.format(&[]), "host:devices-l");
        assert_eq!(HostCommand::Sync.format(&[]), "sync:");
        assert_eq!(
            HostCommand::TransportSerial.format(&["emulator-5554"]),
            "host:transport:emulator-5554"
        );
        assert_eq!(HostCommand::TransportAny.format(&[]), "host:transport-any");
        assert_eq!(HostCommand::Shell.format(&["ls -la /data"]), "shell:ls -la /data");
        assert_eq!(
            HostCommand::ShellV2.format(&["echo 'hello world'"]),
            "shell,v2:echo 'hello world'"
        );
    }

    #[test]
    fn command_formatting_joins_multiple_args() {
        assert_eq!(
            HostCommand::Shell.format(&["am", "force-stop", "com.example.app"]),
            "shell:am force-stop com.example.app"
        );
    }

    #[test]
    fn stat_directory_bit() {
        let dir = FileStat::from_wire(0o040755, 4096, 1_700_000_000);
        assert!(dir.is_dir());
        assert!(!dir.is_file());
        assert_eq!(dir.file_type(), "directory");

        let file = FileStat::from_wire(0o100644, 10, 1_700_000_000);
        assert!(file.is_file());
        assert!(!file.is_dir());
    }

    #[test]
    fn zero_mtime_is_absent_not_epoch() {
        let stat = FileStat::from_wire(0o100644, 1, 0);
        assert_eq!(stat.mtime, None);
        assert_eq!(stat.mtime_utc(), None);

        let stat = FileStat::from_wire(0o100644, 1, 1);
        assert_eq!(stat.mtime, Some(1));
        assert!(stat.mtime_utc().is_some());
    }

    #[test]
    fn permissions_strings() {
        assert_eq!(
            FileStat::from_wire(0o100644, 0, 0).permissions_string(),
            "-rw-r--r--"
        );
        assert_eq!(
            FileStat::from_wire(0o040755, 0, 0).permissions_string(),
            "drwxr-xr-x"
        );
        assert_eq!(
            FileStat::from_wire(0o104755, 0, 0).permissions_string(),
            "-rwsr-xr-x"
        );
        assert_eq!(
            FileStat::from_wire(0o120777, 0, 0).permissions_string(),
            "lrwxrwxrwx"
        );
    }
}
