pub mod adb;
pub mod cli;
pub mod device;
pub mod error;
pub mod output;
pub mod subcommands;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use adb::connection::{ChunkStream, Connection};
pub use adb::server::AdbHost;
pub use adb::shell::{ShellCommand, ShellResult};
pub use adb::sync::{SyncEngine, SyncReader};
pub use adb::transport::Transport;
pub use device::AdbDevice;
pub use error::{AdbError, Result};
