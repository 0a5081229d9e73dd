use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputType {
    Table,
    Json,
    Plain,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Commands>,

    /// ADB server hostname
    #[arg(long, global = true, default_value = "localhost")]
    pub host: String,

    /// ADB server port
    #[arg(long, short = 'p', global = true, default_value_t = 5037)]
    pub port: u16,

    /// Connection timeout in seconds
    #[arg(long, global = true, default_value_t = 5)]
    pub timeout: u64,

    /// Device serial, or a unique prefix of one
    #[arg(long, short = 's', global = true)]
    pub serial: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "table")]
    pub output: OutputType,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Lists connected devices
    Devices,

    /// Runs a command on a device through shell-v2
    Shell {
        /// Command and arguments, joined with spaces
        #[arg(allow_hyphen_values = true, trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Copies a local file to the device
    Push {
        /// Local file to send
        local: PathBuf,
        /// Destination path on the device
        remote: String,
        /// Re-stat after the transfer and compare sizes
        #[arg(long)]
        verify: bool,
    },

    /// Copies a file from the device
    Pull {
        /// Remote file to fetch
        remote: String,
        /// Local destination path
        local: PathBuf,
    },

    /// Lists a directory on the device
    Ls {
        /// Remote directory path
        path: String,
    },

    /// Shows file metadata for a remote path
    Stat {
        /// Remote path
        path: String,
    },

    /// Gets device properties. If empty, all properties are shown
    Getprop {
        /// Property names to query
        propnames: Vec<String>,
    },

    /// Gets the server protocol version
    Version,

    /// Manage ADB server
    Server {
        /// Server operation to perform
        #[arg(value_enum)]
        operation: ServerOperation,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum ServerOperation {
    Start,
    Status,
    Kill,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Devices)
    }
}
