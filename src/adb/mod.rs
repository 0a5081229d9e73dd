pub mod connection;
pub mod protocol;
pub mod server;
pub mod shell;
pub mod sync;
pub mod transport;
