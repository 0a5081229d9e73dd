use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdbError>;

/// Errors surfaced by the ADB client.
///
/// `Connection` covers everything socket-level (refused, timed out,
/// short reads, malformed framing); it is always fatal to the current
/// connection. `Protocol` and `SyncFailure` are well-framed failures
/// reported by the server; callers may retry with a fresh transport.
/// Nothing in this crate retries internally.
#[derive(Debug, Error)]
pub enum AdbError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("adb protocol error: {0}")]
    Protocol(String),

    #[error("sync transfer of {path} failed: {message}")]
    SyncFailure { path: String, message: String },

    #[error("file transfer error: {0}")]
    FileTransfer(String),

    #[error("adb server error: {0}")]
    Server(String),

    #[error("no device found matching {0}")]
    DeviceNotFound(String),

    #[error("multiple devices match; specify a longer serial prefix")]
    MultipleDevicesFound,

    /// Local filesystem errors only. Socket errors are mapped to
    /// `Connection` at the call site.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AdbError {
    /// True for errors reported by the server over an intact framing
    /// layer, as opposed to transport-level failures.
    pub fn is_server_reported(&self) -> bool {
        matches!(self, AdbError::Protocol(_) | AdbError::SyncFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = AdbError::Connection("unexpected EOF".to_string());
        assert_eq!(err.to_string(), "connection error: unexpected EOF");

        let err = AdbError::SyncFailure {
            path: "/sdcard/x".to_string(),
            message: "remote open failed".to_string(),
        };
        assert!(err.to_string().contains("/sdcard/x"));
        assert!(err.to_string().contains("remote open failed"));
    }

    #[test]
    fn server_reported_classification() {
        assert!(AdbError::Protocol("no devices".into()).is_server_reported());
        assert!(!AdbError::Connection("refused".into()).is_server_reported());
    }
}
