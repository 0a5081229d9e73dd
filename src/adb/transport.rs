use crate::adb::connection::{ChunkStream, Connection};
use crate::error::{AdbError, Result};
use log::*;
use std::time::Duration;

/// The ADB host command layer over one [`Connection`].
///
/// Strictly request/response: one command per transport at a time, and
/// a fresh transport per command unless the caller switches into a
/// sub-protocol (sync, shell-v2) that takes over framing for the rest
/// of the connection's life. Sending a second command before the
/// previous response is consumed leaves the framing undefined.
pub struct Transport {
    conn: Connection,
}

impl Transport {
    /// Open a connection to the server and wrap it.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let mut conn = Connection::new(host, port, timeout);
        conn.connect()?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Send one command as `<4-hex-digit length><command>` and check
    /// the status word.
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        debug!("sending command: {}", command);
        let request = format!("{:04x}{}", command.len(), command);
        self.conn.write_all(request.as_bytes())?;
        self.check_okay()
    }

    /// Read the 4-byte status word. `FAIL` carries a string-block
    /// message and becomes a `Protocol` error; anything that is
    /// neither `OKAY` nor `FAIL` is a transport-level violation.
    pub fn check_okay(&mut self) -> Result<()> {
        let status = self.conn.read_exact(4)?;
        match status.as_slice() {
            b"OKAY" => Ok(()),
            b"FAIL" => {
                let message = self.read_string_block()?;
                Err(AdbError::Protocol(message))
            }
            other => Err(AdbError::Connection(format!(
                "unexpected response: {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// Read a length-prefixed string block: 4 ASCII hex digits (either
    /// case), then that many bytes. Trailing whitespace is trimmed.
    pub fn read_string_block(&mut self) -> Result<String> {
        let header = self.conn.read_exact(4)?;
        let length = parse_hex_length(&header)?;
        if length == 0 {
            return Ok(String::new());
        }
        let body = self.conn.read_exact(length)?;
        Ok(String::from_utf8_lossy(&body).trim_end().to_string())
    }

    /// Send a command whose reply is a length-prefixed string block.
    pub fn request_with_string_block(&mut self, command: &str) -> Result<String> {
        self.send_command(command)?;
        self.read_string_block()
    }

    /// Send a command whose reply is terminated by connection close.
    pub fn request_with_fully(&mut self, command: &str) -> Result<Vec<u8>> {
        self.send_command(command)?;
        self.conn.read_to_end()
    }

    /// Send a command whose reply is naturally streamed (shell output).
    pub fn request_with_stream(&mut self, command: &str) -> Result<ChunkStream<'_>> {
        self.send_command(command)?;
        self.conn.read_stream()
    }

    pub(crate) fn connection(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn close(&mut self) {
        self.conn.close();
    }
}

fn parse_hex_length(header: &[u8]) -> Result<usize> {
    std::str::from_utf8(header)
        .ok()
        .and_then(|text| usize::from_str_radix(text, 16).ok())
        .ok_or_else(|| {
            AdbError::Connection(format!(
                "malformed length header: {:?}",
                String::from_utf8_lossy(header)
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, MockServer};
    use std::io::Write as _;
    use std::time::Duration;

    fn connect(server: &MockServer) -> Transport {
        Transport::connect(
            &server.addr.ip().to_string(),
            server.addr.port(),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[test]
    fn hex_length_round_trips() {
        for len in [0usize, 1, 15, 255, 4095, 4096, 65535] {
            let encoded = format!("{:04x}", len);
            assert_eq!(encoded.len(), 4);
            assert_eq!(parse_hex_length(encoded.as_bytes()).unwrap(), len);
            // Either case is accepted on read.
            let upper = encoded.to_uppercase();
            assert_eq!(parse_hex_length(upper.as_bytes()).unwrap(), len);
        }
    }

    #[test]
    fn non_hex_length_header_is_rejected() {
        assert!(matches!(
            parse_hex_length(b"zzzz"),
            Err(AdbError::Connection(_))
        ));
        assert!(matches!(
            parse_hex_length(&[0x00, 0x01, 0x02, 0x03]),
            Err(AdbError::Connection(_))
        ));
    }

    #[test]
    fn send_command_emits_length_prefix_and_reads_okay() {
        let server = MockServer::spawn(|stream| {
            let command = testing::expect_command(stream);
            testing::send_okay(stream);
            command.into_bytes()
        });
        let mut transport = connect(&server);
        transport.send_command("host:version").unwrap();
        assert_eq!(server.finish(), b"host:version");
    }

    #[test]
    fn fail_status_surfaces_server_message_as_protocol_error() {
        let server = MockServer::spawn(|stream| {
            testing::expect_command(stream);
            testing::send_fail(stream, "no devices");
            Vec::new()
        });
        let mut transport = connect(&server);
        let err = transport.send_command("host:transport-any").unwrap_err();
        match err {
            AdbError::Protocol(message) => assert_eq!(message, "no devices"),
            other => panic!("expected Protocol error, got {:?}", other),
        }
        server.finish();
    }

    #[test]
    fn garbage_status_word_is_a_connection_error() {
        let server = MockServer::spawn(|stream| {
            testing::expect_command(stream);
            stream.write_all(b"WHAT").unwrap();
            Vec::new()
        });
        let mut transport = connect(&server);
        let err = transport.send_command("host:version").unwrap_err();
        match err {
            AdbError::Connection(msg) => assert!(msg.contains("unexpected response"), "{}", msg),
            other => panic!("expected Connection error, got {:?}", other),
        }
        server.finish();
    }

    #[test]
    fn string_block_reply_is_trimmed() {
        let server = MockServer::spawn(|stream| {
            testing::expect_command(stream);
            testing::send_okay(stream);
            stream.write_all(b"0008002e\r\n\t ").unwrap();
            Vec::new()
        });
        let mut transport = connect(&server);
        let version = transport.request_with_string_block("host:version").unwrap();
        assert_eq!(version, "002e");
        server.finish();
    }

    #[test]
    fn zero_length_string_block_reads_no_body() {
        let server = MockServer::spawn(|stream| {
            testing::expect_command(stream);
            testing::send_okay(stream);
            stream.write_all(b"0000").unwrap();
            Vec::new()
        });
        let mut transport = connect(&server);
        assert_eq!(
            transport.request_with_string_block("host:devices").unwrap(),
            ""
        );
        server.finish();
    }

    #[test]
    fn request_with_fully_reads_until_close() {
        let server = MockServer::spawn(|stream| {
            testing::expect_command(stream);
            testing::send_okay(stream);
            stream.write_all(b"raw output until close\n").unwrap();
            Vec::new()
        });
        let mut transport = connect(&server);
        let reply = transport.request_with_fully("shell:echo hi").unwrap();
        assert_eq!(reply, b"raw output until close\n");
        server.finish();
    }

    #[test]
    fn request_with_stream_yields_until_close() {
        let server = MockServer::spawn(|stream| {
            testing::expect_command(stream);
            testing::send_okay(stream);
            stream.write_all(b"chunk").unwrap();
            Vec::new()
        });
        let mut transport = connect(&server);
        let chunks: Vec<Vec<u8>> = transport
            .request_with_stream("shell:yes")
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(chunks.concat(), b"chunk");
        server.finish();
    }
}
