use crate::error::{AdbError, Result};
use log::*;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

pub const DEFAULT_PORT: u16 = 5037;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const READ_BUFFER_SIZE: usize = 4096;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One TCP conversation with the ADB server.
///
/// Exposes exact-length reads, raw writes, a best-effort drain and a
/// polled chunk stream; it knows nothing about framing above the
/// socket. A connection carries at most one conversation at a time and
/// is closed exactly once, on `close` or on drop.
pub struct Connection {
    host: String,
    port: u16,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl Connection {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            stream: None,
        }
    }

    /// Open the TCP stream and arm read/write timeouts.
    pub fn connect(&mut self) -> Result<()> {
        let address = self.resolve()?;
        debug!("connecting to {}", address);

        let stream = TcpStream::connect_timeout(&address, self.timeout).map_err(|e| {
            AdbError::Connection(format!(
                "cannot connect to {}:{}: {}",
                self.host, self.port, e
            ))
        })?;
        stream
            .set_read_timeout(Some(self.timeout))
            .and_then(|_| stream.set_write_timeout(Some(self.timeout)))
            .map_err(|e| AdbError::Connection(format!("cannot set socket timeouts: {}", e)))?;

        self.stream = Some(stream);
        Ok(())
    }

    fn resolve(&self) -> Result<SocketAddr> {
        // The server binds 127.0.0.1, not necessarily ::1
        let host = if self.host == "localhost" {
            "127.0.0.1"
        } else {
            self.host.as_str()
        };
        let mut addresses = format!("{}:{}", host, self.port)
            .to_socket_addrs()
            .map_err(|e| AdbError::Connection(format!("cannot resolve {}: {}", self.host, e)))?;
        addresses
            .next()
            .ok_or_else(|| AdbError::Connection(format!("cannot resolve {}", self.host)))
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| AdbError::Connection("connection is closed".to_string()))
    }

    /// Write the whole buffer or fail.
    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.stream()?
            .write_all(buf)
            .map_err(|e| AdbError::Connection(format!("write failed: {}", e)))
    }

    /// Read exactly `n` bytes. A peer close or timeout before the
    /// buffer fills is an error, never a short result.
    pub fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        match self.read_exact_or_eof(n)? {
            Some(buf) => Ok(buf),
            None => Err(AdbError::Connection(format!(
                "unexpected EOF, wanted {} bytes",
                n
            ))),
        }
    }

    /// Like `read_exact`, but a clean close before the first byte
    /// returns `None`. A close mid-buffer is still an error.
    pub fn read_exact_or_eof(&mut self, n: usize) -> Result<Option<Vec<u8>>> {
        let stream = self.stream()?;
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match stream.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(AdbError::Connection(format!(
                        "unexpected EOF after {} of {} bytes",
                        filled, n
                    )))
                }
                Ok(read) => filled += read,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e) if would_block(e) => {
                    return Err(AdbError::Connection(format!(
                        "read timed out after {} of {} bytes",
                        filled, n
                    )))
                }
                Err(e) => return Err(AdbError::Connection(format!("read failed: {}", e))),
            }
        }
        Ok(Some(buf))
    }

    /// Read until the peer closes, or until no further bytes arrive
    /// within the read timeout. Used for replies with no explicit
    /// framing; callers that expect text do their own trimming.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let stream = self.stream()?;
        let mut response = Vec::new();
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(read) => response.extend_from_slice(&buf[..read]),
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e) if would_block(e) => break,
                Err(e) => return Err(AdbError::Connection(format!("read failed: {}", e))),
            }
        }
        debug!("read {} bytes to end", response.len());
        Ok(response)
    }

    /// Lazy, finite sequence of available chunks.
    ///
    /// The socket is flipped to non-blocking and polled; each item is
    /// whatever data was ready at that moment, and the sequence ends
    /// when the peer closes. Blocking mode is restored when the
    /// iterator is dropped, so abandoning it early is safe. Not
    /// rewindable; a new conversation needs a new connection.
    pub fn read_stream(&mut self) -> Result<ChunkStream<'_>> {
        let timeout = self.timeout;
        let stream = self.stream()?;
        stream
            .set_nonblocking(true)
            .map_err(|e| AdbError::Connection(format!("cannot enter non-blocking mode: {}", e)))?;
        Ok(ChunkStream {
            stream,
            timeout,
            finished: false,
        })
    }

    /// Idempotent shutdown. Also invoked from `Drop`.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!("closing connection to {}:{}", self.host, self.port);
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

fn would_block(e: &std::io::Error) -> bool {
    // SO_RCVTIMEO surfaces as WouldBlock on unix, TimedOut on windows
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// Iterator over chunks of a streamed response. See
/// [`Connection::read_stream`].
pub struct ChunkStream<'a> {
    stream: &'a mut TcpStream,
    timeout: Duration,
    finished: bool,
}

impl Iterator for ChunkStream<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let deadline = Instant::now() + self.timeout;
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(read) => return Some(Ok(buf[..read].to_vec())),
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e) if would_block(e) => {
                    if Instant::now() >= deadline {
                        self.finished = true;
                        return Some(Err(AdbError::Connection(
                            "timed out waiting for stream data".to_string(),
                        )));
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(AdbError::Connection(format!(
                        "stream read failed: {}",
                        e
                    ))));
                }
            }
        }
    }
}

impl Drop for ChunkStream<'_> {
    fn drop(&mut self) {
        let _ = self.stream.set_nonblocking(false);
    }
}
