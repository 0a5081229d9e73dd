//! Scripted TCP servers for protocol tests.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

/// A one-connection TCP server running a scripted conversation on a
/// background thread. The script returns whatever bytes the test wants
/// to assert on (typically the captured request).
pub struct MockServer {
    pub addr: SocketAddr,
    handle: Option<JoinHandle<Vec<u8>>>,
}

impl MockServer {
    pub fn spawn<F>(script: F) -> Self
    where
        F: FnOnce(&mut TcpStream) -> Vec<u8> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            script(&mut stream)
        });
        Self {
            addr,
            handle: Some(handle),
        }
    }

    /// Join the script thread, propagating its panics (failed
    /// server-side assertions) into the test.
    pub fn finish(mut self) -> Vec<u8> {
        self.handle.take().unwrap().join().unwrap()
    }
}

pub fn read_array<const N: usize>(stream: &mut TcpStream) -> [u8; N] {
    let mut buf = [0u8; N];
    stream.read_exact(&mut buf).unwrap();
    buf
}

pub fn read_vec(stream: &mut TcpStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    stream.read_exact(&mut buf).unwrap();
    buf
}

/// Read one `<4-hex-digit length><command>` frame.
pub fn expect_command(stream: &mut TcpStream) -> String {
    let header = read_array::<4>(stream);
    let len = usize::from_str_radix(std::str::from_utf8(&header).unwrap(), 16).unwrap();
    String::from_utf8(read_vec(stream, len)).unwrap()
}

pub fn send_okay(stream: &mut TcpStream) {
    stream.write_all(b"OKAY").unwrap();
}

/// `FAIL` status followed by a string-block message.
pub fn send_fail(stream: &mut TcpStream, message: &str) {
    stream.write_all(b"FAIL").unwrap();
    let block = format!("{:04x}{}", message.len(), message);
    stream.write_all(block.as_bytes()).unwrap();
}
