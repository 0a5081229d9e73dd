use crate::adb::protocol::{DirEntry, FileStat, HostCommand, S_IFREG};
use crate::adb::transport::Transport;
use crate::error::{AdbError, Result};
use bytes::{BufMut, BytesMut};
use chrono::Utc;
use indicatif::ProgressBar;
use log::*;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

pub const SYNC_STAT: &[u8; 4] = b"STAT";
pub const SYNC_LIST: &[u8; 4] = b"LIST";
pub const SYNC_SEND: &[u8; 4] = b"SEND";
pub const SYNC_RECV: &[u8; 4] = b"RECV";
pub const SYNC_DATA: &[u8; 4] = b"DATA";
pub const SYNC_DONE: &[u8; 4] = b"DONE";
pub const SYNC_FAIL: &[u8; 4] = b"FAIL";
pub const SYNC_OKAY: &[u8; 4] = b"OKAY";
pub const SYNC_QUIT: &[u8; 4] = b"QUIT";

const PUSH_CHUNK_SIZE: usize = 4096;

/// Upper bound on peer-declared payload lengths (DATA frames, FAIL
/// messages, directory entry names). The protocol itself never sends
/// frames anywhere near this; a larger declaration means a confused or
/// hostile peer, and trusting it would block us for the declared size.
const MAX_PAYLOAD: usize = 1024 * 1024;

/// The binary file-sync sub-protocol.
///
/// Entered by sending `sync:` on an open transport; from then on the
/// wire carries sync frames until the transport is closed. One
/// operation at a time, like everything else on a connection.
pub struct SyncEngine {
    transport: Transport,
    progress: Option<ProgressBar>,
}

impl SyncEngine {
    /// Switch an open transport into sync mode.
    pub fn open(mut transport: Transport) -> Result<Self> {
        transport.send_command(&HostCommand::Sync.format(&[]))?;
        Ok(Self {
            transport,
            progress: None,
        })
    }

    /// Attach a progress bar updated with bytes transferred.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The universal preamble: 4-byte command tag, u32-LE path length,
    /// raw path bytes.
    fn send_request(&mut self, tag: &[u8; 4], path: &str) -> Result<()> {
        debug!("sync request {:?} {}", String::from_utf8_lossy(tag), path);
        let payload = path.as_bytes();
        let mut frame = BytesMut::with_capacity(8 + payload.len());
        frame.put_slice(tag);
        frame.put_u32_le(payload.len() as u32);
        frame.put_slice(payload);
        self.transport.connection().write_all(&frame)
    }

    /// Stat a remote path.
    pub fn stat(&mut self, path: &str) -> Result<FileStat> {
        self.send_request(SYNC_STAT, path)?;
        let tag = read_tag(&mut self.transport)?;
        if &tag != SYNC_STAT {
            return Err(AdbError::Protocol(format!(
                "expected STAT reply, got {:?}",
                String::from_utf8_lossy(&tag)
            )));
        }
        let mode = read_u32_le(&mut self.transport)?;
        let size = read_u32_le(&mut self.transport)?;
        let mtime = read_u32_le(&mut self.transport)?;
        Ok(FileStat::from_wire(mode, size, mtime))
    }

    /// List a remote directory, in whatever order the device returns.
    pub fn list(&mut self, path: &str) -> Result<Vec<DirEntry>> {
        self.send_request(SYNC_LIST, path)?;
        let mut entries = Vec::new();
        loop {
            let tag = read_tag(&mut self.transport)?;
            if &tag == SYNC_DONE {
                break;
            }
            let mode = read_u32_le(&mut self.transport)?;
            let size = read_u32_le(&mut self.transport)?;
            let mtime = read_u32_le(&mut self.transport)?;
            let name_len = read_checked_len(&mut self.transport, "entry name")?;
            let name = self.transport.connection().read_exact(name_len)?;
            entries.push(DirEntry {
                name: String::from_utf8_lossy(&name).into_owned(),
                stat: FileStat::from_wire(mode, size, mtime),
            });
        }
        debug!("listed {} entries under {}", entries.len(), path);
        Ok(entries)
    }

    /// Push a local file to `remote`, returning the bytes sent.
    ///
    /// If `remote` is an existing directory the destination becomes
    /// `remote/<basename>`. `mode` defaults to the local permission
    /// bits. With `verify`, the remote path is re-statted afterwards
    /// and a size mismatch fails the transfer.
    pub fn push(
        &mut self,
        local: &Path,
        remote: &str,
        mode: Option<u32>,
        verify: bool,
    ) -> Result<u64> {
        let metadata = fs::metadata(local)?;
        if !metadata.is_file() {
            return Err(AdbError::FileTransfer(format!(
                "can only push regular files: {}",
                local.display()
            )));
        }
        let mode = mode.unwrap_or_else(|| local_mode(&metadata));

        let mut dest = remote.to_string();
        if self.stat(remote)?.is_dir() {
            let name = local.file_name().ok_or_else(|| {
                AdbError::FileTransfer(format!("source has no file name: {}", local.display()))
            })?;
            dest = format!(
                "{}/{}",
                remote.trim_end_matches('/'),
                name.to_string_lossy()
            );
        }
        info!("pushing {} to {}", local.display(), dest);

        // The regular-file bit is required by the protocol even though
        // callers only supply permission bits.
        let path_header = format!("{},{}", dest, (mode & 0o7777) | S_IFREG);
        self.send_request(SYNC_SEND, &path_header)?;

        let mut file = File::open(local)?;
        let mut buf = vec![0u8; PUSH_CHUNK_SIZE];
        let mut sent: u64 = 0;
        loop {
            let read = file.read(&mut buf)?;
            if read == 0 {
                break;
            }
            let mut frame = BytesMut::with_capacity(8 + read);
            frame.put_slice(SYNC_DATA);
            frame.put_u32_le(read as u32);
            frame.put_slice(&buf[..read]);
            self.transport.connection().write_all(&frame)?;
            sent += read as u64;
            if let Some(pb) = &self.progress {
                pb.set_position(sent);
            }
        }

        let mut done = BytesMut::with_capacity(8);
        done.put_slice(SYNC_DONE);
        done.put_u32_le(Utc::now().timestamp() as u32);
        self.transport.connection().write_all(&done)?;

        let status = read_tag(&mut self.transport)?;
        if &status != SYNC_OKAY {
            return Err(AdbError::Protocol(format!(
                "transfer of {} failed: {}",
                dest,
                String::from_utf8_lossy(&status)
            )));
        }

        if verify {
            let stat = self.stat(&dest)?;
            if u64::from(stat.size) != sent {
                return Err(AdbError::Protocol(format!(
                    "verify failed for {}: sent {} bytes, device reports {}",
                    dest, sent, stat.size
                )));
            }
        }

        if let Some(pb) = &self.progress {
            pb.finish_with_message("complete");
        }
        info!("pushed {} bytes to {}", sent, dest);
        Ok(sent)
    }

    /// Start pulling a remote file as a lazy sequence of data chunks.
    ///
    /// Single-pass and finite; a `FAIL` frame from the device fails
    /// the sequence with the path and the device's message.
    pub fn recv(&mut self, path: &str) -> Result<SyncReader<'_>> {
        self.send_request(SYNC_RECV, path)?;
        Ok(SyncReader {
            transport: &mut self.transport,
            path: path.to_string(),
            done: false,
        })
    }

    /// Drain a remote file into `sink`, returning the bytes written.
    pub fn pull(&mut self, remote: &str, sink: &mut dyn Write) -> Result<u64> {
        self.send_request(SYNC_RECV, remote)?;
        let Self {
            transport,
            progress,
        } = self;
        let reader = SyncReader {
            transport,
            path: remote.to_string(),
            done: false,
        };
        let mut total: u64 = 0;
        for chunk in reader {
            let chunk = chunk?;
            sink.write_all(&chunk)?;
            total += chunk.len() as u64;
            if let Some(pb) = progress {
                pb.set_position(total);
            }
        }
        if let Some(pb) = progress {
            pb.finish_with_message("complete");
        }
        info!("pulled {} bytes from {}", total, remote);
        Ok(total)
    }

    /// Leave sync mode and close the connection.
    pub fn quit(mut self) -> Result<()> {
        let mut frame = BytesMut::with_capacity(8);
        frame.put_slice(SYNC_QUIT);
        frame.put_u32_le(0);
        self.transport.connection().write_all(&frame)?;
        self.transport.close();
        Ok(())
    }
}

/// Lazy chunk iterator over a sync `RECV` reply. Not restartable;
/// stopping early leaves the remainder unread, so the transport should
/// be discarded afterwards.
pub struct SyncReader<'a> {
    transport: &'a mut Transport,
    path: String,
    done: bool,
}

impl SyncReader<'_> {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let tag = read_tag(self.transport)?;
        match &tag {
            b"DONE" => Ok(None),
            b"DATA" => {
                let len = read_checked_len(self.transport, "data frame")?;
                let payload = self.transport.connection().read_exact(len)?;
                Ok(Some(payload))
            }
            b"FAIL" => {
                let len = read_checked_len(self.transport, "error message")?;
                let message = self.transport.connection().read_exact(len)?;
                Err(AdbError::SyncFailure {
                    path: self.path.clone(),
                    message: String::from_utf8_lossy(&message).into_owned(),
                })
            }
            other => Err(AdbError::Protocol(format!(
                "unexpected sync tag {:?} while pulling {}",
                String::from_utf8_lossy(other),
                self.path
            ))),
        }
    }
}

impl Iterator for SyncReader<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn read_tag(transport: &mut Transport) -> Result<[u8; 4]> {
    let raw = transport.connection().read_exact(4)?;
    let mut tag = [0u8; 4];
    tag.copy_from_slice(&raw);
    Ok(tag)
}

fn read_u32_le(transport: &mut Transport) -> Result<u32> {
    let raw = transport.connection().read_exact(4)?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&raw);
    Ok(u32::from_le_bytes(bytes))
}

fn read_checked_len(transport: &mut Transport, what: &str) -> Result<usize> {
    let len = read_u32_le(transport)? as usize;
    if len > MAX_PAYLOAD {
        return Err(AdbError::Protocol(format!(
            "declared {} length {} exceeds {} byte limit",
            what, len, MAX_PAYLOAD
        )));
    }
    Ok(len)
}

#[cfg(unix)]
fn local_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn local_mode(_metadata: &fs::Metadata) -> u32 {
    0o644
}
