//! `StreamChannel`: a non-blocking socket plus its
//! outbound byte buffer and close/refuse lifecycle. This server never
//! originates outbound connections -- it only ever wraps a stream handed
//! back by `accept()` -- so the `connecting` half of the general channel
//! state machine has no reachable caller here and is
//! left out rather than carried as dead code.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::os::unix::io::{AsRawFd, RawFd};

use crate::common::is_disconnect;

/// Bytes drained from the outbound buffer per writable readiness event when
/// streaming is in `buffered = false` mode. Keeps a single slow client from
/// monopolizing a writable event with an enormous `sendall`.
pub const DEFAULT_SEND_CHUNK: usize = 64 * 1024;

/// A non-blocking TCP stream with an outbound byte buffer and a lifecycle
/// flag set, matching the channel data model in the design: `connected` is
/// true from construction (this server only wraps already-accepted
/// sockets), `closing` marks "drain then close", and `refusing` mirrors the
/// generic model even though only the listener ever sets it in practice.
pub struct StreamChannel {
    stream: TcpStream,
    fd: RawFd,
    peer_addr: SocketAddr,
    closing: bool,
    refusing: bool,
    out_buf: Vec<u8>,
    send_chunk_size: usize,
}

impl StreamChannel {
    /// Wraps an already-accepted, already-nonblocking stream.
    pub fn new(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        let fd = stream.as_raw_fd();
        Self {
            stream,
            fd,
            peer_addr,
            closing: false,
            refusing: false,
            out_buf: Vec::new(),
            send_chunk_size: DEFAULT_SEND_CHUNK,
        }
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// A channel is readable iff it isn't refusing new reads.
    pub fn readable(&self) -> bool {
        !self.refusing
    }

    /// A channel is writable iff it has buffered bytes left to drain.
    pub fn writable(&self) -> bool {
        !self.out_buf.is_empty()
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub fn mark_closing(&mut self) {
        self.closing = true;
    }

    pub fn has_pending_write(&self) -> bool {
        !self.out_buf.is_empty()
    }

    /// Appends `part` to the outbound buffer. If `buffered` is false, a
    /// chunk of at most `send_size` bytes is drained immediately via
    /// `sendall` -- used by the chunked file streamer to avoid ever holding
    /// an entire large file body in `out_buf` at once.
    pub fn write(&mut self, part: &[u8], buffered: bool, send_size: usize) -> Result<(), ConnectionError> {
        if !part.is_empty() {
            self.out_buf.extend_from_slice(part);
        }
        if !buffered && !self.out_buf.is_empty() {
            let take = send_size.min(self.out_buf.len());
            let chunk: Vec<u8> = self.out_buf.drain(..take).collect();
            self.sendall(&chunk)?;
        }
        Ok(())
    }

    /// Drains `data` in a bounded loop: each iteration sends as much as the
    /// kernel will currently accept and advances by the bytes written; stops
    /// (without error) the moment a send would block, re-buffering whatever
    /// is left for the next writable event.
    pub fn sendall(&mut self, data: &[u8]) -> Result<(), ConnectionError> {
        let mut remaining = data;
        while !remaining.is_empty() {
            let sent = self.send(remaining)?;
            if sent == 0 {
                self.out_buf.splice(0..0, remaining.iter().copied());
                break;
            }
            remaining = &remaining[sent..];
        }
        Ok(())
    }

    /// Drains whatever is already buffered, honoring `send_chunk_size` as
    /// the per-event high-water mark (the sole back-pressure throttle:
    /// writable readiness is the only signal that more can be sent).
    pub fn drain_buffer(&mut self) -> Result<(), ConnectionError> {
        if self.out_buf.is_empty() {
            return Ok(());
        }
        let take = self.send_chunk_size.min(self.out_buf.len());
        let chunk: Vec<u8> = self.out_buf.drain(..take).collect();
        self.sendall(&chunk)
    }

    /// Attempts one send of `data`. Returns bytes written (zero on
    /// would-block, without error). A disconnect errno triggers closing
    /// semantics by returning `ConnectionClosed` instead of propagating the
    /// raw I/O error.
    fn send(&mut self, data: &[u8]) -> Result<usize, ConnectionError> {
        match self.stream.write(data) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(err) if is_disconnect(&err) => Err(ConnectionError::ConnectionClosed),
            Err(err) => Err(ConnectionError::StreamError(err)),
        }
    }

    /// Reads up to `n` bytes. Empty-without-error on would-block; empty is
    /// also returned (as `ConnectionClosed`) on orderly/abrupt disconnect.
    pub fn recv(&mut self, n: usize) -> Result<Vec<u8>, ConnectionError> {
        let mut buf = vec![0u8; n];
        match self.stream.read(&mut buf) {
            Ok(0) => Err(ConnectionError::ConnectionClosed),
            Ok(read) => {
                buf.truncate(read);
                Ok(buf)
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(Vec::new()),
            Err(err) if is_disconnect(&err) => Err(ConnectionError::ConnectionClosed),
            Err(err) => Err(ConnectionError::StreamError(err)),
        }
    }

    /// Reads until the socket would block or disconnects, returning the
    /// concatenation of everything read this call.
    pub fn read_available(&mut self) -> Result<Vec<u8>, ConnectionError> {
        let mut all = Vec::new();
        loop {
            let part = self.recv(4096)?;
            if part.is_empty() {
                break;
            }
            all.extend_from_slice(&part);
        }
        Ok(all)
    }

    /// Tolerates `ENOTCONN`/`EBADF` rather than propagating them.
    pub fn close(&mut self) {
        self.closing = true;
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

pub use crate::common::ConnectionError;
