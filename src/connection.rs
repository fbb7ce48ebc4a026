//! Per-connection state: wraps a `StreamChannel` with the request line
//! parse buffer and, once a request is dispatched, whatever's left to write
//! (a buffered head+body, or a chunked file stream). One request per
//! connection -- there is no keep-alive, so a connection always closes once
//! its single response has drained.

use std::fs::File;
use std::io::Read;
use std::net::SocketAddr;
use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::path::PathBuf;

use log::{info, warn};

use crate::channel::StreamChannel;
use crate::common::{ConnectionError, RequestError};
use crate::http::response::{encode_chunk, error_response, render_head, FINAL_CHUNK};
use crate::http::status::StatusCode;
use crate::http::version::HttpVersion;
use crate::http::{request, Method};
use crate::static_file::{self, BodyFraming, ResolveError};

enum Body {
    /// Nothing left to send beyond what's already queued in the channel
    /// buffer (error pages, HEAD responses, small buffered file bodies).
    Done,
    /// A file being streamed chunk by chunk as writable events arrive.
    Streaming { file: File, finished_reading: bool },
}

pub struct HttpConnection {
    channel: StreamChannel,
    root_dir: Rc<PathBuf>,
    raw_buf: Vec<u8>,
    parsed: bool,
    body: Body,
}

impl HttpConnection {
    pub fn new(channel: StreamChannel, root_dir: Rc<PathBuf>) -> Self {
        Self {
            channel,
            root_dir,
            raw_buf: Vec::new(),
            parsed: false,
            body: Body::Done,
        }
    }

    pub fn fd(&self) -> RawFd {
        self.channel.fd()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.channel.peer_addr()
    }

    /// A connection is only interesting to read from until its one request
    /// line has been parsed -- this server never reads headers or a body.
    pub fn readable(&self) -> bool {
        self.channel.readable() && !self.parsed
    }

    pub fn writable(&self) -> bool {
        self.channel.writable() || matches!(self.body, Body::Streaming { finished_reading: false, .. })
    }

    /// True once the response (and any streamed body) is fully queued and
    /// drained, and the underlying socket has nothing left to send -- the
    /// reactor should drop this connection from its map.
    pub fn is_finished(&self) -> bool {
        self.parsed && matches!(self.body, Body::Done) && !self.channel.writable()
    }

    pub fn handle_readable(&mut self) -> Result<(), ConnectionError> {
        let chunk = self.channel.read_available()?;
        if chunk.is_empty() {
            return Ok(());
        }
        self.raw_buf.extend_from_slice(&chunk);
        if self.parsed {
            return Ok(());
        }
        if let Some((result, consumed)) = request::try_parse(&self.raw_buf) {
            self.raw_buf.drain(..consumed);
            self.parsed = true;
            self.dispatch(result);
        }
        Ok(())
    }

    pub fn handle_writable(&mut self) -> Result<(), ConnectionError> {
        if self.channel.writable() {
            self.channel.drain_buffer()?;
            if self.channel.writable() {
                return Ok(());
            }
        }

        if let Body::Streaming { file, finished_reading } = &mut self.body {
            if !*finished_reading {
                let mut buf = vec![0u8; static_file::CHUNK_READ_SIZE];
                let read = file.read(&mut buf).map_err(ConnectionError::StreamError)?;
                let queued = if read == 0 {
                    *finished_reading = true;
                    FINAL_CHUNK.to_vec()
                } else {
                    encode_chunk(&buf[..read])
                };
                // buffered = false: try to push this chunk straight to the
                // socket now rather than only queuing it, so a fast client
                // drains a whole file in far fewer writable-readiness round
                // trips than one chunk per event would need.
                self.channel.write(&queued, false, static_file::CHUNK_READ_SIZE)?;
            }
        }

        if self.streaming_finished() && !self.channel.writable() {
            self.channel.mark_closing();
        }
        Ok(())
    }

    fn streaming_finished(&self) -> bool {
        match &self.body {
            Body::Done => true,
            Body::Streaming { finished_reading, .. } => *finished_reading,
        }
    }

    pub fn mark_closing(&mut self) {
        self.channel.mark_closing();
    }

    pub fn is_closing(&self) -> bool {
        self.channel.is_closing() && !self.channel.writable()
    }

    pub fn close(&mut self) {
        self.channel.close();
    }

    fn dispatch(&mut self, line: Result<request::RequestLine, RequestError>) {
        match line {
            Ok(line) => self.dispatch_request(line),
            Err(RequestError::MethodNotAllowed(what)) => {
                warn!("{}: 405 ({})", self.peer_addr(), what);
                // The real request version wasn't necessarily negotiated
                // yet when the error fired; assume HTTP/1.1 rather than the
                // bare HTTP/0.9 default so the client still gets a status
                // line and headers.
                self.queue_error(HttpVersion::MAX_SUPPORTED, StatusCode::MethodNotAllowed405, None, true);
            }
            Err(RequestError::VersionNotSupported(what)) => {
                warn!("{}: 505 ({})", self.peer_addr(), what);
                self.queue_error(HttpVersion::MAX_SUPPORTED, StatusCode::HttpVersionNotSupported505, None, true);
            }
            Err(RequestError::BadRequest(what)) => {
                warn!("{}: 400 ({})", self.peer_addr(), what);
                self.queue_error(HttpVersion::MAX_SUPPORTED, StatusCode::BadRequest400, None, true);
            }
        }
    }

    fn dispatch_request(&mut self, line: request::RequestLine) {
        match static_file::resolve(&self.root_dir, &line.target, line.method) {
            Ok(resolved) => {
                info!("{} {} {} -> 200 ({} bytes)", self.peer_addr(), line.method, line.target, resolved.size);
                self.queue_file_response(line.method, line.version, resolved);
            }
            Err(err) => {
                let status = err.status();
                info!("{} {} {} -> {}", self.peer_addr(), line.method, line.target, status.code());
                let include_body = line.method != Method::Head;
                self.queue_error(line.version, status, resolve_error_explain(err), include_body);
            }
        }
    }

    fn queue_error(&mut self, version: HttpVersion, status: StatusCode, explain: Option<&str>, include_body: bool) {
        let bytes = error_response(version, status, explain, include_body);
        // Best effort: a write error here just means the peer already hung
        // up, which the reactor will observe and clean up on the next pass.
        let _ = self.channel.write(&bytes, true, static_file::CHUNK_READ_SIZE);
        self.body = Body::Done;
    }

    fn queue_file_response(&mut self, method: Method, version: HttpVersion, resolved: static_file::ResolvedFile) {
        // A genuine HTTP/0.9 request never sees a Transfer-Encoding header
        // (it sees no headers at all, per `render_head`), so there's no way
        // to tell a 0.9 client chunking is happening -- always buffer.
        let is_http_09 = version == HttpVersion::default();
        if method == Method::Head || is_http_09 || resolved.framing == BodyFraming::Buffered {
            self.queue_buffered_file(method, version, resolved);
        } else {
            self.queue_chunked_file(version, resolved);
        }
    }

    fn queue_buffered_file(&mut self, method: Method, version: HttpVersion, resolved: static_file::ResolvedFile) {
        let headers = [
            ("Content-Type".to_string(), resolved.content_type.to_string()),
            ("Content-Length".to_string(), resolved.size.to_string()),
            ("Connection".to_string(), "close".to_string()),
        ];
        let header_refs: Vec<(&str, String)> = headers.iter().map(|(n, v)| (n.as_str(), v.clone())).collect();
        let mut bytes = render_head(version, StatusCode::Ok200, &header_refs);

        if method == Method::Get {
            match std::fs::read(&resolved.path) {
                Ok(contents) => bytes.extend_from_slice(&contents),
                Err(_) => {
                    // File vanished between stat and read: fall back to a
                    // 404 rather than sending a truncated body.
                    bytes = error_response(version, StatusCode::NotFound404, None, true);
                }
            }
        }

        let _ = self.channel.write(&bytes, true, static_file::CHUNK_READ_SIZE);
        self.body = Body::Done;
    }

    fn queue_chunked_file(&mut self, version: HttpVersion, resolved: static_file::ResolvedFile) {
        let headers = [
            ("Content-Type".to_string(), resolved.content_type.to_string()),
            ("Transfer-Encoding".to_string(), "chunked".to_string()),
            ("Connection".to_string(), "close".to_string()),
        ];
        let header_refs: Vec<(&str, String)> = headers.iter().map(|(n, v)| (n.as_str(), v.clone())).collect();
        let head = render_head(version, StatusCode::Ok200, &header_refs);
        let _ = self.channel.write(&head, true, static_file::CHUNK_READ_SIZE);

        match File::open(&resolved.path) {
            Ok(file) => self.body = Body::Streaming { file, finished_reading: false },
            Err(_) => {
                let fallback = error_response(version, StatusCode::NotFound404, None, true);
                let _ = self.channel.write(&fallback, true, static_file::CHUNK_READ_SIZE);
                self.body = Body::Done;
            }
        }
    }
}

fn resolve_error_explain(err: ResolveError) -> Option<&'static str> {
    match err {
        ResolveError::Forbidden => Some("path escapes the document root"),
        ResolveError::NotFound => None,
        ResolveError::Internal => Some("failed to stat the requested file"),
    }
}
