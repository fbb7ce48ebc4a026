//! The reactor: a single-threaded, readiness-driven
//! event loop over one listening socket and a map of in-flight HTTP
//! connections. Each prefork worker (see `supervisor`) runs its own
//! `Reactor` instance against the shared listening socket; there is no
//! cross-worker coordination beyond what the kernel already serializes in
//! `accept(2)`.

use std::collections::HashMap;
use std::io;
use std::net::TcpListener;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::rc::Rc;

use log::{debug, info, warn};

use crate::channel::StreamChannel;
use crate::common::epoll::{ControlOperation, Epoll, EpollEvent, EventSet, EPOLL_ERR, EPOLL_HUP, EPOLL_IN, EPOLL_OUT};
use crate::common::ServerError;
use crate::connection::HttpConnection;
use crate::net;
use crate::signal::ShutdownFlag;

/// Maximum epoll events drained per `epoll_wait` call.
const MAX_EVENTS: usize = 1024;

pub struct Reactor {
    epoll: Epoll,
    listener: TcpListener,
    listener_fd: RawFd,
    connections: HashMap<RawFd, HttpConnection>,
    root_dir: Rc<PathBuf>,
    /// Set once shutdown has been requested: the listener stops accepting
    /// and the loop exits as soon as the last connection drains.
    refusing: bool,
}

impl Reactor {
    pub fn new(listener: TcpListener, root_dir: PathBuf) -> Result<Self, ServerError> {
        let epoll = Epoll::new().map_err(ServerError::IOError)?;
        let listener_fd = listener.as_raw_fd();
        epoll
            .ctl(
                ControlOperation::Add,
                listener_fd,
                &EpollEvent::new(EventSet::new(EPOLL_IN), listener_fd as u64),
            )
            .map_err(ServerError::IOError)?;

        Ok(Self {
            epoll,
            listener,
            listener_fd,
            connections: HashMap::new(),
            root_dir: Rc::new(root_dir),
            refusing: false,
        })
    }

    /// Runs until `shutdown` is observed and every in-flight connection has
    /// drained, or an unrecoverable I/O error occurs. `timeout_ms` bounds
    /// each `epoll_wait` call so the loop notices `shutdown` promptly even
    /// with no fd activity.
    pub fn run(&mut self, timeout_ms: i32, shutdown: &ShutdownFlag) -> io::Result<()> {
        let mut events: Vec<EpollEvent> = vec![EpollEvent::default(); MAX_EVENTS];

        loop {
            if shutdown.requested() && !self.refusing {
                self.begin_shutdown();
            }

            if self.refusing && self.connections.is_empty() {
                info!("reactor drained, shutting down");
                break;
            }

            let n = self.epoll.wait(events.len(), timeout_ms, &mut events)?;
            for event in &events[..n] {
                let fd = event.fd();
                let set = event.event_set();
                if fd == self.listener_fd {
                    if set.contains(EPOLL_IN) {
                        self.accept_loop();
                    }
                    continue;
                }
                self.dispatch(fd, &set);
            }

            self.reap_finished();
        }

        Ok(())
    }

    fn begin_shutdown(&mut self) {
        info!("shutdown requested: refusing new connections");
        self.refusing = true;
        let _ = self.epoll.ctl(ControlOperation::Delete, self.listener_fd, &EpollEvent::default());
    }

    fn accept_loop(&mut self) {
        if self.refusing {
            return;
        }
        loop {
            match net::accept(&self.listener) {
                Ok(Some((stream, addr))) => {
                    let fd = stream.as_raw_fd();
                    let channel = StreamChannel::new(stream, addr);
                    let connection = HttpConnection::new(channel, Rc::clone(&self.root_dir));
                    if self
                        .epoll
                        .ctl(ControlOperation::Add, fd, &EpollEvent::new(EventSet::new(EPOLL_IN), fd as u64))
                        .is_err()
                    {
                        warn!("{}: failed to register with epoll, dropping", addr);
                        continue;
                    }
                    debug!("{}: accepted", addr);
                    self.connections.insert(fd, connection);
                }
                Ok(None) => break,
                Err(err) => {
                    warn!("accept() failed: {}", err);
                    break;
                }
            }
        }
    }

    fn dispatch(&mut self, fd: RawFd, events: &EventSet) {
        let readable = events.contains(EPOLL_IN);
        let writable = events.contains(EPOLL_OUT);
        let exceptional = events.contains(EPOLL_ERR) || events.contains(EPOLL_HUP);

        let Some(connection) = self.connections.get_mut(&fd) else {
            return;
        };

        if exceptional {
            connection.mark_closing();
        } else {
            if readable && connection.readable() {
                if let Err(err) = connection.handle_readable() {
                    debug!("{}: read error, closing ({})", connection.peer_addr(), err);
                    connection.mark_closing();
                }
            }
            if writable && connection.writable() {
                if let Err(err) = connection.handle_writable() {
                    debug!("{}: write error, closing ({})", connection.peer_addr(), err);
                    connection.mark_closing();
                }
            }
        }

        self.rearm(fd);
    }

    /// Recomputes and applies the connection's epoll interest set after a
    /// dispatch. A connection that's finished (closing, nothing left to
    /// drain) is left alone here; `reap_finished` removes it from both the
    /// map and the epoll instance in one place.
    fn rearm(&mut self, fd: RawFd) {
        let Some(connection) = self.connections.get(&fd) else {
            return;
        };
        if connection.is_finished() || connection.is_closing() {
            return;
        }
        let mut set = EventSet::new(0);
        if connection.readable() {
            set.add(EPOLL_IN);
        }
        if connection.writable() {
            set.add(EPOLL_OUT);
        }
        let _ = self.epoll.ctl(ControlOperation::Modify, fd, &EpollEvent::new(set, fd as u64));
    }

    fn reap_finished(&mut self) {
        let done: Vec<RawFd> = self
            .connections
            .iter()
            .filter(|(_, c)| c.is_finished() || c.is_closing())
            .map(|(fd, _)| *fd)
            .collect();
        for fd in done {
            if let Some(mut connection) = self.connections.remove(&fd) {
                connection.close();
                let _ = self.epoll.ctl(ControlOperation::Delete, fd, &EpollEvent::default());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Duration;

    fn setup(root: &std::path::Path) -> (Reactor, std::net::SocketAddr) {
        let listener = net::bind_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        let reactor = Reactor::new(listener, root.to_path_buf()).unwrap();
        (reactor, addr)
    }

    /// Drives the reactor manually, without `run`'s shutdown bookkeeping,
    /// for a bounded number of readiness passes.
    fn pump(reactor: &mut Reactor, passes: usize) {
        let mut events = vec![EpollEvent::default(); 16];
        for _ in 0..passes {
            let n = reactor.epoll.wait(16, 200, &mut events).unwrap();
            for event in &events[..n] {
                let fd = event.fd();
                if fd == reactor.listener_fd {
                    reactor.accept_loop();
                } else {
                    reactor.dispatch(fd, &event.event_set());
                }
            }
            reactor.reap_finished();
        }
    }

    #[test]
    fn serves_a_small_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), b"hi there").unwrap();
        let (mut reactor, addr) = setup(dir.path());

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"GET /hello.txt HTTP/1.1\r\n\r\n").unwrap();
        client.set_read_timeout(Some(Duration::from_millis(500))).unwrap();

        pump(&mut reactor, 10);

        let mut buf = Vec::new();
        let _ = client.read_to_end(&mut buf);
        let text = String::from_utf8_lossy(&buf);
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 8"));
        assert!(text.ends_with("hi there"));
    }

    #[test]
    fn returns_404_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (mut reactor, addr) = setup(dir.path());

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"GET /nope.txt HTTP/1.1\r\n\r\n").unwrap();
        client.set_read_timeout(Some(Duration::from_millis(500))).unwrap();

        pump(&mut reactor, 10);

        let mut buf = Vec::new();
        let _ = client.read_to_end(&mut buf);
        let text = String::from_utf8_lossy(&buf);
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn head_request_gets_no_body() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), b"hi there").unwrap();
        let (mut reactor, addr) = setup(dir.path());

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"HEAD /hello.txt HTTP/1.1\r\n\r\n").unwrap();
        client.set_read_timeout(Some(Duration::from_millis(500))).unwrap();

        pump(&mut reactor, 10);

        let mut buf = Vec::new();
        let _ = client.read_to_end(&mut buf);
        let text = String::from_utf8_lossy(&buf);
        assert!(text.contains("Content-Length: 8"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn http_0_9_request_gets_raw_body_with_no_headers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), b"hi there").unwrap();
        let (mut reactor, addr) = setup(dir.path());

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"GET /hello.txt\n").unwrap();
        client.set_read_timeout(Some(Duration::from_millis(500))).unwrap();

        pump(&mut reactor, 10);

        let mut buf = Vec::new();
        let _ = client.read_to_end(&mut buf);
        assert_eq!(buf, b"hi there");
    }
}
