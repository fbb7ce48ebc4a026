//! Server configuration, assembled from parsed CLI arguments in `main`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Number of prefork worker processes sharing the listening socket.
    pub workers: usize,
    /// Document root static files are served from.
    pub root_dir: PathBuf,
    /// Where structured log lines are written; `None` means stderr.
    pub log_file: Option<PathBuf>,
    pub log_level: log::LevelFilter,
    /// Listen backlog passed to `listen(2)`.
    pub backlog: i32,
    /// `epoll_wait` timeout in milliseconds; bounds how promptly a worker
    /// notices a requested shutdown with no socket activity.
    pub poll_timeout_ms: i32,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            workers: 5,
            root_dir: PathBuf::from("."),
            log_file: None,
            log_level: log::LevelFilter::Info,
            backlog: crate::net::DEFAULT_BACKLOG,
            poll_timeout_ms: 1000,
        }
    }
}
