//! A single-threaded, readiness-driven static file HTTP server, replicated
//! across a prefork worker pool.
//!
//! Each worker process runs its own [`reactor::Reactor`]: one `epoll`
//! instance multiplexing a shared listening socket and the HTTP connections
//! it accepts. There is no cross-worker or cross-connection shared state --
//! workers share only the listening fd, inherited across `fork(2)` by the
//! [`supervisor`] -- so the concurrency model is share-nothing parallelism
//! rather than a thread pool.
//!
//! Only `GET` and `HEAD` are served, against files under a configured
//! document root ([`static_file`]); everything else becomes a `4xx`/`5xx`
//! error response ([`http::status`]). There is no keep-alive: each
//! connection serves exactly one request and then closes.

extern crate libc;

pub mod channel;
pub mod common;
pub mod config;
pub mod connection;
pub mod http;
pub mod logging;
pub mod net;
pub mod reactor;
pub mod signal;
pub mod static_file;
pub mod supervisor;

pub use common::{ConnectionError, RequestError, ServerError};
pub use config::ServerConfig;
