use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, LevelFilter};

use staticd::config::ServerConfig;
use staticd::supervisor;

/// A single-threaded, readiness-driven static file HTTP server replicated
/// across a prefork worker pool.
#[derive(Parser, Debug)]
#[command(name = "staticd", version, about)]
struct Cli {
    /// Listen port.
    #[arg(short = 'p', long, default_value_t = 8080)]
    port: u16,

    /// Listen host (a hostname or literal address; `localhost` resolves to
    /// the loopback address without a DNS round trip).
    #[arg(short = 'H', long, default_value = "localhost")]
    host: String,

    /// Number of prefork worker processes sharing the listening socket.
    #[arg(short = 'w', long, default_value_t = 5)]
    workers: usize,

    /// Document root static files are served from. Empty means the current
    /// working directory.
    #[arg(short = 'r', long, default_value = "")]
    root: PathBuf,

    /// Log file path; omit to log to stderr.
    #[arg(short = 'l', long)]
    log: Option<PathBuf>,

    /// Minimum log level.
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Listen backlog passed to `listen(2)`.
    #[arg(long, default_value_t = staticd::net::DEFAULT_BACKLOG)]
    backlog: i32,

    /// `epoll_wait` timeout in milliseconds; bounds how promptly a worker
    /// notices a requested shutdown with no socket activity.
    #[arg(long, default_value_t = 1000)]
    poll_timeout_ms: i32,
}

/// Resolves `host` to a single `IpAddr` without involving a resolver thread
/// pool: `localhost` is special-cased to loopback, a literal address parses
/// directly, and anything else goes through the stdlib's blocking
/// `getaddrinfo`-backed `ToSocketAddrs` (acceptable here since this only
/// runs once at startup).
fn resolve_host(host: &str) -> std::io::Result<IpAddr> {
    if host == "localhost" {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    if let Ok(addr) = host.parse::<IpAddr>() {
        return Ok(addr);
    }
    (host, 0)
        .to_socket_addrs()?
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, format!("could not resolve host {}", host)))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = staticd::logging::init(cli.log.as_deref(), cli.log_level) {
        eprintln!("failed to initialize logging: {}", err);
        return ExitCode::FAILURE;
    }

    let bind_addr = match resolve_host(&cli.host) {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid host {}: {}", cli.host, err);
            return ExitCode::FAILURE;
        }
    };

    let root_arg = if cli.root.as_os_str().is_empty() {
        std::env::current_dir()
    } else {
        Ok(cli.root.clone())
    };
    let root_dir = match root_arg.and_then(|path| path.canonicalize()) {
        Ok(path) => path,
        Err(err) => {
            error!("invalid document root {:?}: {}", cli.root, err);
            return ExitCode::FAILURE;
        }
    };

    let config = ServerConfig {
        bind_addr,
        port: cli.port,
        workers: cli.workers.max(1),
        root_dir,
        log_file: cli.log,
        log_level: cli.log_level,
        backlog: cli.backlog,
        poll_timeout_ms: cli.poll_timeout_ms,
    };

    match supervisor::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
