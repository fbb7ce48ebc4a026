//! Prefork supervisor: binds one listening socket and
//! replicates it across `workers` forked child processes, each running its
//! own independent `Reactor`. There is no shared state between workers --
//! the kernel alone serializes `accept(2)` across the inherited listening
//! fd -- so a worker crash or shutdown never affects its siblings.

use std::io;
use std::net::TcpListener;

use log::info;

use crate::common::ServerError;
use crate::config::ServerConfig;
use crate::net;
use crate::reactor::Reactor;
use crate::signal::{install_sigint_handler, ShutdownFlag};

/// Binds the listening socket and runs the configured number of workers.
/// With `workers == 1` no child is forked -- the calling process is the
/// only worker, which keeps the common single-process case free of the
/// fork/waitpid machinery entirely.
pub fn run(config: ServerConfig) -> Result<(), ServerError> {
    install_sigint_handler().map_err(ServerError::IOError)?;

    let listener = net::bind_listener(config.socket_addr(), config.backlog).map_err(ServerError::BindError)?;
    info!(
        "listening on {} with {} worker(s), serving {}",
        config.socket_addr(),
        config.workers,
        config.root_dir.display()
    );

    if config.workers <= 1 {
        return run_worker(listener, &config);
    }

    let mut children = Vec::with_capacity(config.workers);
    for _ in 0..config.workers {
        match unsafe { libc::fork() } {
            -1 => return Err(ServerError::ForkError(io::Error::last_os_error())),
            0 => {
                // Child: re-install the handler defensively (sigaction
                // state survives fork, but this keeps the contract
                // explicit) and run the worker to completion.
                install_sigint_handler().map_err(ServerError::IOError)?;
                return run_worker(listener, &config);
            }
            pid => {
                info!("spawned worker pid={}", pid);
                children.push(pid);
            }
        }
    }

    reap_children(&children);
    Ok(())
}

fn run_worker(listener: TcpListener, config: &ServerConfig) -> Result<(), ServerError> {
    let shutdown = ShutdownFlag::new();
    let mut reactor = Reactor::new(listener, config.root_dir.clone())?;
    reactor.run(config.poll_timeout_ms, &shutdown).map_err(ServerError::IOError)?;
    info!("worker pid={} exiting", std::process::id());
    Ok(())
}

/// Blocks until every forked worker has exited. SIGINT delivered to the
/// process group reaches each worker independently (the kernel, not this
/// loop, fans it out); this just reclaims zombies as they finish.
fn reap_children(children: &[libc::pid_t]) {
    for &pid in children {
        let mut status: libc::c_int = 0;
        unsafe {
            libc::waitpid(pid, &mut status, 0);
        }
    }
}
