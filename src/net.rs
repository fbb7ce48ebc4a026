//! Socket construction. Listener creation goes through `socket2` so the
//! three distinct steps the reactor's state machine cares about --
//! `create_socket`, `set_reuse_addr`, `bind`+`listen` -- are explicit calls
//! rather than the single opaque `TcpListener::bind` std offers.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};

use socket2::{Domain, Socket, Type};

/// Default backlog passed to `listen(2)` when the caller doesn't otherwise
/// constrain it.
pub const DEFAULT_BACKLOG: i32 = 1024;

/// Builds, configures and binds a non-blocking listening socket.
///
/// Mirrors the `create_socket` / `set_reuse_addr` / `bind` / `listen`
/// sequence of operations: allocate the socket, best-effort enable
/// `SO_REUSEADDR` (failures ignored), bind to `addr`, then listen with the
/// given backlog (capped at 5 on Windows in the original contract; this
/// server only targets Linux, so no cap is applied here).
pub fn bind_listener(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)?;

    // Best-effort: a failure here must not prevent the server from starting.
    let _ = socket.set_reuse_address(true);

    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

/// Accepts one pending connection from `listener`, returning `Ok(None)` for
/// the would-block/aborted cases that should be swallowed rather
/// than propagated (`EWOULDBLOCK`/`EAGAIN`/`ECONNABORTED`).
pub fn accept(listener: &TcpListener) -> io::Result<Option<(TcpStream, SocketAddr)>> {
    match listener.accept() {
        Ok((stream, addr)) => {
            stream.set_nonblocking(true)?;
            Ok(Some((stream, addr)))
        }
        Err(err) => match err.kind() {
            io::ErrorKind::WouldBlock => Ok(None),
            _ if err.raw_os_error() == Some(libc::ECONNABORTED) => Ok(None),
            _ => Err(err),
        },
    }
}
