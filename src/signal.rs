//! SIGINT handling for graceful shutdown. The handler itself only sets an
//! atomic flag -- everything async-signal-unsafe (logging, closing sockets,
//! draining connections) happens on the next turn of the reactor loop,
//! which polls the flag between `epoll_wait` calls.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static SIGINT_RECEIVED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signum: libc::c_int) {
    SIGINT_RECEIVED.store(true, Ordering::SeqCst);
}

/// A cheap, cloneable handle onto the process-wide shutdown flag. Each
/// prefork worker installs the handler once and shares a `ShutdownFlag`
/// with its `Reactor`.
#[derive(Clone, Default)]
pub struct ShutdownFlag {
    _private: Arc<()>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> bool {
        SIGINT_RECEIVED.load(Ordering::SeqCst)
    }

    /// Only useful for tests: lets a test simulate a delivered SIGINT
    /// without actually raising one.
    #[cfg(test)]
    pub fn simulate(&self) {
        SIGINT_RECEIVED.store(true, Ordering::SeqCst);
    }
}

/// Installs the SIGINT handler for the current process. Must be called
/// once per process (parent supervisor and each forked worker call this
/// independently, since `sigaction` state is inherited across `fork` but
/// workers re-install it defensively).
pub fn install_sigint_handler() -> io::Result<()> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = on_sigint as usize;
        libc::sigemptyset(&mut action.sa_mask);
        action.sa_flags = 0;
        if libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_reflects_simulated_signal() {
        let flag = ShutdownFlag::new();
        flag.simulate();
        assert!(flag.requested());
    }
}
