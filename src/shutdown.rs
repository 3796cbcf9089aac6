//! Interrupt handling for graceful shutdown.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Flag set by the SIGINT/SIGTERM handler.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Only flips an atomic flag, which is async-signal-safe.
extern "C" fn handle_shutdown_signal(_: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Route SIGINT and SIGTERM to the shutdown flag.
pub fn install_handlers() -> Result<()> {
    for (signal, name) in [(libc::SIGINT, "SIGINT"), (libc::SIGTERM, "SIGTERM")] {
        unsafe {
            // SAFETY: handle_shutdown_signal is an extern "C" handler that only
            // stores to an atomic.
            let handler = handle_shutdown_signal as *const () as libc::sighandler_t;
            if libc::signal(signal, handler) == libc::SIG_ERR {
                tracing::error!(signal = name, "failed to install signal handler");
                return Err(anyhow!("failed to install {name} handler"));
            }
        }
    }
    Ok(())
}

pub fn requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

/// Ask the main loop to exit, as if an interrupt had arrived.
pub fn request() {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Block until shutdown is requested, polling every `poll`.
pub fn wait(poll: Duration) {
    while !requested() {
        std::thread::sleep(poll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_sets_flag_and_wait_returns() {
        request();
        assert!(requested());
        wait(Duration::from_millis(1));
    }
}
