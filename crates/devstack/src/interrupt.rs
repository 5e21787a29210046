//! The process-wide interrupt handler.
//!
//! [`InterruptListener`] installs the only signal handler the process ever
//! has. A dedicated thread forwards SIGINT/SIGTERM into a channel; waits
//! between probe attempts and the log-streaming loop read from that channel,
//! so an interrupt is observed at those suspension points and never while an
//! external command is running.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::{debug, info};

/// Tracing target for interrupt handling.
const INTERRUPT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::interrupt");

/// Source of operator interrupts.
pub trait InterruptSource {
    /// Waits up to `timeout` for an interrupt and returns the signal number
    /// when one arrives.
    fn wait_for(&self, timeout: Duration) -> Option<i32>;
}

/// Errors reported while installing the interrupt handler.
#[derive(Debug, Error)]
pub enum InterruptError {
    /// Registering the signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The forwarding thread could not be started.
    #[error("failed to start the signal forwarding thread: {source}")]
    Forwarder {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Listener for SIGINT and SIGTERM backed by `signal-hook`.
pub struct InterruptListener {
    receiver: Receiver<i32>,
    handle: Handle,
}

impl InterruptListener {
    /// Installs the handler. Call once per process.
    pub fn install() -> Result<Self, InterruptError> {
        let mut signals =
            Signals::new([SIGINT, SIGTERM]).map_err(|source| InterruptError::Install { source })?;
        let handle = signals.handle();
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name(String::from("devstack-signals"))
            .spawn(move || {
                for signal in signals.forever() {
                    info!(target: INTERRUPT_TARGET, signal, "interrupt received");
                    if sender.send(signal).is_err() {
                        break;
                    }
                }
            })
            .map_err(|source| InterruptError::Forwarder { source })?;
        debug!(target: INTERRUPT_TARGET, "interrupt handler installed");
        Ok(Self { receiver, handle })
    }
}

impl InterruptSource for InterruptListener {
    fn wait_for(&self, timeout: Duration) -> Option<i32> {
        match self.receiver.recv_timeout(timeout) {
            Ok(signal) => Some(signal),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                // Forwarder is gone; keep the pacing without interrupts.
                thread::sleep(timeout);
                None
            }
        }
    }
}

impl Drop for InterruptListener {
    fn drop(&mut self) {
        self.handle.close();
    }
}
