//! Bounded readiness polling for one backing service.
//!
//! The wait is an explicit loop: probe, resolve on ready, otherwise count the
//! attempt and either time out or pause for the fixed poll interval. The
//! pause is the only point where an operator interrupt is observed.

use std::io::Write;
use std::time::Instant;

use tracing::{debug, warn};

use crate::errors::BootstrapError;
use crate::interrupt::InterruptSource;
use crate::probe::ServiceProbe;
use crate::service::{ServiceDescriptor, Severity};
use crate::status::StatusOutput;

/// Tracing target for readiness waits.
const READINESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::readiness");

/// Non-fatal resolution of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The probe reported ready on attempt `attempts`.
    Ready {
        /// Attempt on which readiness was observed.
        attempts: u32,
    },
    /// A degraded-severity service timed out; the sequence continues.
    Degraded {
        /// Attempts made.
        attempts: u32,
    },
    /// The operator interrupted the wait during a pause.
    Interrupted {
        /// Attempts made before the interrupt.
        attempts: u32,
    },
}

/// Mutable bookkeeping for a single wait.
struct AttemptState {
    attempts: u32,
    started: Instant,
}

impl AttemptState {
    fn new() -> Self {
        Self {
            attempts: 0,
            started: Instant::now(),
        }
    }

    const fn next_attempt(&self) -> u32 {
        self.attempts.saturating_add(1)
    }

    const fn record_failure(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }
}

/// Waits for `descriptor` to become ready.
///
/// Once the probe reports ready no further probe is made.
///
/// # Errors
///
/// Returns [`BootstrapError::ServiceTimeout`] when a fatal-severity service
/// exhausts its budget, or [`BootstrapError::Output`] when a status line
/// cannot be written.
pub fn wait_for_service<P, I, W>(
    descriptor: &ServiceDescriptor,
    probe: &P,
    interrupts: &I,
    output: &mut StatusOutput<W>,
) -> Result<WaitOutcome, BootstrapError>
where
    P: ServiceProbe + ?Sized,
    I: InterruptSource + ?Sized,
    W: Write,
{
    let name = descriptor.name();
    let max_attempts = descriptor.max_attempts();
    let mut state = AttemptState::new();
    loop {
        let attempt = state.next_attempt();
        output.progress(format_args!(
            "Checking {name}... (attempt {attempt}/{max_attempts})"
        ))?;
        let result = probe.check(descriptor);
        if result.is_ready() {
            output.success(format_args!("{name} is ready! ({})", result.diagnostic))?;
            debug!(
                target: READINESS_TARGET,
                service = name,
                attempt,
                elapsed_ms = state.started.elapsed().as_millis(),
                "service ready"
            );
            return Ok(WaitOutcome::Ready { attempts: attempt });
        }
        state.record_failure();
        debug!(
            target: READINESS_TARGET,
            service = name,
            attempt,
            readiness = ?result.readiness,
            diagnostic = %result.diagnostic,
            "service not ready"
        );
        if state.attempts >= max_attempts {
            return resolve_timeout(descriptor, &state, output);
        }
        if let Some(signal) = interrupts.wait_for(descriptor.poll_interval()) {
            debug!(
                target: READINESS_TARGET,
                service = name,
                signal,
                "wait interrupted"
            );
            return Ok(WaitOutcome::Interrupted {
                attempts: state.attempts,
            });
        }
    }
}

fn resolve_timeout<W: Write>(
    descriptor: &ServiceDescriptor,
    state: &AttemptState,
    output: &mut StatusOutput<W>,
) -> Result<WaitOutcome, BootstrapError> {
    let name = descriptor.name();
    let elapsed = state.started.elapsed();
    warn!(
        target: READINESS_TARGET,
        service = name,
        attempts = state.attempts,
        severity = %descriptor.severity(),
        elapsed_ms = elapsed.as_millis(),
        "service wait timed out"
    );
    match descriptor.severity() {
        // Reported once by whoever handles the error.
        Severity::Fatal => Err(BootstrapError::ServiceTimeout {
            service: name.to_owned(),
            attempts: state.attempts,
            elapsed,
        }),
        Severity::Degraded => {
            output.warning(format_args!(
                "{name} might not be ready yet, but continuing..."
            ))?;
            Ok(WaitOutcome::Degraded {
                attempts: state.attempts,
            })
        }
    }
}
