//! Log streaming and graceful teardown once the environment is up.

use std::cell::Cell;
use std::io::Write;
use std::time::Duration;

use tracing::{info, warn};

use crate::control::ControlPlane;
use crate::errors::LifecycleError;
use crate::interrupt::InterruptSource;
use crate::runner::{CommandRunner, FollowHandle, FollowState, LogFollower, OutputMode};
use crate::status::StatusOutput;

/// Tracing target for lifecycle events.
const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// How often the log follower is polled for exit between interrupt checks.
pub const LOG_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Why the log stream stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The operator interrupted; services were torn down.
    Interrupted {
        /// Signal that triggered the shutdown.
        signal: i32,
    },
    /// The log follower exited on its own; services were left running.
    StreamEnded {
        /// Follower exit code, when it exited normally.
        exit_code: Option<i32>,
    },
}

/// Owns the log follower and the single teardown of the stack.
pub struct ProcessLifecycleManager<'a, R, I> {
    runner: &'a R,
    control: &'a ControlPlane,
    interrupts: &'a I,
    torn_down: Cell<bool>,
}

impl<'a, R, I> ProcessLifecycleManager<'a, R, I>
where
    R: CommandRunner + LogFollower,
    I: InterruptSource,
{
    /// Wires the manager.
    #[must_use]
    pub const fn new(runner: &'a R, control: &'a ControlPlane, interrupts: &'a I) -> Self {
        Self {
            runner,
            control,
            interrupts,
            torn_down: Cell::new(false),
        }
    }

    /// Streams service logs until the operator interrupts or the stream ends.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::FollowLogs`] when the follower cannot be
    /// spawned, or [`LifecycleError::Output`] when status lines cannot be
    /// written.
    pub fn stream_logs<W: Write>(
        &self,
        output: &mut StatusOutput<W>,
    ) -> Result<ShutdownReason, LifecycleError> {
        let command = self.control.follow_logs();
        output.progress(format_args!("\nStarting log stream (Ctrl+C to stop)..."))?;
        output.rule()?;
        let mut follower = self
            .runner
            .follow(&command)
            .map_err(|source| LifecycleError::FollowLogs { command, source })?;

        loop {
            if let Some(signal) = self.interrupts.wait_for(LOG_POLL_INTERVAL) {
                return self.shut_down(signal, &mut follower, output);
            }
            let exit_code = match follower.poll() {
                Ok(FollowState::Running) => continue,
                Ok(FollowState::Exited(code)) => code,
                Err(error) => {
                    warn!(target: LIFECYCLE_TARGET, error = %error, "lost track of log follower");
                    None
                }
            };
            // Ctrl+C reaches the follower as well, so its exit may be the
            // interrupt itself.
            if let Some(signal) = self.interrupts.wait_for(Duration::ZERO) {
                return self.shut_down(signal, &mut follower, output);
            }
            let ending = exit_code.map_or_else(
                || String::from("without an exit code"),
                |code| format!("with code {code}"),
            );
            output.progress(format_args!("Log stream ended {ending}"))?;
            return Ok(ShutdownReason::StreamEnded { exit_code });
        }
    }

    fn shut_down<H: FollowHandle, W: Write>(
        &self,
        signal: i32,
        follower: &mut H,
        output: &mut StatusOutput<W>,
    ) -> Result<ShutdownReason, LifecycleError> {
        info!(target: LIFECYCLE_TARGET, signal, "interrupt received while streaming logs");
        if let Err(error) = follower.terminate() {
            warn!(target: LIFECYCLE_TARGET, error = %error, "failed to stop log follower");
        }
        self.teardown(output)?;
        Ok(ShutdownReason::Interrupted { signal })
    }

    /// Stops every service. Runs at most once per manager; later calls are
    /// no-ops.
    ///
    /// A failing stop command is reported as a warning, never as an error.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Output`] when status lines cannot be written.
    pub fn teardown<W: Write>(&self, output: &mut StatusOutput<W>) -> Result<(), LifecycleError> {
        if self.torn_down.replace(true) {
            return Ok(());
        }
        output.warning(format_args!("Stopping development environment..."))?;
        let down = self.control.down();
        let outcome = self.runner.run(&down, OutputMode::Inherit);
        if outcome.succeeded {
            info!(target: LIFECYCLE_TARGET, "services stopped");
        } else {
            warn!(
                target: LIFECYCLE_TARGET,
                command = %down,
                exit_code = outcome.exit_code,
                "stop command failed"
            );
            output.warning(format_args!(
                "'{down}' exited with code {}; some services may still be running",
                outcome.exit_code
            ))?;
        }
        output.success(format_args!("Goodbye!"))?;
        Ok(())
    }
}
