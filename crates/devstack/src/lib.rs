//! One-command bootstrap for a local multi-service development stack.
//!
//! The runtime verifies the container engine, installs dependencies, starts
//! the compose services, waits for each one to become ready, prepares the
//! database schema, and then streams service logs until the operator
//! interrupts, at which point every service is stopped exactly once.
//!
//! Every collaborator that touches the outside world sits behind a trait
//! ([`CommandRunner`], [`LogFollower`], [`ServiceProbe`], [`InterruptSource`])
//! so the sequence can be exercised without a container engine.

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use devstack_config::Config;
use tracing::info;

pub mod bootstrap;
pub mod control;
pub mod errors;
pub mod interrupt;
pub mod lifecycle;
pub mod probe;
pub mod readiness;
pub mod runner;
pub mod service;
pub mod status;
pub mod telemetry;

pub use bootstrap::{Bootstrap, BootstrapOutcome, BootstrapPlan};
pub use control::ControlPlane;
pub use errors::{AppError, BootstrapError, LifecycleError};
pub use interrupt::{InterruptListener, InterruptSource};
pub use lifecycle::{ProcessLifecycleManager, ShutdownReason};
pub use probe::{HttpProbe, ProbeContext, ProbeResult, ProbeTable, Readiness, ServiceProbe};
pub use readiness::{WaitOutcome, wait_for_service};
pub use runner::{CommandOutcome, CommandRunner, CommandSpec, LogFollower, SystemCommandRunner};
pub use service::{ServiceDescriptor, ServiceKind, Severity};
pub use status::{StatusOutput, Tone};

/// Tracing target for the runtime entry point.
const RUNTIME_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runtime");

/// Runs the whole bootstrap and log-streaming lifecycle.
///
/// Status lines go to `stdout`; errors raised before the status channel
/// exists go to `stderr`.
#[must_use]
pub fn run<W, E>(stdout: &mut W, stderr: &mut E, stdout_is_terminal: bool) -> ExitCode
where
    W: Write,
    E: Write,
{
    let mut output = StatusOutput::new(stdout, stdout_is_terminal);
    match try_run(&mut output) {
        Ok(exit_code) => exit_code,
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn try_run<W: Write>(output: &mut StatusOutput<W>) -> Result<ExitCode, AppError> {
    let config = Config::load_layers().map_err(AppError::LoadConfiguration)?;
    let _telemetry = telemetry::initialise(&config)?;
    let root = config.resolve_project_root()?;
    info!(target: RUNTIME_TARGET, root = %root, "resolved project root");

    let interrupts = InterruptListener::install()?;
    let runner = SystemCommandRunner::new(root.clone());
    let control = ControlPlane::from_config(&config);
    let http = HttpProbe::new(probe::DEFAULT_HTTP_TIMEOUT)?;
    let probe = ProbeTable::new(ProbeContext::new(
        &runner,
        &control,
        http,
        config.database_user.as_str(),
    ));
    let plan = BootstrapPlan::from_config(&config, &root, &control);

    drive(&runner, &control, &probe, &interrupts, &plan, output)
}

/// Runs bootstrap, then either streams logs or tears down, and maps the
/// result to an exit code.
///
/// A fatal bootstrap failure is reported on the status channel and yields
/// [`ExitCode::FAILURE`]; an interrupt at any point, including one pending
/// when a step fails, yields [`ExitCode::SUCCESS`] after a single teardown.
pub(crate) fn drive<R, P, I, W>(
    runner: &R,
    control: &ControlPlane,
    probe: &P,
    interrupts: &I,
    plan: &BootstrapPlan,
    output: &mut StatusOutput<W>,
) -> Result<ExitCode, AppError>
where
    R: CommandRunner + LogFollower,
    P: ServiceProbe,
    I: InterruptSource,
    W: Write,
{
    let lifecycle = ProcessLifecycleManager::new(runner, control, interrupts);
    let outcome = Bootstrap::new(runner, control, probe, interrupts, plan).run(output);
    match &outcome {
        BootstrapOutcome::Completed => {
            let reason = lifecycle.stream_logs(output)?;
            info!(target: RUNTIME_TARGET, ?reason, "log stream finished");
        }
        BootstrapOutcome::Interrupted => {
            info!(target: RUNTIME_TARGET, "bootstrap interrupted");
            lifecycle.teardown(output)?;
        }
        BootstrapOutcome::Failed(error) => {
            output.error(format_args!("{error}")).map_err(BootstrapError::from)?;
            // An interrupt delivered while a step was running is only seen
            // here; services that step may have started still get stopped.
            if let Some(signal) = interrupts.wait_for(Duration::ZERO) {
                info!(target: RUNTIME_TARGET, signal, "interrupt received during a failed step");
                lifecycle.teardown(output)?;
                return Ok(ExitCode::SUCCESS);
            }
        }
    }
    Ok(outcome.exit_code())
}

#[cfg(test)]
mod tests;
