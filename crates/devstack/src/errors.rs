//! Error types for the bootstrap sequence and the binary runtime.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use devstack_config::ProjectRootError;
use thiserror::Error;

use crate::interrupt::InterruptError;
use crate::probe::HttpProbeError;
use crate::runner::CommandSpec;
use crate::telemetry::TelemetryError;

/// Fatal outcomes of the bootstrap sequence.
///
/// Probe and command failures inside a wait loop never surface here; they
/// are retried. Only top-level steps and fatal-severity timeouts abort.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The container control plane cannot be invoked.
    #[error(
        "{program} is not installed or not running; \
         start the container engine and retry ({detail})"
    )]
    ToolUnavailable {
        /// Control-plane executable.
        program: String,
        /// Diagnostic text from the availability check.
        detail: String,
    },
    /// A fatal-severity service exhausted its attempt budget.
    #[error("{service} failed to become ready after {attempts} attempts ({elapsed:?})")]
    ServiceTimeout {
        /// Service name.
        service: String,
        /// Attempts made.
        attempts: u32,
        /// Time spent waiting.
        elapsed: Duration,
    },
    /// Both the primary and the fallback schema commands failed.
    #[error("failed to set up database schema: {detail}")]
    SchemaBootstrap {
        /// Diagnostic text from the fallback command.
        detail: String,
    },
    /// A mandatory top-level step failed.
    #[error("{step} failed: '{command}' exited with code {exit_code}")]
    Step {
        /// Human-readable step name.
        step: &'static str,
        /// Command that failed.
        command: CommandSpec,
        /// Exit code of the command.
        exit_code: i32,
    },
    /// Writing a status line failed.
    #[error("failed to write status output: {0}")]
    Output(#[from] io::Error),
}

/// Errors raised while streaming logs or tearing down.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The log-following process could not be started.
    #[error("failed to start log stream '{command}': {source}")]
    FollowLogs {
        /// Command that failed to spawn.
        command: CommandSpec,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing a status line failed.
    #[error("failed to write status output: {0}")]
    Output(#[from] io::Error),
}

/// Errors surfaced by the binary entry point.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    /// Telemetry could not be initialised.
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    /// The project root could not be resolved.
    #[error("failed to locate the project root: {0}")]
    ProjectRoot(#[from] ProjectRootError),
    /// The interrupt handler could not be installed.
    #[error(transparent)]
    Interrupt(#[from] InterruptError),
    /// The HTTP probe client could not be built.
    #[error(transparent)]
    HttpProbe(#[from] HttpProbeError),
    /// The bootstrap sequence aborted.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// Log streaming or teardown failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}
