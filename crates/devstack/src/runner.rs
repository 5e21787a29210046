//! External command execution pinned to the project root.
//!
//! [`SystemCommandRunner`] never reports failure through `Err`: spawn errors
//! and non-zero exits both collapse into an unsuccessful [`CommandOutcome`]
//! carrying diagnostic text, so callers treat them as ordinary signals.

use std::fmt;
use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};

use camino::Utf8PathBuf;
use tracing::{debug, warn};

/// Tracing target for command execution.
const RUNNER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runner");

/// Exit code reported when a command could not be spawned or was killed by a
/// signal.
pub const ABNORMAL_EXIT_CODE: i32 = -1;

/// Program and arguments of an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// Starts a command for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Executable name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the executable.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.program)?;
        for arg in &self.args {
            write!(formatter, " {arg}")?;
        }
        Ok(())
    }
}

/// Where child output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Forward stdout and stderr to the operator's terminal.
    Inherit,
    /// Collect stdout and stderr as text.
    Capture,
}

/// Structured result of running a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// True when the command spawned and exited with status zero.
    pub succeeded: bool,
    /// Captured standard output; empty in [`OutputMode::Inherit`].
    pub stdout: String,
    /// Captured standard error, or the spawn failure description.
    pub stderr: String,
    /// Exit code, or [`ABNORMAL_EXIT_CODE`].
    pub exit_code: i32,
}

impl CommandOutcome {
    /// Successful outcome with the given stdout, used by tests and fakes.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// Failed outcome with the given exit code and stderr.
    #[must_use]
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    fn from_status(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            succeeded: status.success(),
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
            exit_code: status.code().unwrap_or(ABNORMAL_EXIT_CODE),
        }
    }

    fn spawn_failure(command: &CommandSpec, error: &io::Error) -> Self {
        Self::failure(
            ABNORMAL_EXIT_CODE,
            format!("failed to run '{command}': {error}"),
        )
    }

    /// Best available diagnostic text: stderr, then stdout, then the exit
    /// code.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_owned();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_owned();
        }
        format!("exit code {}", self.exit_code)
    }
}

/// Runs external commands to completion.
pub trait CommandRunner {
    /// Runs `command`, never failing: spawn errors and non-zero exits are
    /// reported through [`CommandOutcome::succeeded`].
    fn run(&self, command: &CommandSpec, mode: OutputMode) -> CommandOutcome;
}

/// Observed state of a followed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowState {
    /// Process is still running.
    Running,
    /// Process exited with the given code, if any.
    Exited(Option<i32>),
}

/// Handle to a long-lived process attached to the operator's terminal.
pub trait FollowHandle {
    /// Checks whether the process has exited without blocking.
    fn poll(&mut self) -> io::Result<FollowState>;

    /// Stops the process and reaps it.
    fn terminate(&mut self) -> io::Result<()>;
}

/// Spawns long-lived processes whose output streams to the terminal.
pub trait LogFollower {
    /// Handle type returned for the spawned process.
    type Handle: FollowHandle;

    /// Spawns `command` with inherited stdio.
    fn follow(&self, command: &CommandSpec) -> io::Result<Self::Handle>;
}

/// Production runner that spawns real processes from the project root.
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    root: Utf8PathBuf,
}

impl SystemCommandRunner {
    /// Builds a runner whose children always start in `root`.
    #[must_use]
    pub const fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    fn command(&self, spec: &CommandSpec) -> Command {
        let mut command = Command::new(spec.program());
        command.args(spec.arguments()).current_dir(&self.root);
        command
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, command: &CommandSpec, mode: OutputMode) -> CommandOutcome {
        debug!(
            target: RUNNER_TARGET,
            command = %command,
            ?mode,
            root = %self.root,
            "running command"
        );
        let mut process = self.command(command);
        let result = match mode {
            OutputMode::Inherit => process
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map(|status| CommandOutcome::from_status(status, &[], &[])),
            OutputMode::Capture => process.stdin(Stdio::null()).output().map(|output| {
                CommandOutcome::from_status(output.status, &output.stdout, &output.stderr)
            }),
        };
        match result {
            Ok(outcome) => {
                debug!(
                    target: RUNNER_TARGET,
                    command = %command,
                    exit_code = outcome.exit_code,
                    "command finished"
                );
                outcome
            }
            Err(error) => {
                warn!(
                    target: RUNNER_TARGET,
                    command = %command,
                    error = %error,
                    "command failed to start"
                );
                CommandOutcome::spawn_failure(command, &error)
            }
        }
    }
}

impl LogFollower for SystemCommandRunner {
    type Handle = ChildFollower;

    fn follow(&self, command: &CommandSpec) -> io::Result<Self::Handle> {
        debug!(target: RUNNER_TARGET, command = %command, "following command output");
        let child = self
            .command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;
        Ok(ChildFollower { child })
    }
}

/// [`FollowHandle`] backed by a spawned child process.
#[derive(Debug)]
pub struct ChildFollower {
    child: Child,
}

impl FollowHandle for ChildFollower {
    fn poll(&mut self) -> io::Result<FollowState> {
        Ok(self
            .child
            .try_wait()?
            .map_or(FollowState::Running, |status| {
                FollowState::Exited(status.code())
            }))
    }

    fn terminate(&mut self) -> io::Result<()> {
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }
        self.child.kill()?;
        self.child.wait().map(drop)
    }
}
