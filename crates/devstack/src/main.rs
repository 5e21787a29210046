//! Entry point for the development stack bootstrapper.
//!
//! The binary delegates to [`devstack::run`], which loads configuration,
//! brings the compose services up, and streams their logs until interrupted.

use std::io::{self, IsTerminal, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let stdout_is_terminal = io::stdout().is_terminal();
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    devstack::run(&mut stdout, &mut stderr, stdout_is_terminal)
}
