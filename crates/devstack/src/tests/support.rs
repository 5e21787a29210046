//! Scripted collaborators for unit and behavioural tests.
//!
//! The runner answers commands from per-command queues and records every
//! invocation; the probe answers per service; the interrupt source records
//! each wait and fires on a chosen call. None of them sleep, so waits
//! complete instantly.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

use camino::Utf8PathBuf;
use devstack_config::Config;
use rstest::fixture;
use tempfile::TempDir;

use crate::bootstrap::BootstrapPlan;
use crate::control::ControlPlane;
use crate::interrupt::InterruptSource;
use crate::probe::{ProbeResult, ServiceProbe};
use crate::runner::{
    CommandOutcome, CommandRunner, CommandSpec, FollowHandle, FollowState, LogFollower, OutputMode,
};
use crate::service::ServiceDescriptor;
use crate::status::StatusOutput;

/// Signal number reported by [`ScriptedInterrupts`].
pub(crate) const SCRIPTED_SIGNAL: i32 = 2;

/// Runner answering from scripted per-command queues.
///
/// The last queued outcome for a command repeats forever; commands with no
/// script succeed with empty output.
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    responses: RefCell<HashMap<String, VecDeque<CommandOutcome>>>,
    calls: RefCell<Vec<(String, OutputMode)>>,
    follower: Rc<RefCell<FollowerRecord>>,
    follow_fails: Cell<bool>,
}

/// What happened to the followed log process.
#[derive(Debug, Default, Clone)]
pub(crate) struct FollowerRecord {
    pub spawned: Vec<String>,
    pub polls: usize,
    pub terminated: usize,
    pub exit_after_polls: Option<usize>,
    pub exit_code: Option<i32>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond<I>(&self, command: &CommandSpec, outcomes: I)
    where
        I: IntoIterator<Item = CommandOutcome>,
    {
        self.responses
            .borrow_mut()
            .entry(command.to_string())
            .or_default()
            .extend(outcomes);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|(command, _)| command.clone())
            .collect()
    }

    pub(crate) fn count(&self, command: &CommandSpec) -> usize {
        let key = command.to_string();
        self.calls
            .borrow()
            .iter()
            .filter(|(called, _)| *called == key)
            .count()
    }

    pub(crate) fn mode_of(&self, command: &CommandSpec) -> Option<OutputMode> {
        let key = command.to_string();
        self.calls
            .borrow()
            .iter()
            .find(|(called, _)| *called == key)
            .map(|(_, mode)| *mode)
    }

    pub(crate) fn fail_follow(&self) {
        self.follow_fails.set(true);
    }

    pub(crate) fn end_log_stream_after(&self, polls: usize, exit_code: Option<i32>) {
        let mut record = self.follower.borrow_mut();
        record.exit_after_polls = Some(polls);
        record.exit_code = exit_code;
    }

    pub(crate) fn follower(&self) -> FollowerRecord {
        self.follower.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &CommandSpec, mode: OutputMode) -> CommandOutcome {
        let key = command.to_string();
        self.calls.borrow_mut().push((key.clone(), mode));
        let mut responses = self.responses.borrow_mut();
        let Some(queue) = responses.get_mut(&key) else {
            return CommandOutcome::success("");
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or_else(|| CommandOutcome::success(""))
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| CommandOutcome::success(""))
        }
    }
}

impl LogFollower for ScriptedRunner {
    type Handle = ScriptedFollower;

    fn follow(&self, command: &CommandSpec) -> io::Result<Self::Handle> {
        if self.follow_fails.get() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such program"));
        }
        self.follower.borrow_mut().spawned.push(command.to_string());
        Ok(ScriptedFollower {
            record: Rc::clone(&self.follower),
        })
    }
}

pub(crate) struct ScriptedFollower {
    record: Rc<RefCell<FollowerRecord>>,
}

impl FollowHandle for ScriptedFollower {
    fn poll(&mut self) -> io::Result<FollowState> {
        let mut record = self.record.borrow_mut();
        record.polls += 1;
        match record.exit_after_polls {
            Some(limit) if record.polls >= limit => Ok(FollowState::Exited(record.exit_code)),
            _ => Ok(FollowState::Running),
        }
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.record.borrow_mut().terminated += 1;
        Ok(())
    }
}

/// Interrupt source that never sleeps and fires on a chosen wait.
#[derive(Default)]
pub(crate) struct ScriptedInterrupts {
    waits: RefCell<Vec<Duration>>,
    fire_on: Cell<Option<usize>>,
}

impl ScriptedInterrupts {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fires on the `wait`-th call (1-based) to [`InterruptSource::wait_for`].
    pub(crate) fn fire_on_wait(&self, wait: usize) {
        self.fire_on.set(Some(wait));
    }

    pub(crate) fn waits(&self) -> Vec<Duration> {
        self.waits.borrow().clone()
    }
}

impl InterruptSource for ScriptedInterrupts {
    fn wait_for(&self, timeout: Duration) -> Option<i32> {
        let mut waits = self.waits.borrow_mut();
        waits.push(timeout);
        match self.fire_on.get() {
            Some(target) if waits.len() >= target => Some(SCRIPTED_SIGNAL),
            _ => None,
        }
    }
}

/// Probe answering from scripted per-service queues.
///
/// Mirrors [`ScriptedRunner`]: the last verdict repeats and unscripted
/// services are ready on the first check.
#[derive(Default)]
pub(crate) struct ScriptedProbe {
    verdicts: RefCell<HashMap<String, VecDeque<ProbeResult>>>,
    checks: RefCell<Vec<String>>,
}

impl ScriptedProbe {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond<I>(&self, service: &str, verdicts: I)
    where
        I: IntoIterator<Item = ProbeResult>,
    {
        self.verdicts
            .borrow_mut()
            .entry(service.to_owned())
            .or_default()
            .extend(verdicts);
    }

    pub(crate) fn checks(&self) -> Vec<String> {
        self.checks.borrow().clone()
    }

    pub(crate) fn count(&self, service: &str) -> usize {
        self.checks
            .borrow()
            .iter()
            .filter(|checked| checked.as_str() == service)
            .count()
    }
}

impl ServiceProbe for ScriptedProbe {
    fn check(&self, descriptor: &ServiceDescriptor) -> ProbeResult {
        let name = descriptor.name();
        self.checks.borrow_mut().push(name.to_owned());
        let mut verdicts = self.verdicts.borrow_mut();
        let Some(queue) = verdicts.get_mut(name) else {
            return ProbeResult::ready("scripted");
        };
        if queue.len() > 1 {
            queue
                .pop_front()
                .unwrap_or_else(|| ProbeResult::ready("scripted"))
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| ProbeResult::ready("scripted"))
        }
    }
}

/// Project root on disk with both dependency directories installed.
pub(crate) struct ProjectFixture {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl ProjectFixture {
    pub(crate) fn new() -> Self {
        let dir = TempDir::new().expect("temp project root");
        let root =
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp project root");
        fs::write(root.join("docker-compose.yml"), "services: {}\n").expect("write compose file");
        for service in ["backend", "frontend"] {
            fs::create_dir_all(root.join(service).join("node_modules"))
                .expect("create dependency directory");
        }
        Self { _dir: dir, root }
    }

    pub(crate) fn root(&self) -> &Utf8PathBuf {
        &self.root
    }

    pub(crate) fn remove_dependencies(&self, service: &str) {
        fs::remove_dir_all(self.root.join(service).join("node_modules"))
            .expect("remove dependency directory");
    }
}

/// Shared state for behavioural scenarios.
pub(crate) struct TestWorld {
    pub config: Config,
    pub project: ProjectFixture,
    pub runner: ScriptedRunner,
    pub probe: ScriptedProbe,
    pub interrupts: ScriptedInterrupts,
    pub stdout: Vec<u8>,
    pub exit_code: Option<ExitCode>,
}

impl Default for TestWorld {
    fn default() -> Self {
        let runner = ScriptedRunner::new();
        runner.end_log_stream_after(1, Some(0));
        Self {
            config: Config {
                max_attempts: 3,
                poll_interval_ms: 10,
                ..Config::default()
            },
            project: ProjectFixture::new(),
            runner,
            probe: ScriptedProbe::new(),
            interrupts: ScriptedInterrupts::new(),
            stdout: Vec::new(),
            exit_code: None,
        }
    }
}

impl TestWorld {
    pub(crate) fn control(&self) -> ControlPlane {
        ControlPlane::from_config(&self.config)
    }

    pub(crate) fn plan(&self) -> BootstrapPlan {
        BootstrapPlan::from_config(&self.config, self.project.root(), &self.control())
    }

    pub(crate) fn run(&mut self) {
        let control = self.control();
        let plan = self.plan();
        let mut output = StatusOutput::new(Vec::new(), false);
        let result = crate::drive(
            &self.runner,
            &control,
            &self.probe,
            &self.interrupts,
            &plan,
            &mut output,
        );
        self.stdout = output.into_inner();
        self.exit_code = Some(result.expect("drive completes"));
    }

    pub(crate) fn stdout_text(&self) -> String {
        String::from_utf8(self.stdout.clone()).expect("stdout utf8")
    }

    pub(crate) fn ran(&self, command: &CommandSpec) -> bool {
        self.runner.count(command) > 0
    }
}

#[fixture]
pub(crate) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}
