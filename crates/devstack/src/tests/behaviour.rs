//! BDD step definitions for the bootstrap and lifecycle scenarios.
//!
//! Steps map `tests/features/bootstrap.feature` onto a [`TestWorld`] whose
//! runner, probe, and interrupt source are all scripted.

use super::support::*;

use std::cell::RefCell;
use std::process::ExitCode;

use rstest_bdd_macros::{given, scenario, then, when};

use crate::probe::ProbeResult;
use crate::runner::CommandOutcome;

#[given("the database answers not ready twice before becoming ready")]
fn given_database_ready_third(world: &RefCell<TestWorld>) {
    world.borrow().probe.respond(
        "database",
        [
            ProbeResult::not_ready("starting"),
            ProbeResult::not_ready("starting"),
            ProbeResult::ready("accepting connections"),
        ],
    );
}

#[given("the database never becomes ready")]
fn given_database_never_ready(world: &RefCell<TestWorld>) {
    world
        .borrow()
        .probe
        .respond("database", [ProbeResult::not_ready("no response")]);
}

#[given("the backend never becomes ready")]
fn given_backend_never_ready(world: &RefCell<TestWorld>) {
    world
        .borrow()
        .probe
        .respond("backend", [ProbeResult::not_ready("connection refused")]);
}

#[given("the container engine is unavailable")]
fn given_engine_unavailable(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let availability = world.control().availability();
    world.runner.respond(
        &availability,
        [CommandOutcome::failure(-1, "failed to run 'docker --version'")],
    );
}

#[given("the schema push fails")]
fn given_schema_push_fails(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let plan = world.plan();
    world
        .runner
        .respond(plan.schema_apply(), [CommandOutcome::failure(1, "push failed")]);
}

#[given("the schema fallback fails")]
fn given_schema_fallback_fails(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let plan = world.plan();
    world.runner.respond(
        plan.schema_fallback(),
        [CommandOutcome::failure(1, "no migrations found")],
    );
}

#[given("starting the services fails")]
fn given_up_fails(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let up = world.control().up();
    world
        .runner
        .respond(&up, [CommandOutcome::failure(130, "interrupted")]);
}

#[given("the backend dependencies are missing")]
fn given_dependencies_missing(world: &RefCell<TestWorld>) {
    world.borrow().project.remove_dependencies("backend");
}

#[given("the log stream keeps running")]
fn given_log_stream_keeps_running(world: &RefCell<TestWorld>) {
    world.borrow().runner.end_log_stream_after(1_000, None);
}

#[given("the operator interrupts on the first pause")]
fn given_interrupt_first_pause(world: &RefCell<TestWorld>) {
    world.borrow().interrupts.fire_on_wait(1);
}

#[given("the operator interrupts during a running step")]
fn given_interrupt_during_step(world: &RefCell<TestWorld>) {
    // No pause precedes the failing step, so the first check sees it.
    world.borrow().interrupts.fire_on_wait(1);
}

#[when("the operator starts the stack")]
fn when_operator_starts(world: &RefCell<TestWorld>) {
    world.borrow_mut().run();
}

#[then("the stack exits with code {status}")]
fn then_exit_code(world: &RefCell<TestWorld>, status: u8) {
    let exit = world.borrow().exit_code.expect("exit code recorded");
    assert_eq!(exit, ExitCode::from(status));
}

#[then("stdout contains {snippet}")]
fn then_stdout_contains(world: &RefCell<TestWorld>, snippet: String) {
    let stdout = world.borrow().stdout_text();
    let snippet = snippet.trim_matches('"');
    assert!(
        stdout.contains(snippet),
        "stdout {stdout:?} did not contain {snippet:?}"
    );
}

#[then("stdout mentions {snippet} once")]
fn then_stdout_mentions_once(world: &RefCell<TestWorld>, snippet: String) {
    let stdout = world.borrow().stdout_text();
    let snippet = snippet.trim_matches('"');
    assert_eq!(
        stdout.matches(snippet).count(),
        1,
        "expected exactly one {snippet:?} in {stdout:?}"
    );
}

#[then("the control plane ran {action}")]
fn then_control_plane_ran(world: &RefCell<TestWorld>, action: String) {
    assert!(
        control_plane_ran(&world.borrow(), action.trim_matches('"')),
        "expected {action} to run"
    );
}

#[then("the control plane did not run {action}")]
fn then_control_plane_did_not_run(world: &RefCell<TestWorld>, action: String) {
    assert!(
        !control_plane_ran(&world.borrow(), action.trim_matches('"')),
        "expected {action} not to run"
    );
}

#[then("the database was checked {times} times")]
fn then_database_checked(world: &RefCell<TestWorld>, times: usize) {
    assert_eq!(world.borrow().probe.count("database"), times);
}

#[then("the frontend was checked {times} times")]
fn then_frontend_checked(world: &RefCell<TestWorld>, times: usize) {
    assert_eq!(world.borrow().probe.count("frontend"), times);
}

#[then("no service was probed")]
fn then_no_probes(world: &RefCell<TestWorld>) {
    assert!(world.borrow().probe.checks().is_empty());
}

#[then("the schema was not touched")]
fn then_schema_untouched(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let plan = world.plan();
    assert!(!world.ran(plan.schema_apply()));
    assert!(!world.ran(plan.schema_fallback()));
    assert!(!world.ran(plan.client_generate()));
}

#[then("the schema fallback ran")]
fn then_schema_fallback_ran(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let plan = world.plan();
    assert!(world.ran(plan.schema_apply()));
    assert!(world.ran(plan.schema_fallback()));
    assert!(world.ran(plan.client_generate()));
}

#[then("the dependencies were installed")]
fn then_dependencies_installed(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert!(world.ran(world.plan().install()));
}

#[then("the services were stopped once")]
fn then_stopped_once(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert_eq!(world.runner.count(&world.control().down()), 1);
}

#[then("the log follower was terminated")]
fn then_follower_terminated(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().runner.follower().terminated, 1);
}

fn control_plane_ran(world: &TestWorld, action: &str) -> bool {
    let control = world.control();
    match action {
        "up" => world.ran(&control.up()),
        "down" => world.ran(&control.down()),
        "logs" => world
            .runner
            .follower()
            .spawned
            .contains(&control.follow_logs().to_string()),
        other => panic!("unknown control plane action {other}"),
    }
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Healthy stack comes up and streams logs"
)]
fn healthy_stack_streams_logs(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Database becomes ready on the third attempt"
)]
fn database_ready_on_third_attempt(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Database never becomes ready"
)]
fn database_timeout_is_fatal(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "API server timeout is not fatal"
)]
fn api_timeout_continues(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Missing container engine stops before any probe"
)]
fn missing_engine_skips_probes(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Schema push falls back to migrate deploy"
)]
fn schema_push_falls_back(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Both schema commands failing is fatal"
)]
fn schema_fallback_failure_is_fatal(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Missing dependencies are installed"
)]
fn missing_dependencies_are_installed(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Interrupt while waiting for the database tears down once"
)]
fn interrupt_during_wait_tears_down_once(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Interrupt during the log stream tears down once"
)]
fn interrupt_during_log_stream_tears_down_once(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Interrupt during a failing step still tears down"
)]
fn interrupt_during_failing_step_tears_down(world: RefCell<TestWorld>) {
    drop(world);
}
