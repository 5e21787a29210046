//! The ordered bootstrap sequence.
//!
//! Steps run strictly in order and each one gates the next: control plane,
//! dependencies, service start, database wait, schema, client generation,
//! API wait, UI wait, then a status listing and summary. Only top-level
//! steps and fatal-severity waits can abort the sequence.

use std::io::Write;
use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use devstack_config::Config;
use tracing::{info, warn};

use crate::control::ControlPlane;
use crate::errors::BootstrapError;
use crate::interrupt::InterruptSource;
use crate::probe::ServiceProbe;
use crate::readiness::{WaitOutcome, wait_for_service};
use crate::runner::{CommandRunner, CommandSpec, OutputMode};
use crate::service::{ServiceDescriptor, ServiceKind, Severity};
use crate::status::{StatusOutput, Tone};

/// Tracing target for the bootstrap sequence.
const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

const SCHEMA_ARGUMENT: &str = "--schema=./prisma/schema.prisma";
const INSTALL_PROGRAM: &str = "npm";
const INSTALL_ARGUMENTS: [&str; 2] = ["run", "install:all"];
const DEPENDENCY_DIRECTORY: &str = "node_modules";

/// Terminal record of a bootstrap run.
#[derive(Debug)]
pub enum BootstrapOutcome {
    /// Every step finished; the environment is up.
    Completed,
    /// The operator interrupted a wait.
    Interrupted,
    /// The first fatal failure.
    Failed(BootstrapError),
}

impl BootstrapOutcome {
    /// Process exit code implied by the outcome when it is final.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Completed | Self::Interrupted => ExitCode::SUCCESS,
            Self::Failed(_) => ExitCode::FAILURE,
        }
    }
}

/// Everything the sequence needs to know about the project.
#[derive(Debug, Clone)]
pub struct BootstrapPlan {
    root: Utf8PathBuf,
    dependency_directories: Vec<Utf8PathBuf>,
    install: CommandSpec,
    database: ServiceDescriptor,
    schema_apply: CommandSpec,
    schema_fallback: CommandSpec,
    client_generate: CommandSpec,
    api: ServiceDescriptor,
    ui: ServiceDescriptor,
    summary: Summary,
}

#[derive(Debug, Clone)]
struct Summary {
    ui_url: String,
    api_url: String,
    database_address: String,
    compose_program: String,
}

impl BootstrapPlan {
    /// Derives the plan for the project at `root`.
    #[must_use]
    pub fn from_config(config: &Config, root: &Utf8Path, control: &ControlPlane) -> Self {
        let service = |name: &str, kind: ServiceKind, severity: Severity| {
            ServiceDescriptor::new(name, kind)
                .with_container(control.container_name(name))
                .with_max_attempts(config.max_attempts)
                .with_poll_interval(config.poll_interval())
                .with_severity(severity)
        };
        let prisma = |arguments: &[&str]| {
            control.exec(
                config.api_service.as_str(),
                ["npx", "prisma"]
                    .iter()
                    .chain(arguments)
                    .chain(&[SCHEMA_ARGUMENT])
                    .copied(),
            )
        };
        Self {
            root: root.to_path_buf(),
            dependency_directories: [&config.api_service, &config.ui_service]
                .into_iter()
                .map(|name| Utf8PathBuf::from(name.as_str()).join(DEPENDENCY_DIRECTORY))
                .collect(),
            install: CommandSpec::new(INSTALL_PROGRAM).args(INSTALL_ARGUMENTS),
            database: service(&config.database_service, ServiceKind::Database, Severity::Fatal),
            schema_apply: prisma(&["db", "push"]),
            schema_fallback: prisma(&["migrate", "deploy"]),
            client_generate: prisma(&["generate"]),
            api: service(&config.api_service, ServiceKind::ApiServer, Severity::Degraded)
                .with_url(config.api_url()),
            ui: service(&config.ui_service, ServiceKind::UiServer, Severity::Degraded)
                .with_url(config.ui_url()),
            summary: Summary {
                ui_url: config.ui_url(),
                api_url: format!("http://localhost:{}", config.api_port),
                database_address: format!("localhost:{}", config.database_port),
                compose_program: config.compose_program.clone(),
            },
        }
    }

    /// Database descriptor.
    #[must_use]
    pub const fn database(&self) -> &ServiceDescriptor {
        &self.database
    }

    /// API server descriptor.
    #[must_use]
    pub const fn api(&self) -> &ServiceDescriptor {
        &self.api
    }

    /// UI dev server descriptor.
    #[must_use]
    pub const fn ui(&self) -> &ServiceDescriptor {
        &self.ui
    }

    /// Primary schema command.
    #[must_use]
    pub const fn schema_apply(&self) -> &CommandSpec {
        &self.schema_apply
    }

    /// Schema command tried when the primary one fails.
    #[must_use]
    pub const fn schema_fallback(&self) -> &CommandSpec {
        &self.schema_fallback
    }

    /// Schema client generation command.
    #[must_use]
    pub const fn client_generate(&self) -> &CommandSpec {
        &self.client_generate
    }

    /// Dependency installation command.
    #[must_use]
    pub const fn install(&self) -> &CommandSpec {
        &self.install
    }

    fn dependencies_present(&self) -> bool {
        self.dependency_directories
            .iter()
            .all(|directory| self.root.join(directory).is_dir())
    }
}

enum Flow {
    Continue,
    Interrupted,
}

/// Runs the bootstrap sequence against injected collaborators.
pub struct Bootstrap<'a, R, P, I> {
    runner: &'a R,
    control: &'a ControlPlane,
    probe: &'a P,
    interrupts: &'a I,
    plan: &'a BootstrapPlan,
}

impl<'a, R, P, I> Bootstrap<'a, R, P, I>
where
    R: CommandRunner,
    P: ServiceProbe,
    I: InterruptSource,
{
    /// Wires the sequence.
    #[must_use]
    pub const fn new(
        runner: &'a R,
        control: &'a ControlPlane,
        probe: &'a P,
        interrupts: &'a I,
        plan: &'a BootstrapPlan,
    ) -> Self {
        Self {
            runner,
            control,
            probe,
            interrupts,
            plan,
        }
    }

    /// Runs every step in order and records how the sequence ended.
    pub fn run<W: Write>(&self, output: &mut StatusOutput<W>) -> BootstrapOutcome {
        match self.run_steps(output) {
            Ok(Flow::Continue) => BootstrapOutcome::Completed,
            Ok(Flow::Interrupted) => BootstrapOutcome::Interrupted,
            Err(error) => {
                warn!(target: BOOTSTRAP_TARGET, error = %error, "bootstrap aborted");
                BootstrapOutcome::Failed(error)
            }
        }
    }

    fn run_steps<W: Write>(&self, output: &mut StatusOutput<W>) -> Result<Flow, BootstrapError> {
        output.line(
            Tone::Banner,
            format_args!("Starting full-stack development environment"),
        )?;
        output.line(
            Tone::Detail,
            format_args!("This will set up everything automatically..."),
        )?;

        output.step(1, format_args!("Checking container engine..."))?;
        self.ensure_control_plane(output)?;

        output.step(2, format_args!("Checking dependencies..."))?;
        self.ensure_dependencies(output)?;

        output.step(3, format_args!("Starting services..."))?;
        self.require(&self.control.up(), "starting services")?;
        output.success(format_args!("Services started"))?;

        output.step(4, format_args!("Waiting for database to be ready..."))?;
        if let Flow::Interrupted = self.await_service(self.plan.database(), output)? {
            return Ok(Flow::Interrupted);
        }

        output.step(5, format_args!("Setting up database schema..."))?;
        self.apply_schema(output)?;

        output.step(6, format_args!("Generating schema client..."))?;
        self.require(self.plan.client_generate(), "generating the schema client")?;
        output.success(format_args!("Schema client generated"))?;

        output.step(7, format_args!("Waiting for API server..."))?;
        if let Flow::Interrupted = self.await_service(self.plan.api(), output)? {
            return Ok(Flow::Interrupted);
        }

        output.step(8, format_args!("Waiting for UI dev server..."))?;
        if let Flow::Interrupted = self.await_service(self.plan.ui(), output)? {
            return Ok(Flow::Interrupted);
        }

        output.step(9, format_args!("Checking service status..."))?;
        // Informational only; a failing listing does not affect the outcome.
        let listing = self.runner.run(&self.control.list(), OutputMode::Inherit);
        if !listing.succeeded {
            warn!(
                target: BOOTSTRAP_TARGET,
                exit_code = listing.exit_code,
                "service listing failed"
            );
        }

        self.write_summary(output)?;
        info!(target: BOOTSTRAP_TARGET, "bootstrap completed");
        Ok(Flow::Continue)
    }

    fn ensure_control_plane<W: Write>(
        &self,
        output: &mut StatusOutput<W>,
    ) -> Result<(), BootstrapError> {
        let availability = self.control.availability();
        let outcome = self.runner.run(&availability, OutputMode::Capture);
        if !outcome.succeeded {
            return Err(BootstrapError::ToolUnavailable {
                program: availability.program().to_owned(),
                detail: outcome.diagnostic(),
            });
        }
        output.success(format_args!("{} is ready", availability.program()))?;
        Ok(())
    }

    fn ensure_dependencies<W: Write>(
        &self,
        output: &mut StatusOutput<W>,
    ) -> Result<(), BootstrapError> {
        if !self.plan.dependencies_present() {
            output.warning(format_args!("Dependencies not found. Installing..."))?;
            self.require(self.plan.install(), "installing dependencies")?;
        }
        output.success(format_args!("Dependencies ready"))?;
        Ok(())
    }

    fn apply_schema<W: Write>(&self, output: &mut StatusOutput<W>) -> Result<(), BootstrapError> {
        let primary = self
            .runner
            .run(self.plan.schema_apply(), OutputMode::Inherit);
        if !primary.succeeded {
            warn!(
                target: BOOTSTRAP_TARGET,
                command = %self.plan.schema_apply(),
                exit_code = primary.exit_code,
                "primary schema command failed"
            );
            output.warning(format_args!(
                "Schema push failed, trying migrate deploy..."
            ))?;
            let fallback = self
                .runner
                .run(self.plan.schema_fallback(), OutputMode::Inherit);
            if !fallback.succeeded {
                return Err(BootstrapError::SchemaBootstrap {
                    detail: fallback.diagnostic(),
                });
            }
        }
        output.success(format_args!("Database schema ready"))?;
        Ok(())
    }

    fn await_service<W: Write>(
        &self,
        descriptor: &ServiceDescriptor,
        output: &mut StatusOutput<W>,
    ) -> Result<Flow, BootstrapError> {
        match wait_for_service(descriptor, self.probe, self.interrupts, output)? {
            WaitOutcome::Ready { .. } | WaitOutcome::Degraded { .. } => Ok(Flow::Continue),
            WaitOutcome::Interrupted { .. } => Ok(Flow::Interrupted),
        }
    }

    fn require(&self, command: &CommandSpec, step: &'static str) -> Result<(), BootstrapError> {
        let outcome = self.runner.run(command, OutputMode::Inherit);
        if outcome.succeeded {
            Ok(())
        } else {
            Err(BootstrapError::Step {
                step,
                command: command.clone(),
                exit_code: outcome.exit_code,
            })
        }
    }

    fn write_summary<W: Write>(&self, output: &mut StatusOutput<W>) -> Result<(), BootstrapError> {
        let summary = &self.plan.summary;
        let compose = summary.compose_program.as_str();
        output.line(Tone::Banner, format_args!("\nDevelopment environment is ready!"))?;
        output.line(Tone::Heading, format_args!("\nService URLs:"))?;
        output.line(Tone::Highlight, format_args!("   UI: {}", summary.ui_url))?;
        output.line(Tone::Highlight, format_args!("   API: {}", summary.api_url))?;
        output.line(
            Tone::Highlight,
            format_args!("   Database: {}", summary.database_address),
        )?;
        output.line(Tone::Heading, format_args!("\nUseful commands:"))?;
        output.line(Tone::Progress, format_args!("   View all logs: {compose} logs -f"))?;
        output.line(Tone::Progress, format_args!("   Stop all services: {compose} down"))?;
        output.line(
            Tone::Progress,
            format_args!("   Restart services: {compose} restart"),
        )?;
        output.line(
            Tone::Progress,
            format_args!("   Press Ctrl+C to stop all services gracefully"),
        )?;
        Ok(())
    }
}
