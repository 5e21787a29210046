//! Readiness probes for backing services.
//!
//! Every probe walks the same ladder, each rung gated on the previous one:
//! 1. the container must be listed as `Up` by the control plane;
//! 2. a `healthy` structured health status is accepted immediately;
//! 3. otherwise the strategy registered for the service kind decides.
//!
//! Strategies live in a table keyed by [`ServiceKind`], so supporting a new
//! kind means registering one function. Failures never escape a probe; they
//! become [`Readiness::NotReady`] or [`Readiness::Indeterminate`].

use std::collections::HashMap;

use tracing::debug;

use crate::control::ControlPlane;
use crate::runner::{CommandRunner, OutputMode};
use crate::service::{ServiceDescriptor, ServiceKind};

mod http;

pub use http::{DEFAULT_HTTP_TIMEOUT, HttpProbe, HttpProbeError};

/// Tracing target for probe operations.
const PROBE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::probe");

/// Marker printed by the control plane for running containers.
const RUNNING_MARKER: &str = "Up";

/// Structured health status accepted without further checks.
const HEALTHY_STATUS: &str = "healthy";

/// Tri-state probe verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The service accepts requests.
    Ready,
    /// The service is reachable but not yet usable.
    NotReady,
    /// The probe could not reach a verdict.
    Indeterminate,
}

/// Outcome of one probe call together with raw diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Verdict.
    pub readiness: Readiness,
    /// Raw text explaining the verdict.
    pub diagnostic: String,
}

impl ProbeResult {
    /// Ready verdict.
    #[must_use]
    pub fn ready(diagnostic: impl Into<String>) -> Self {
        Self {
            readiness: Readiness::Ready,
            diagnostic: diagnostic.into(),
        }
    }

    /// Not-ready verdict.
    #[must_use]
    pub fn not_ready(diagnostic: impl Into<String>) -> Self {
        Self {
            readiness: Readiness::NotReady,
            diagnostic: diagnostic.into(),
        }
    }

    /// Indeterminate verdict.
    #[must_use]
    pub fn indeterminate(diagnostic: impl Into<String>) -> Self {
        Self {
            readiness: Readiness::Indeterminate,
            diagnostic: diagnostic.into(),
        }
    }

    /// True for [`Readiness::Ready`].
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }
}

/// Checks whether a backing service can accept requests.
pub trait ServiceProbe {
    /// Performs one readiness check for `descriptor`.
    fn check(&self, descriptor: &ServiceDescriptor) -> ProbeResult;
}

/// Collaborators shared by every probe strategy.
pub struct ProbeContext<'a, R> {
    runner: &'a R,
    control: &'a ControlPlane,
    http: HttpProbe,
    database_user: String,
}

impl<'a, R> ProbeContext<'a, R> {
    /// Bundles the collaborators used by the strategies.
    #[must_use]
    pub fn new(
        runner: &'a R,
        control: &'a ControlPlane,
        http: HttpProbe,
        database_user: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            control,
            http,
            database_user: database_user.into(),
        }
    }
}

/// Kind-specific rung of the probe ladder.
pub type KindCheck<R> = fn(&ProbeContext<'_, R>, &ServiceDescriptor) -> ProbeResult;

/// Probe dispatching to one registered strategy per [`ServiceKind`].
pub struct ProbeTable<'a, R> {
    context: ProbeContext<'a, R>,
    strategies: HashMap<ServiceKind, KindCheck<R>>,
}

impl<'a, R: CommandRunner> ProbeTable<'a, R> {
    /// Builds a table with the standard strategy for every kind.
    #[must_use]
    pub fn new(context: ProbeContext<'a, R>) -> Self {
        let mut table = Self {
            context,
            strategies: HashMap::new(),
        };
        table.register(ServiceKind::Database, database_accepts_connections::<R>);
        table.register(ServiceKind::ApiServer, http_reachable::<R>);
        table.register(ServiceKind::UiServer, http_reachable::<R>);
        table.register(ServiceKind::Generic, running_is_ready::<R>);
        table
    }

    /// Registers or replaces the strategy for `kind`.
    pub fn register(&mut self, kind: ServiceKind, check: KindCheck<R>) {
        self.strategies.insert(kind, check);
    }

    fn container_running(&self, descriptor: &ServiceDescriptor) -> Result<(), ProbeResult> {
        let state = self.context.runner.run(
            &self.context.control.service_state(descriptor.name()),
            OutputMode::Capture,
        );
        if !state.succeeded {
            return Err(ProbeResult::indeterminate(state.diagnostic()));
        }
        if !state.stdout.contains(RUNNING_MARKER) {
            return Err(ProbeResult::not_ready(format!(
                "{} is not running",
                descriptor.name()
            )));
        }
        Ok(())
    }

    fn reports_healthy(&self, descriptor: &ServiceDescriptor) -> bool {
        let health = self.context.runner.run(
            &self.context.control.health_status(descriptor.container()),
            OutputMode::Capture,
        );
        health.succeeded && health.stdout.trim() == HEALTHY_STATUS
    }
}

impl<R: CommandRunner> ServiceProbe for ProbeTable<'_, R> {
    fn check(&self, descriptor: &ServiceDescriptor) -> ProbeResult {
        if let Err(verdict) = self.container_running(descriptor) {
            debug!(
                target: PROBE_TARGET,
                service = descriptor.name(),
                verdict = ?verdict.readiness,
                diagnostic = %verdict.diagnostic,
                "container not running"
            );
            return verdict;
        }
        if self.reports_healthy(descriptor) {
            return ProbeResult::ready("health status reports healthy");
        }
        let strategy = self
            .strategies
            .get(&descriptor.kind())
            .copied()
            .unwrap_or(running_is_ready::<R>);
        let verdict = strategy(&self.context, descriptor);
        debug!(
            target: PROBE_TARGET,
            service = descriptor.name(),
            kind = %descriptor.kind(),
            verdict = ?verdict.readiness,
            diagnostic = %verdict.diagnostic,
            "kind-specific probe finished"
        );
        verdict
    }
}

fn database_accepts_connections<R: CommandRunner>(
    context: &ProbeContext<'_, R>,
    descriptor: &ServiceDescriptor,
) -> ProbeResult {
    let query = context.control.exec(
        descriptor.name(),
        ["pg_isready", "-U", context.database_user.as_str()],
    );
    let outcome = context.runner.run(&query, OutputMode::Capture);
    if outcome.succeeded {
        ProbeResult::ready("database accepts connections")
    } else {
        ProbeResult::not_ready(outcome.diagnostic())
    }
}

fn http_reachable<R: CommandRunner>(
    context: &ProbeContext<'_, R>,
    descriptor: &ServiceDescriptor,
) -> ProbeResult {
    descriptor.url().map_or_else(
        || running_is_ready(context, descriptor),
        |url| context.http.check(url),
    )
}

fn running_is_ready<R>(
    _context: &ProbeContext<'_, R>,
    descriptor: &ServiceDescriptor,
) -> ProbeResult {
    ProbeResult::ready(format!("{} is running", descriptor.name()))
}
