//! Descriptions of the backing services the bootstrap sequence waits for.

use std::time::Duration;

use strum::Display;

/// Default probe attempts made before a wait times out.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Default fixed delay between probe attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2_000);

/// Kind of backing service; selects the readiness strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ServiceKind {
    /// PostgreSQL database, probed with a native readiness query.
    Database,
    /// HTTP API server, probed over HTTP.
    ApiServer,
    /// UI dev server, probed over HTTP.
    UiServer,
    /// Any other container; running is taken as ready.
    Generic,
}

/// What a timed-out wait means for the rest of the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    /// Abort the bootstrap sequence.
    Fatal,
    /// Warn and continue as if the service were ready.
    Degraded,
}

/// Immutable description of one backing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    name: String,
    kind: ServiceKind,
    container: String,
    url: Option<String>,
    max_attempts: u32,
    poll_interval: Duration,
    severity: Severity,
}

impl ServiceDescriptor {
    /// Describes `name` with the default attempt budget, poll interval, and
    /// fatal severity. The container defaults to the service name.
    #[must_use]
    pub fn new(service: impl Into<String>, kind: ServiceKind) -> Self {
        let name: String = service.into();
        Self {
            container: name.clone(),
            name,
            kind,
            url: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            severity: Severity::Fatal,
        }
    }

    /// Sets the container inspected for structured health.
    #[must_use]
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    /// Sets the URL probed for HTTP reachability.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the attempt budget. A budget of zero is raised to one so every
    /// wait probes at least once.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the fixed delay between attempts.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the timeout severity.
    #[must_use]
    pub const fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Compose service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Readiness strategy selector.
    #[must_use]
    pub const fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Container inspected for structured health.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// URL probed for HTTP reachability, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Attempt budget; always at least one.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fixed delay between attempts.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Timeout severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }
}
