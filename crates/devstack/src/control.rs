//! Command construction for the container control plane.
//!
//! The bootstrap sequence only cares about semantic queries such as "is this
//! service up?" or "tear everything down"; the exact invocations live here.

use devstack_config::Config;

use crate::runner::CommandSpec;

/// Builds control-plane commands for one compose project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPlane {
    compose_program: String,
    container_program: String,
    project_name: String,
}

impl ControlPlane {
    /// Derives the control plane from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            compose_program: config.compose_program.clone(),
            container_program: config.container_program.clone(),
            project_name: config.project_name.clone(),
        }
    }

    fn compose(&self) -> CommandSpec {
        CommandSpec::new(self.compose_program.as_str())
    }

    /// Confirms the container engine can be invoked at all.
    #[must_use]
    pub fn availability(&self) -> CommandSpec {
        CommandSpec::new(self.container_program.as_str()).arg("--version")
    }

    /// Builds images and starts every service in the background.
    #[must_use]
    pub fn up(&self) -> CommandSpec {
        self.compose().args(["up", "-d", "--build"])
    }

    /// Stops and removes every service.
    #[must_use]
    pub fn down(&self) -> CommandSpec {
        self.compose().arg("down")
    }

    /// Streams logs from every service until interrupted.
    #[must_use]
    pub fn follow_logs(&self) -> CommandSpec {
        self.compose().args(["logs", "-f"])
    }

    /// Lists every service with its state.
    #[must_use]
    pub fn list(&self) -> CommandSpec {
        self.compose().arg("ps")
    }

    /// Lists one service with its state.
    #[must_use]
    pub fn service_state(&self, service: &str) -> CommandSpec {
        self.compose().args(["ps", service])
    }

    /// Reads the structured health status of a container.
    #[must_use]
    pub fn health_status(&self, container: &str) -> CommandSpec {
        CommandSpec::new(self.container_program.as_str()).args([
            "inspect",
            "--format",
            "{{.State.Health.Status}}",
            container,
        ])
    }

    /// Runs a command inside a service container without a TTY.
    #[must_use]
    pub fn exec<I, S>(&self, service: &str, command: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compose()
            .args(["exec", "-T", service])
            .args(command)
    }

    /// Name of the first container of `service`.
    #[must_use]
    pub fn container_name(&self, service: &str) -> String {
        format!("{}-{service}-1", self.project_name)
    }
}
