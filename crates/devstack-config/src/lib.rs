//! Shared configuration for the `devstack` bootstrapper.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then an
//! optional `.devstack.toml` file (or the file named by
//! `DEVSTACK_CONFIG_PATH`), then `DEVSTACK_*` environment variables.
//! The binary exposes no command flags, so the command-line layer only ever
//! sees the program name.

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod project;

pub use defaults::{
    DEFAULT_API_HEALTH_PATH, DEFAULT_API_PORT, DEFAULT_API_SERVICE, DEFAULT_COMPOSE_PROGRAM,
    DEFAULT_CONTAINER_PROGRAM, DEFAULT_DATABASE_PORT, DEFAULT_DATABASE_SERVICE,
    DEFAULT_DATABASE_USER, DEFAULT_LOG_FILTER, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_PROJECT_NAME, DEFAULT_UI_PORT, DEFAULT_UI_SERVICE, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use project::{COMPOSE_FILE_NAMES, ProjectRootError, discover_project_root};

/// Program name presented to the configuration loader in place of argv.
const PROGRAM_NAME: &str = "devstack";

/// Runtime configuration for the bootstrap sequence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DEVSTACK")]
pub struct Config {
    /// Explicit project root. Discovered from the working directory when
    /// unset.
    pub project_root: Option<Utf8PathBuf>,
    /// Compose project name used to derive container names.
    #[ortho_config(default = String::from(DEFAULT_PROJECT_NAME))]
    pub project_name: String,
    /// Compose control-plane executable.
    #[ortho_config(default = String::from(DEFAULT_COMPOSE_PROGRAM))]
    pub compose_program: String,
    /// Container engine executable used for availability and health checks.
    #[ortho_config(default = String::from(DEFAULT_CONTAINER_PROGRAM))]
    pub container_program: String,
    /// Compose service name of the database.
    #[ortho_config(default = String::from(DEFAULT_DATABASE_SERVICE))]
    pub database_service: String,
    /// Role used by the database readiness query.
    #[ortho_config(default = String::from(DEFAULT_DATABASE_USER))]
    pub database_user: String,
    /// Host port published by the database.
    #[ortho_config(default = DEFAULT_DATABASE_PORT)]
    pub database_port: u16,
    /// Compose service name of the API server.
    #[ortho_config(default = String::from(DEFAULT_API_SERVICE))]
    pub api_service: String,
    /// Host port published by the API server.
    #[ortho_config(default = DEFAULT_API_PORT)]
    pub api_port: u16,
    /// Path requested when probing the API server.
    #[ortho_config(default = String::from(DEFAULT_API_HEALTH_PATH))]
    pub api_health_path: String,
    /// Compose service name of the UI dev server.
    #[ortho_config(default = String::from(DEFAULT_UI_SERVICE))]
    pub ui_service: String,
    /// Host port published by the UI dev server.
    #[ortho_config(default = DEFAULT_UI_PORT)]
    pub ui_port: u16,
    /// Probe attempts made per service before giving up.
    #[ortho_config(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
    /// Fixed delay between probe attempts, in milliseconds.
    #[ortho_config(default = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,
    /// `tracing` filter expression for diagnostic logs.
    #[ortho_config(default = String::from(DEFAULT_LOG_FILTER))]
    pub log_filter: String,
    /// Diagnostic log encoding.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_root: None,
            project_name: String::from(DEFAULT_PROJECT_NAME),
            compose_program: String::from(DEFAULT_COMPOSE_PROGRAM),
            container_program: String::from(DEFAULT_CONTAINER_PROGRAM),
            database_service: String::from(DEFAULT_DATABASE_SERVICE),
            database_user: String::from(DEFAULT_DATABASE_USER),
            database_port: DEFAULT_DATABASE_PORT,
            api_service: String::from(DEFAULT_API_SERVICE),
            api_port: DEFAULT_API_PORT,
            api_health_path: String::from(DEFAULT_API_HEALTH_PATH),
            ui_service: String::from(DEFAULT_UI_SERVICE),
            ui_port: DEFAULT_UI_PORT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            log_filter: String::from(DEFAULT_LOG_FILTER),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration from defaults, the configuration file, and the
    /// environment, ignoring the process arguments.
    pub fn load_layers() -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter([OsString::from(PROGRAM_NAME)])
    }

    /// Filter expression handed to the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Diagnostic log encoding.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Delay between consecutive probe attempts.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Resolves the project root: the configured path when set, otherwise
    /// the nearest ancestor of the working directory holding a compose file.
    pub fn resolve_project_root(&self) -> Result<Utf8PathBuf, ProjectRootError> {
        if let Some(root) = &self.project_root {
            return project::ensure_directory(root);
        }
        let current = std::env::current_dir()
            .map_err(|source| ProjectRootError::WorkingDirectory { source })?;
        let start = Utf8PathBuf::from_path_buf(current)
            .map_err(|path| ProjectRootError::NonUtf8 { path })?;
        discover_project_root(&start)
    }

    /// Base URL of the API server on the local host.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("http://localhost:{}{}", self.api_port, self.api_health_path)
    }

    /// Base URL of the UI dev server on the local host.
    #[must_use]
    pub fn ui_url(&self) -> String {
        format!("http://localhost:{}", self.ui_port)
    }
}
