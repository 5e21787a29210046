//! Default values for the local development topology.

use crate::logging::LogFormat;

/// Compose project name; containers are named `<project>-<service>-1`.
pub const DEFAULT_PROJECT_NAME: &str = "docker-study";

/// Compose control-plane executable.
pub const DEFAULT_COMPOSE_PROGRAM: &str = "docker-compose";

/// Container engine executable.
pub const DEFAULT_CONTAINER_PROGRAM: &str = "docker";

/// Compose service running PostgreSQL.
pub const DEFAULT_DATABASE_SERVICE: &str = "database";

/// Role passed to `pg_isready`.
pub const DEFAULT_DATABASE_USER: &str = "postgres";

/// Host port published by the database.
pub const DEFAULT_DATABASE_PORT: u16 = 5432;

/// Compose service running the API server.
pub const DEFAULT_API_SERVICE: &str = "backend";

/// Host port published by the API server.
pub const DEFAULT_API_PORT: u16 = 3001;

/// Path probed on the API server.
pub const DEFAULT_API_HEALTH_PATH: &str = "/health";

/// Compose service running the UI dev server.
pub const DEFAULT_UI_SERVICE: &str = "frontend";

/// Host port published by the UI dev server.
pub const DEFAULT_UI_PORT: u16 = 5173;

/// Probe attempts per service.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Delay between probe attempts.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Default log filter. Operator status lines carry the progress, so
/// diagnostics stay quiet unless requested.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default diagnostic log encoding.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
