//! Locates the project root that every external command runs from.
//!
//! The bootstrapper may be launched from any subdirectory of the project, so
//! the root is the nearest ancestor holding a compose file.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Compose file names recognised when discovering the project root.
pub const COMPOSE_FILE_NAMES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// Errors raised while resolving the project root.
#[derive(Debug, Error)]
pub enum ProjectRootError {
    /// The working directory could not be read.
    #[error("failed to read the working directory: {source}")]
    WorkingDirectory {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The working directory is not valid UTF-8.
    #[error("working directory {path:?} is not valid UTF-8")]
    NonUtf8 {
        /// Offending path.
        path: std::path::PathBuf,
    },
    /// No ancestor of the start directory holds a compose file.
    #[error("no compose file found in {start} or any parent directory")]
    NotFound {
        /// Directory the search started from.
        start: Utf8PathBuf,
    },
    /// A configured project root does not exist or is not a directory.
    #[error("configured project root {path} is not a directory")]
    NotADirectory {
        /// Configured path.
        path: Utf8PathBuf,
    },
}

/// Walks from `start` towards the filesystem root and returns the first
/// directory containing one of [`COMPOSE_FILE_NAMES`].
pub fn discover_project_root(start: &Utf8Path) -> Result<Utf8PathBuf, ProjectRootError> {
    start
        .ancestors()
        .find(|candidate| holds_compose_file(candidate))
        .map(Utf8Path::to_path_buf)
        .ok_or_else(|| ProjectRootError::NotFound {
            start: start.to_path_buf(),
        })
}

pub(crate) fn ensure_directory(path: &Utf8Path) -> Result<Utf8PathBuf, ProjectRootError> {
    if path.is_dir() {
        Ok(path.to_path_buf())
    } else {
        Err(ProjectRootError::NotADirectory {
            path: path.to_path_buf(),
        })
    }
}

fn holds_compose_file(directory: &Utf8Path) -> bool {
    COMPOSE_FILE_NAMES
        .iter()
        .any(|name| directory.join(name).is_file())
}
