//! Error types for the collection pipeline

use std::fmt;
use std::path::{Path, PathBuf};

/// Result type alias for collector operations
pub type CollectorResult<T> = Result<T, CollectorError>;

/// Errors that can occur while collecting, storing or aggregating snapshots
///
/// None of these are fatal. The collector loop logs them and carries on with
/// the next cycle.
#[derive(Debug)]
pub enum CollectorError {
    /// Upstream unreachable, timed out, or answered with a non-2xx status
    Network(String),

    /// Upstream answered but the body did not have the expected shape
    MalformedResponse(String),

    /// A backing file could not be read or written
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An on-disk document is in a format that cannot be migrated
    SchemaMigration { path: PathBuf, reason: String },
}

impl CollectorError {
    pub(crate) fn persistence(path: &Path, source: std::io::Error) -> Self {
        CollectorError::Persistence {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn schema(path: &Path, reason: impl Into<String>) -> Self {
        CollectorError::SchemaMigration {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Fetch failures are expected (the upstream is flaky) and are retried on the
    /// normal schedule. Everything else gets the short error backoff.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            CollectorError::Network(_) | CollectorError::MalformedResponse(_)
        )
    }
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectorError::Network(msg) => write!(f, "network error: {}", msg),
            CollectorError::MalformedResponse(msg) => {
                write!(f, "malformed upstream response: {}", msg)
            }
            CollectorError::Persistence { path, source } => {
                write!(f, "persistence error on {}: {}", path.display(), source)
            }
            CollectorError::SchemaMigration { path, reason } => {
                write!(
                    f,
                    "cannot migrate stored document {}: {}",
                    path.display(),
                    reason
                )
            }
        }
    }
}

impl std::error::Error for CollectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectorError::Persistence { source, .. } => Some(source),
            _ => None,
        }
    }
}
