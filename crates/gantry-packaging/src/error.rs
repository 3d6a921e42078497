//! Error types for packaging orchestration

use thiserror::Error;

use gantry_signing::SigningError;

/// Result type alias for packaging operations
pub type Result<T> = std::result::Result<T, PackagingError>;

/// A fatal outcome of one packaging pass
#[derive(Debug, Error)]
#[error("pass '{pass}' failed: {source}")]
pub struct PassFailure {
    /// The pass's variant name
    pub pass: String,
    #[source]
    pub source: PackagingError,
}

/// Packaging-related errors
#[derive(Debug, Error)]
pub enum PackagingError {
    /// Fatal signing outcome of a pass
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// One or more passes ended fatally. Sibling passes were allowed to
    /// finish; nothing ships when any channel failed.
    #[error("{} of {total} packaging pass(es) failed: {}", .failures.len(), summarize(.failures))]
    PassesFailed {
        failures: Vec<PassFailure>,
        total: usize,
    },

    /// The supplied pre-built bundle does not exist
    #[error("pre-built bundle not found at {0}")]
    BundleNotFound(std::path::PathBuf),

    /// A pass task panicked or was cancelled
    #[error("packaging task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn summarize(failures: &[PassFailure]) -> String {
    failures
        .iter()
        .map(PassFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
