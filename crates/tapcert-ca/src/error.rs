//! Error types for CA provisioning.

use thiserror::Error;

/// Errors that can occur while provisioning the CA or issuing certificates.
///
/// Every variant is fatal: the pipeline aborts at the point of detection
/// without retries or rollback. Deterministic local operations that fail
/// indicate misconfiguration or an environment defect, never a transient
/// fault.
#[derive(Error, Debug)]
pub enum CaError {
    /// The crypto backend rejected generated key material.
    #[error("crypto engine error: {0}")]
    Engine(String),

    /// Required artifacts are absent before leaf issuance.
    #[error("missing required files: {}", .0.join(", "))]
    MissingPrerequisite(Vec<String>),

    /// An individual cryptographic operation failed.
    #[error("{operation} failed: {detail}")]
    Operation {
        operation: &'static str,
        detail: String,
    },

    /// A configuration artifact is malformed.
    #[error("profile error: {0}")]
    Profile(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaError {
    /// Wrap a key-import failure from the signing backend.
    pub(crate) fn engine(error: impl std::fmt::Display) -> Self {
        Self::Engine(error.to_string())
    }
}

/// Execute one named cryptographic operation.
///
/// On failure the operation name and the provider's diagnostic text are
/// captured into [`CaError::Operation`] so the user sees which step broke
/// and why, in a single line.
pub(crate) fn run<T, E>(
    operation: &'static str,
    op: impl FnOnce() -> Result<T, E>,
) -> crate::Result<T>
where
    E: std::fmt::Display,
{
    tracing::debug!("running: {operation}");
    op().map_err(|error| CaError::Operation {
        operation,
        detail: error.to_string(),
    })
}
