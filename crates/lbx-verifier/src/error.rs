//! # Verifier Error Types
//!
//! A verification run that completes always yields a
//! [`VerificationResult`](crate::VerificationResult), valid or not. The
//! errors here are for runs that cannot complete (cancellation), for entry
//! points used without the collaborator they need, and for collaborator and
//! configuration failures.

use std::path::PathBuf;

use thiserror::Error;

use crate::result::VerificationResult;

/// Errors from the verifier's public entry points.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The run was cancelled. `result` holds every step finalized so far,
    /// the interrupted step last and marked Skipped.
    #[error("verification cancelled during '{step}'")]
    Cancelled {
        step: String,
        result: Box<VerificationResult>,
    },

    /// A required collaborator is not configured.
    #[error("verifier is not configured: {0}")]
    Configuration(String),

    /// The entry resolver does not know this id.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors reported by injected collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The backing service could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other failure, with the collaborator's message.
    #[error("{0}")]
    Failed(String),
}

/// Errors loading a [`VerifierConfig`](crate::VerifierConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_names_the_step() {
        let err = VerifyError::Cancelled {
            step: "Storage verification".to_string(),
            result: Box::default(),
        };
        assert_eq!(
            err.to_string(),
            "verification cancelled during 'Storage verification'"
        );
    }

    #[test]
    fn collaborator_failure_keeps_message() {
        assert_eq!(
            CollaboratorError::Failed("horizon returned 502".to_string()).to_string(),
            "horizon returned 502"
        );
    }
}
