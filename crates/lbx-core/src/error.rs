//! # Error Types
//!
//! Defines the error types used by the core crate. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! Validation problems are not errors in this sense: they are collected as
//! [`ValidationIssue`](crate::validation::ValidationIssue)s and reported,
//! never raised.

use thiserror::Error;

/// Top-level error type for the core crate.
#[derive(Error, Debug)]
pub enum LbxError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A digest URI could not be built or parsed.
    #[error("digest uri error: {0}")]
    NiUri(#[from] NiUriError),

    /// An entry could not be assembled.
    #[error("entry build error: {0}")]
    EntryBuild(#[from] EntryBuildError),

    /// A timestamp was malformed or not expressed in UTC.
    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// The value could not be converted into a JSON tree.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error building or parsing an `ni:///` digest URI.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NiUriError {
    /// The digest to encode was empty.
    #[error("digest must not be empty")]
    EmptyDigest,

    /// The algorithm token was empty or contained reserved characters.
    #[error("invalid algorithm token: '{0}'")]
    InvalidAlgorithm(String),

    /// The input did not start with the `ni:///` scheme prefix.
    #[error("missing ni:/// scheme prefix")]
    InvalidScheme,

    /// The input did not have the `<alg>;<digest>` shape.
    #[error("malformed digest uri: expected ni:///<alg>;<digest>")]
    Malformed,

    /// The digest segment was not valid unpadded base64url.
    #[error("digest is not valid base64url: {0}")]
    InvalidDigestEncoding(String),
}

/// Error assembling an [`Entry`](crate::entry::Entry) through the builder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryBuildError {
    /// A required member was never set.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A signed entry needs at least one signature.
    #[error("at least one signature is required")]
    NoSignatures,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lbx_error_wraps_ni_uri_error() {
        let err: LbxError = NiUriError::EmptyDigest.into();
        assert_eq!(err.to_string(), "digest uri error: digest must not be empty");
    }

    #[test]
    fn entry_build_error_names_field() {
        let err = EntryBuildError::MissingField("storage");
        assert_eq!(err.to_string(), "missing required field: storage");
    }

    #[test]
    fn invalid_timestamp_display() {
        let err = LbxError::InvalidTimestamp {
            value: "2024-01-01T00:00:00+05:00".to_string(),
            reason: "offset is not UTC".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("+05:00"));
        assert!(msg.contains("not UTC"));
    }
}
