//! # Signing Error Types
//!
//! Structured errors for signing and key store operations. Verification
//! failures are not errors: `verify` reports them as `Ok(false)`.

use thiserror::Error;

/// Errors from signing operations.
#[derive(Error, Debug)]
pub enum SigningError {
    /// The algorithm identifier is not one of the supported three or their aliases.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The key's declared type does not normalize to the requested algorithm.
    #[error("key {key_id} has type {key_type}, which cannot sign {algorithm}")]
    KeyAlgorithmMismatch {
        key_id: String,
        key_type: String,
        algorithm: String,
    },

    /// The key carries no private material.
    #[error("key {0} has no private material")]
    MissingPrivateKey(String),

    /// The key has been revoked.
    #[error("key {0} is revoked")]
    KeyRevoked(String),

    /// Refusing to sign an empty payload.
    #[error("payload must not be empty")]
    EmptyPayload,

    /// Key material could not be decoded or parsed for its algorithm.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// A signature value was not valid base64url or had the wrong shape.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The cryptographic primitive failed to produce a signature.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// The multi-signature policy is unusable.
    #[error("invalid multi-signature policy: {0}")]
    InvalidPolicy(String),

    /// Fewer eligible signatures than the policy threshold.
    #[error("multi-signature threshold not met: required {required}, produced {produced}")]
    InsufficientSignatures { required: usize, produced: usize },

    /// The entry could not be canonicalized for signing.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] lbx_core::CanonicalizationError),

    /// Key store failure.
    #[error("key store error: {0}")]
    KeyStore(#[from] KeyStoreError),
}

/// Errors from key store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyStoreError {
    /// Keys must have a non-empty id.
    #[error("key id must not be empty")]
    EmptyKeyId,

    /// No key with this id.
    #[error("key not found: {0}")]
    NotFound(String),
}
