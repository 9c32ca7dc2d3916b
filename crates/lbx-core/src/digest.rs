//! # Content Digest: Hash Algorithms and Tagged Digests
//!
//! Defines [`HashAlgorithm`] (the SHA-2 family members an entry may declare)
//! and [`ContentDigest`], a digest value tagged with the algorithm that
//! produced it.
//!
//! ## Security Invariant
//!
//! Digests of structured values are computed from `CanonicalBytes` only
//! (see [`hash`] and [`sha256_digest`]). Raw byte digests via
//! [`HashAlgorithm::digest`] exist for content blobs (the bytes behind a
//! storage integrity proof), never for records.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::canonical::CanonicalBytes;
use crate::error::CanonicalizationError;

/// A supported hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-256, the default for integrity proofs and anchors.
    #[serde(rename = "sha-256")]
    Sha256,
    /// SHA-384.
    #[serde(rename = "sha-384")]
    Sha384,
    /// SHA-512.
    #[serde(rename = "sha-512")]
    Sha512,
}

impl HashAlgorithm {
    /// All supported algorithms, in preference order.
    pub const ALL: [HashAlgorithm; 3] = [Self::Sha256, Self::Sha384, Self::Sha512];

    /// Returns the algorithm token as used in digest URIs (`sha-256`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha-256",
            Self::Sha384 => "sha-384",
            Self::Sha512 => "sha-512",
        }
    }

    /// Resolve a declared algorithm name.
    ///
    /// Case-insensitive, and hyphens are ignored, so `SHA-256`, `sha256` and
    /// `Sha-256` all resolve to [`HashAlgorithm::Sha256`].
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Output length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Digest raw bytes with this algorithm.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unsupported hash algorithm: {s}"))
    }
}

/// A digest value with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: HashAlgorithm,
    /// The raw digest bytes.
    pub bytes: Vec<u8>,
}

impl ContentDigest {
    /// Digest canonical bytes under `algorithm`.
    pub fn of_canonical(algorithm: HashAlgorithm, canonical: &CanonicalBytes) -> Self {
        Self {
            algorithm,
            bytes: algorithm.digest(canonical.as_bytes()),
        }
    }

    /// Digest a content blob under `algorithm`.
    pub fn of_content(algorithm: HashAlgorithm, content: &[u8]) -> Self {
        Self {
            algorithm,
            bytes: algorithm.digest(content),
        }
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// SHA-256 digest of canonical bytes.
pub fn sha256_digest(canonical: &CanonicalBytes) -> ContentDigest {
    ContentDigest::of_canonical(HashAlgorithm::Sha256, canonical)
}

/// `digest(canonicalize(value))` under the requested algorithm.
pub fn hash(
    value: &impl Serialize,
    algorithm: HashAlgorithm,
) -> Result<ContentDigest, CanonicalizationError> {
    let canonical = CanonicalBytes::new(value)?;
    Ok(ContentDigest::of_canonical(algorithm, &canonical))
}
