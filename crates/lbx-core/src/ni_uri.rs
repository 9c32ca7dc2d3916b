//! # Digest URIs (`ni:///`)
//!
//! Content-integrity proofs are expressed as RFC 6920 style named-information
//! URIs with an empty authority:
//!
//! ```text
//! ni:///sha-256;uU0nuZNNPgilLlLX2n2r-sSE7-N6U4DukIj3rOLvzek
//! ```
//!
//! The algorithm token is always lowercase and the digest is unpadded
//! base64url. This is the form carried in `storage.integrity_proof`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::digest::{ContentDigest, HashAlgorithm};
use crate::error::NiUriError;

/// Scheme prefix, including the empty authority.
pub const NI_SCHEME_PREFIX: &str = "ni:///";

/// A parsed digest URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NiUri {
    /// Lowercase algorithm token, e.g. `sha-256`.
    pub algorithm: String,
    /// Raw digest bytes.
    pub digest: Vec<u8>,
}

impl NiUri {
    /// Build a digest URI string from raw digest bytes.
    ///
    /// # Errors
    ///
    /// Returns [`NiUriError::EmptyDigest`] for an empty digest and
    /// [`NiUriError::InvalidAlgorithm`] for an empty token or one containing
    /// `;` or `/`.
    pub fn create(digest: &[u8], algorithm: &str) -> Result<String, NiUriError> {
        if digest.is_empty() {
            return Err(NiUriError::EmptyDigest);
        }
        let token = normalize_algorithm(algorithm)?;
        Ok(format!(
            "{NI_SCHEME_PREFIX}{token};{}",
            URL_SAFE_NO_PAD.encode(digest)
        ))
    }

    /// Digest `content` under `algorithm` and return its URI.
    pub fn for_content(algorithm: HashAlgorithm, content: &[u8]) -> String {
        let digest = algorithm.digest(content);
        format!(
            "{NI_SCHEME_PREFIX}{};{}",
            algorithm.as_str(),
            URL_SAFE_NO_PAD.encode(digest)
        )
    }

    /// Parse a digest URI.
    ///
    /// The algorithm token is lowercased. Unknown algorithm tokens are
    /// accepted here; use [`NiUri::hash_algorithm`] to check support.
    pub fn try_parse(uri: &str) -> Result<Self, NiUriError> {
        let rest = uri
            .trim()
            .strip_prefix(NI_SCHEME_PREFIX)
            .ok_or(NiUriError::InvalidScheme)?;
        let (algorithm, encoded) = rest.split_once(';').ok_or(NiUriError::Malformed)?;
        if encoded.is_empty() || encoded.contains(';') {
            return Err(NiUriError::Malformed);
        }
        let algorithm = normalize_algorithm(algorithm)?;
        let digest = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| NiUriError::InvalidDigestEncoding(e.to_string()))?;
        if digest.is_empty() {
            return Err(NiUriError::EmptyDigest);
        }
        Ok(Self { algorithm, digest })
    }

    /// The hash algorithm, when the token names a supported one.
    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        HashAlgorithm::parse(&self.algorithm)
    }

    /// The parsed digest as a [`ContentDigest`], when the algorithm is supported.
    pub fn content_digest(&self) -> Option<ContentDigest> {
        self.hash_algorithm().map(|algorithm| ContentDigest {
            algorithm,
            bytes: self.digest.clone(),
        })
    }
}

impl std::fmt::Display for NiUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{NI_SCHEME_PREFIX}{};{}",
            self.algorithm,
            URL_SAFE_NO_PAD.encode(&self.digest)
        )
    }
}

impl std::str::FromStr for NiUri {
    type Err = NiUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s)
    }
}

fn normalize_algorithm(algorithm: &str) -> Result<String, NiUriError> {
    let token = algorithm.trim();
    if token.is_empty() || token.contains(';') || token.contains('/') {
        return Err(NiUriError::InvalidAlgorithm(algorithm.to_string()));
    }
    Ok(token.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_uses_lowercase_token_and_unpadded_base64url() {
        let digest = HashAlgorithm::Sha256.digest(b"hello world");
        let uri = NiUri::create(&digest, "SHA-256").unwrap();
        assert_eq!(
            uri,
            "ni:///sha-256;uU0nuZNNPgilLlLX2n2r-sSE7-N6U4DukIj3rOLvzek"
        );
        assert!(!uri.contains('='));
    }

    #[test]
    fn for_content_matches_create() {
        let digest = HashAlgorithm::Sha384.digest(b"payload");
        assert_eq!(
            NiUri::for_content(HashAlgorithm::Sha384, b"payload"),
            NiUri::create(&digest, "sha-384").unwrap()
        );
    }

    #[test]
    fn parse_normalizes_algorithm() {
        let parsed = NiUri::try_parse("ni:///SHA-256;AQID").unwrap();
        assert_eq!(parsed.algorithm, "sha-256");
        assert_eq!(parsed.digest, vec![1, 2, 3]);
        assert_eq!(parsed.hash_algorithm(), Some(HashAlgorithm::Sha256));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(NiUri::try_parse("ni:///notarealalg;badbase64").is_err());
    }

    #[test]
    fn parse_rejects_wrong_scheme() {
        assert_eq!(
            NiUri::try_parse("sha-256;AQID"),
            Err(NiUriError::InvalidScheme)
        );
        assert_eq!(
            NiUri::try_parse("ni://host/sha-256;AQID"),
            Err(NiUriError::InvalidScheme)
        );
    }

    #[test]
    fn parse_rejects_missing_parts() {
        assert_eq!(NiUri::try_parse("ni:///sha-256"), Err(NiUriError::Malformed));
        assert_eq!(NiUri::try_parse("ni:///sha-256;"), Err(NiUriError::Malformed));
        assert!(matches!(
            NiUri::try_parse("ni:///;AQID"),
            Err(NiUriError::InvalidAlgorithm(_))
        ));
    }

    #[test]
    fn parse_rejects_standard_base64_alphabet() {
        assert!(matches!(
            NiUri::try_parse("ni:///sha-256;a+b/"),
            Err(NiUriError::InvalidDigestEncoding(_))
        ));
    }

    #[test]
    fn create_rejects_empty_digest() {
        assert_eq!(NiUri::create(&[], "sha-256"), Err(NiUriError::EmptyDigest));
    }

    #[test]
    fn unknown_algorithm_parses_but_is_unsupported() {
        let parsed = NiUri::try_parse("ni:///blake3;AQID").unwrap();
        assert_eq!(parsed.hash_algorithm(), None);
        assert!(parsed.content_digest().is_none());
    }

    #[test]
    fn display_round_trips() {
        let uri = "ni:///sha-512;AAEC";
        assert_eq!(NiUri::try_parse(uri).unwrap().to_string(), uri);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn create_then_parse_returns_inputs(
            digest in prop::collection::vec(any::<u8>(), 1..80),
            alg in prop::sample::select(vec!["sha-256", "sha-384", "sha-512"]),
        ) {
            let uri = NiUri::create(&digest, alg).unwrap();
            let parsed = NiUri::try_parse(&uri).unwrap();
            prop_assert_eq!(parsed.algorithm, alg);
            prop_assert_eq!(parsed.digest, digest);
        }
    }
}
