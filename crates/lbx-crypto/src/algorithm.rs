//! # Signature Algorithms
//!
//! The closed set of signature algorithms and the dispatch from an algorithm
//! tag to its per-variant sign and verify functions.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SigningError;
use crate::{ed25519, es256k, rs256};

/// A supported signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignatureAlgorithm {
    /// Ed25519 (RFC 8037 `EdDSA`).
    EdDsa,
    /// ECDSA over secp256k1 with SHA-256, fixed-width `r‖s` signatures.
    Es256k,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rs256,
}

impl SignatureAlgorithm {
    pub const ALL: [SignatureAlgorithm; 3] = [Self::EdDsa, Self::Es256k, Self::Rs256];

    /// Map an identifier or alias, case-insensitively, to an algorithm.
    ///
    /// # Errors
    ///
    /// [`SigningError::UnsupportedAlgorithm`] for anything outside the three
    /// identifiers and their aliases.
    pub fn normalize(name: &str) -> Result<Self, SigningError> {
        let trimmed = name.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "eddsa" | "ed25519" => Ok(Self::EdDsa),
            "es256k" | "secp256k1" => Ok(Self::Es256k),
            "rs256" | "rsa" | "rsassa-pkcs1-v1_5" => Ok(Self::Rs256),
            _ => Err(SigningError::UnsupportedAlgorithm(trimmed.to_string())),
        }
    }

    /// Canonical identifier as written into protected headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EdDsa => "EdDSA",
            Self::Es256k => "ES256K",
            Self::Rs256 => "RS256",
        }
    }

    /// Sign `payload` with private key material in any accepted encoding.
    pub fn sign(&self, private_key: &str, payload: &[u8]) -> Result<Vec<u8>, SigningError> {
        match self {
            Self::EdDsa => ed25519::sign(private_key, payload),
            Self::Es256k => es256k::sign(private_key, payload),
            Self::Rs256 => rs256::sign(private_key, payload),
        }
    }

    /// Check `signature` over `payload` with public key material.
    ///
    /// Returns `Ok(false)` for a signature that does not verify and `Err`
    /// only when the key material or signature cannot be decoded.
    pub fn verify(
        &self,
        public_key: &str,
        payload: &[u8],
        signature: &[u8],
    ) -> Result<bool, SigningError> {
        match self {
            Self::EdDsa => ed25519::verify(public_key, payload, signature),
            Self::Es256k => es256k::verify(public_key, payload, signature),
            Self::Rs256 => rs256::verify(public_key, payload, signature),
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SignatureAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

impl Serialize for SignatureAlgorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SignatureAlgorithm {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::normalize(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_normalize_case_insensitively() {
        let cases = [
            ("EdDSA", SignatureAlgorithm::EdDsa),
            ("ed25519", SignatureAlgorithm::EdDsa),
            ("ED25519", SignatureAlgorithm::EdDsa),
            ("ES256K", SignatureAlgorithm::Es256k),
            ("secp256k1", SignatureAlgorithm::Es256k),
            ("rs256", SignatureAlgorithm::Rs256),
            ("RSA", SignatureAlgorithm::Rs256),
            ("RSASSA-PKCS1-v1_5", SignatureAlgorithm::Rs256),
        ];
        for (name, expected) in cases {
            assert_eq!(SignatureAlgorithm::normalize(name).unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn unknown_identifiers_are_hard_errors() {
        for name in ["HS256", "ES256", "", "none"] {
            assert!(matches!(
                SignatureAlgorithm::normalize(name),
                Err(SigningError::UnsupportedAlgorithm(_))
            ));
        }
    }

    #[test]
    fn serde_writes_canonical_identifier() {
        let json = serde_json::to_string(&SignatureAlgorithm::Es256k).unwrap();
        assert_eq!(json, "\"ES256K\"");
        let parsed: SignatureAlgorithm = serde_json::from_str("\"secp256k1\"").unwrap();
        assert_eq!(parsed, SignatureAlgorithm::Es256k);
        assert!(serde_json::from_str::<SignatureAlgorithm>("\"HS256\"").is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for alg in SignatureAlgorithm::ALL {
            let parsed: SignatureAlgorithm = alg.to_string().parse().unwrap();
            assert_eq!(parsed, alg);
        }
    }
}
