//! # Signing Keys and Key Material
//!
//! [`SigningKey`] is the key record shared by signer and verifier. The
//! signer's copy carries private material; the copy in the key store after
//! signing does not.
//!
//! ## Key material encodings
//!
//! [`decode_key_material`] accepts, in order of detection:
//!
//! 1. PEM (`-----BEGIN ...`): the base64 body is decoded to DER.
//! 2. `0x`-prefixed hex.
//! 3. Plain hex (even length, hex digits only).
//! 4. base64url, padded or not.
//! 5. Standard base64, padded or not.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use lbx_core::Timestamp;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::algorithm::SignatureAlgorithm;
use crate::error::SigningError;
use crate::{ed25519, es256k, rs256};

/// Default RSA modulus size for generated keys.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// A signing or verification key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKey {
    /// Identifier carried as `kid` in signature headers.
    pub key_id: String,
    /// Algorithm family, any identifier or alias [`SignatureAlgorithm`] accepts.
    #[serde(rename = "type")]
    pub key_type: String,
    /// Public key material.
    pub public_key: String,
    /// Private key material. Present only on the signer's copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// DID or account that controls the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<Timestamp>,
}

impl SigningKey {
    /// A public-only key record.
    pub fn public(
        key_id: impl Into<String>,
        algorithm: SignatureAlgorithm,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            key_type: algorithm.as_str().to_string(),
            public_key: public_key.into(),
            private_key: None,
            controller: None,
            revoked: false,
            revoked_at: None,
        }
    }

    /// Generate a fresh key pair. RSA keys use [`DEFAULT_RSA_BITS`].
    pub fn generate(
        algorithm: SignatureAlgorithm,
        key_id: impl Into<String>,
    ) -> Result<Self, SigningError> {
        let (private_key, public_key) = match algorithm {
            SignatureAlgorithm::EdDsa => ed25519::generate(),
            SignatureAlgorithm::Es256k => es256k::generate(),
            SignatureAlgorithm::Rs256 => rs256::generate(DEFAULT_RSA_BITS)?,
        };
        let mut key = Self::public(key_id, algorithm, public_key);
        key.private_key = Some(private_key);
        Ok(key)
    }

    /// Generate an RSA key pair with a specific modulus size.
    pub fn generate_rsa_with_bits(
        key_id: impl Into<String>,
        bits: usize,
    ) -> Result<Self, SigningError> {
        let (private_key, public_key) = rs256::generate(bits)?;
        let mut key = Self::public(key_id, SignatureAlgorithm::Rs256, public_key);
        key.private_key = Some(private_key);
        Ok(key)
    }

    /// Set the controlling identity.
    pub fn with_controller(mut self, controller: impl Into<String>) -> Self {
        self.controller = Some(controller.into());
        self
    }

    /// The algorithm this key's type declares.
    pub fn algorithm(&self) -> Result<SignatureAlgorithm, SigningError> {
        SignatureAlgorithm::normalize(&self.key_type)
    }

    /// Whether private material is present.
    pub fn has_private_key(&self) -> bool {
        self.private_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    /// A copy of this key without private material.
    pub fn public_clone(&self) -> Self {
        Self {
            key_id: self.key_id.clone(),
            key_type: self.key_type.clone(),
            public_key: self.public_key.clone(),
            private_key: None,
            controller: self.controller.clone(),
            revoked: self.revoked,
            revoked_at: self.revoked_at,
        }
    }
}

impl Drop for SigningKey {
    fn drop(&mut self) {
        if let Some(private_key) = self.private_key.as_mut() {
            private_key.zeroize();
        }
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("key_type", &self.key_type)
            .field("public_key", &self.public_key)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("controller", &self.controller)
            .field("revoked", &self.revoked)
            .field("revoked_at", &self.revoked_at)
            .finish()
    }
}

/// Whether `material` is PEM armored.
pub fn is_pem(material: &str) -> bool {
    material.trim_start().starts_with("-----BEGIN")
}

/// Decode key material in any accepted encoding into raw bytes.
pub fn decode_key_material(material: &str) -> Result<Vec<u8>, SigningError> {
    let trimmed = material.trim();
    if trimmed.is_empty() {
        return Err(SigningError::InvalidKeyMaterial(
            "key material is empty".to_string(),
        ));
    }

    if is_pem(trimmed) {
        let body: String = trimmed
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("-----"))
            .collect();
        return STANDARD
            .decode(body)
            .map_err(|e| SigningError::InvalidKeyMaterial(format!("invalid PEM body: {e}")));
    }

    if let Some(hex_digits) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return hex::decode(hex_digits)
            .map_err(|e| SigningError::InvalidKeyMaterial(format!("invalid hex: {e}")));
    }

    if trimmed.len() % 2 == 0 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        if let Ok(bytes) = hex::decode(trimmed) {
            return Ok(bytes);
        }
    }

    for engine in [&URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD] {
        if let Ok(bytes) = engine.decode(trimmed) {
            return Ok(bytes);
        }
    }

    Err(SigningError::InvalidKeyMaterial(
        "expected hex, base64, base64url or PEM".to_string(),
    ))
}

/// Decode material that must be exactly `N` bytes.
pub(crate) fn decode_fixed<const N: usize>(
    material: &str,
    what: &str,
) -> Result<[u8; N], SigningError> {
    let mut bytes = decode_key_material(material)?;
    let result = <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        SigningError::InvalidKeyMaterial(format!(
            "{what} must be {N} bytes, got {}",
            bytes.len()
        ))
    });
    bytes.zeroize();
    result
}
