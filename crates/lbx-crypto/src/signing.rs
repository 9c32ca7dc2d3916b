//! # Signing Service
//!
//! Produces and checks [`SignatureProof`]s over canonical entry payloads and
//! enforces N-of-M multi-signature policies.
//!
//! ## Security Invariants
//!
//! - Signing refuses revoked keys, keys without private material, keys whose
//!   declared type does not match the requested algorithm, and empty payloads.
//! - Verification fails closed. Every problem with the key or the signature
//!   check is `Ok(false)`. Only an unsupported algorithm or an undecodable
//!   signature value is an `Err`.
//! - Multi-signature verification counts distinct `kid`s, so one key
//!   signing twice counts once.

use std::collections::BTreeSet;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use lbx_core::{Entry, ProtectedHeader, SignatureProof};
use serde::{Deserialize, Serialize};

use crate::algorithm::SignatureAlgorithm;
use crate::error::SigningError;
use crate::key::SigningKey;
use crate::keystore::KeyStore;

/// N-of-M multi-signature policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSigPolicy {
    /// Minimum number of distinct valid signers.
    pub threshold: usize,
    /// Keys allowed to count toward the threshold. Empty allows any key.
    #[serde(default)]
    pub allowed_key_ids: BTreeSet<String>,
}

impl MultiSigPolicy {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            allowed_key_ids: BTreeSet::new(),
        }
    }

    /// Restrict the policy to the given key ids.
    pub fn with_allowed_keys<I, S>(mut self, key_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_key_ids = key_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `key_id` may count toward the threshold.
    pub fn allows(&self, key_id: &str) -> bool {
        self.allowed_key_ids.is_empty() || self.allowed_key_ids.contains(key_id)
    }

    fn check(&self) -> Result<(), SigningError> {
        if self.threshold == 0 {
            return Err(SigningError::InvalidPolicy(
                "threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Encode a signature value for the wire.
pub fn encode_signature(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a wire signature value. Trailing padding is tolerated.
pub fn decode_signature(value: &str) -> Result<Vec<u8>, SigningError> {
    let trimmed = value.trim().trim_end_matches('=');
    if trimmed.is_empty() {
        return Err(SigningError::MalformedSignature(
            "signature value is empty".to_string(),
        ));
    }
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|e| SigningError::MalformedSignature(format!("not base64url: {e}")))
}

/// Signs and verifies payloads against an injected [`KeyStore`].
#[derive(Clone)]
pub struct SigningService {
    key_store: Arc<dyn KeyStore>,
}

impl std::fmt::Debug for SigningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningService").finish_non_exhaustive()
    }
}

impl SigningService {
    pub fn new(key_store: Arc<dyn KeyStore>) -> Self {
        Self { key_store }
    }

    /// The key store this service resolves and registers keys in.
    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.key_store
    }

    /// Sign `payload` with `key` under `algorithm`.
    ///
    /// On success a public-only clone of `key` is upserted into the key
    /// store so the proof can be verified by `kid` later.
    ///
    /// # Errors
    ///
    /// Unsupported algorithm, empty payload, revoked key, key/algorithm
    /// mismatch, missing private material, or a primitive failure.
    pub async fn sign(
        &self,
        payload: &[u8],
        key: &SigningKey,
        algorithm: &str,
    ) -> Result<SignatureProof, SigningError> {
        let algorithm = SignatureAlgorithm::normalize(algorithm)?;
        if payload.is_empty() {
            return Err(SigningError::EmptyPayload);
        }
        if key.revoked || self.key_store.is_revoked(&key.key_id).await? {
            return Err(SigningError::KeyRevoked(key.key_id.clone()));
        }
        if key.algorithm().ok() != Some(algorithm) {
            return Err(SigningError::KeyAlgorithmMismatch {
                key_id: key.key_id.clone(),
                key_type: key.key_type.clone(),
                algorithm: algorithm.as_str().to_string(),
            });
        }
        let private_key = key
            .private_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SigningError::MissingPrivateKey(key.key_id.clone()))?;

        let signature = algorithm.sign(private_key, payload)?;
        self.key_store.upsert_key(key.public_clone()).await?;

        tracing::debug!(key_id = %key.key_id, alg = %algorithm, "payload signed");
        Ok(SignatureProof {
            protected_header: ProtectedHeader::new(algorithm.as_str(), key.key_id.as_str()),
            signature: encode_signature(&signature),
        })
    }

    /// Sign an entry's canonical payload and append the proof to it.
    pub async fn sign_entry(
        &self,
        entry: &mut Entry,
        key: &SigningKey,
        algorithm: &str,
    ) -> Result<SignatureProof, SigningError> {
        let payload = entry.canonical_payload()?;
        let proof = self.sign(payload.as_bytes(), key, algorithm).await?;
        entry.signatures.push(proof.clone());
        Ok(proof)
    }

    /// Check `proof` over `payload` using the key its `kid` names.
    pub async fn verify(
        &self,
        payload: &[u8],
        proof: &SignatureProof,
    ) -> Result<bool, SigningError> {
        let algorithm = SignatureAlgorithm::normalize(&proof.protected_header.alg)?;
        let signature = decode_signature(&proof.signature)?;
        if payload.is_empty() {
            return Ok(false);
        }
        let Some(kid) = proof
            .protected_header
            .kid
            .as_deref()
            .map(str::trim)
            .filter(|kid| !kid.is_empty())
        else {
            tracing::debug!("signature has no kid");
            return Ok(false);
        };

        let key = match self.key_store.get_key(kid).await {
            Ok(Some(key)) => key,
            Ok(None) => {
                tracing::debug!(kid, "signing key not found");
                return Ok(false);
            }
            Err(e) => {
                tracing::debug!(kid, error = %e, "key lookup failed");
                return Ok(false);
            }
        };
        if key.revoked {
            tracing::debug!(kid, "signing key is revoked");
            return Ok(false);
        }
        if key.algorithm().ok() != Some(algorithm) || key.public_key.trim().is_empty() {
            tracing::debug!(kid, key_type = %key.key_type, alg = %algorithm, "key cannot verify");
            return Ok(false);
        }

        match algorithm.verify(&key.public_key, payload, &signature) {
            Ok(valid) => {
                tracing::debug!(kid, valid, "signature checked");
                Ok(valid)
            }
            Err(e @ SigningError::MalformedSignature(_)) => Err(e),
            Err(e) => {
                tracing::debug!(kid, error = %e, "stored key material unusable");
                Ok(false)
            }
        }
    }

    /// Sign with candidate keys in order until `policy.threshold` proofs
    /// exist. Disallowed keys and keys that cannot sign are skipped.
    pub async fn multi_sign(
        &self,
        payload: &[u8],
        keys: &[SigningKey],
        policy: &MultiSigPolicy,
    ) -> Result<Vec<SignatureProof>, SigningError> {
        policy.check()?;
        if keys.is_empty() {
            return Err(SigningError::InvalidPolicy(
                "at least one candidate key is required".to_string(),
            ));
        }
        if payload.is_empty() {
            return Err(SigningError::EmptyPayload);
        }

        let mut signers = BTreeSet::new();
        let mut proofs = Vec::with_capacity(policy.threshold);
        for key in keys {
            if proofs.len() >= policy.threshold {
                break;
            }
            if !policy.allows(&key.key_id) {
                tracing::warn!(key_id = %key.key_id, "key not allowed by policy, skipping");
                continue;
            }
            if signers.contains(key.key_id.as_str()) {
                continue;
            }
            match self.sign(payload, key, &key.key_type).await {
                Ok(proof) => {
                    signers.insert(key.key_id.as_str());
                    proofs.push(proof);
                }
                Err(e) => {
                    tracing::warn!(key_id = %key.key_id, error = %e, "key cannot sign, skipping");
                }
            }
        }

        if proofs.len() < policy.threshold {
            return Err(SigningError::InsufficientSignatures {
                required: policy.threshold,
                produced: proofs.len(),
            });
        }
        Ok(proofs)
    }

    /// Whether `proofs` carry at least `policy.threshold` valid signatures
    /// from distinct allowed keys. Stops verifying once the threshold is met.
    pub async fn verify_multi_sig(
        &self,
        payload: &[u8],
        proofs: &[SignatureProof],
        policy: &MultiSigPolicy,
    ) -> Result<bool, SigningError> {
        policy.check()?;
        if proofs.len() < policy.threshold {
            return Ok(false);
        }

        let mut signers: BTreeSet<&str> = BTreeSet::new();
        for proof in proofs {
            let Some(kid) = proof
                .protected_header
                .kid
                .as_deref()
                .map(str::trim)
                .filter(|kid| !kid.is_empty())
            else {
                continue;
            };
            if !policy.allows(kid) || signers.contains(kid) {
                continue;
            }
            match self.verify(payload, proof).await {
                Ok(true) => {
                    signers.insert(kid);
                    if signers.len() >= policy.threshold {
                        return Ok(true);
                    }
                }
                Ok(false) => {}
                Err(e) => tracing::debug!(kid, error = %e, "proof rejected"),
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::InMemoryKeyStore;

    fn service() -> SigningService {
        SigningService::new(Arc::new(InMemoryKeyStore::new()))
    }

    fn ed_key(id: &str) -> SigningKey {
        SigningKey::generate(SignatureAlgorithm::EdDsa, id).unwrap()
    }

    #[tokio::test]
    async fn sign_writes_canonical_header_and_registers_public_key() {
        let svc = service();
        let key = ed_key("k1");
        let proof = svc.sign(b"payload", &key, "ed25519").await.unwrap();
        assert_eq!(proof.protected_header.alg, "EdDSA");
        assert_eq!(proof.protected_header.kid.as_deref(), Some("k1"));
        assert!(!proof.signature.contains('='));

        let stored = svc.key_store().get_key("k1").await.unwrap().unwrap();
        assert!(!stored.has_private_key());
        assert!(svc.verify(b"payload", &proof).await.unwrap());
    }

    #[tokio::test]
    async fn sign_rejects_mismatch_missing_private_and_empty_payload() {
        let svc = service();
        let key = ed_key("k1");
        assert!(matches!(
            svc.sign(b"p", &key, "RS256").await,
            Err(SigningError::KeyAlgorithmMismatch { .. })
        ));
        assert!(matches!(
            svc.sign(b"", &key, "EdDSA").await,
            Err(SigningError::EmptyPayload)
        ));
        assert!(matches!(
            svc.sign(b"p", &key.public_clone(), "EdDSA").await,
            Err(SigningError::MissingPrivateKey(_))
        ));
        assert!(matches!(
            svc.sign(b"p", &key, "HS256").await,
            Err(SigningError::UnsupportedAlgorithm(_))
        ));
    }

    #[tokio::test]
    async fn revoked_key_cannot_sign_or_verify() {
        let svc = service();
        let key = ed_key("k1");
        let proof = svc.sign(b"payload", &key, "EdDSA").await.unwrap();
        svc.key_store().revoke_key("k1").await.unwrap();

        assert!(!svc.verify(b"payload", &proof).await.unwrap());
        assert!(matches!(
            svc.sign(b"payload", &key, "EdDSA").await,
            Err(SigningError::KeyRevoked(_))
        ));
    }

    #[tokio::test]
    async fn verify_fails_closed_on_unknown_kid() {
        let svc = service();
        let key = ed_key("k1");
        let mut proof = svc.sign(b"payload", &key, "EdDSA").await.unwrap();
        proof.protected_header.kid = Some("ghost".to_string());
        assert!(!svc.verify(b"payload", &proof).await.unwrap());
        proof.protected_header.kid = None;
        assert!(!svc.verify(b"payload", &proof).await.unwrap());
    }

    #[tokio::test]
    async fn verify_errors_on_bad_encoding_and_unknown_algorithm() {
        let svc = service();
        let key = ed_key("k1");
        let proof = svc.sign(b"payload", &key, "EdDSA").await.unwrap();

        let mut bad_encoding = proof.clone();
        bad_encoding.signature = "not base64url!".to_string();
        assert!(matches!(
            svc.verify(b"payload", &bad_encoding).await,
            Err(SigningError::MalformedSignature(_))
        ));

        let mut bad_alg = proof;
        bad_alg.protected_header.alg = "HS256".to_string();
        assert!(matches!(
            svc.verify(b"payload", &bad_alg).await,
            Err(SigningError::UnsupportedAlgorithm(_))
        ));
    }

    #[tokio::test]
    async fn header_alg_must_match_stored_key_type() {
        let svc = service();
        let key = ed_key("k1");
        let mut proof = svc.sign(b"payload", &key, "EdDSA").await.unwrap();
        proof.protected_header.alg = "ES256K".to_string();
        assert!(!svc.verify(b"payload", &proof).await.unwrap());
    }

    #[tokio::test]
    async fn multi_sign_skips_disallowed_and_stops_at_threshold() {
        let svc = service();
        let keys = vec![ed_key("a"), ed_key("outsider"), ed_key("b"), ed_key("c")];
        let policy = MultiSigPolicy::new(2).with_allowed_keys(["a", "b", "c"]);
        let proofs = svc.multi_sign(b"payload", &keys, &policy).await.unwrap();
        let kids: Vec<_> = proofs
            .iter()
            .map(|p| p.protected_header.kid.clone().unwrap())
            .collect();
        assert_eq!(kids, ["a", "b"]);
        assert!(svc.key_store().get_key("c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn multi_sign_reports_shortfall() {
        let svc = service();
        let keys = vec![ed_key("a"), ed_key("b").public_clone()];
        let err = svc
            .multi_sign(b"payload", &keys, &MultiSigPolicy::new(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SigningError::InsufficientSignatures {
                required: 2,
                produced: 1
            }
        ));
    }

    #[tokio::test]
    async fn zero_threshold_is_invalid() {
        let svc = service();
        assert!(matches!(
            svc.multi_sign(b"p", &[ed_key("a")], &MultiSigPolicy::new(0)).await,
            Err(SigningError::InvalidPolicy(_))
        ));
        assert!(matches!(
            svc.verify_multi_sig(b"p", &[], &MultiSigPolicy::new(0)).await,
            Err(SigningError::InvalidPolicy(_))
        ));
        assert!(matches!(
            svc.multi_sign(b"p", &[], &MultiSigPolicy::new(1)).await,
            Err(SigningError::InvalidPolicy(_))
        ));
    }

    #[tokio::test]
    async fn verify_multi_sig_ignores_disallowed_signers() {
        let svc = service();
        let keys = vec![ed_key("a"), ed_key("b")];
        let proofs = svc
            .multi_sign(b"payload", &keys, &MultiSigPolicy::new(2))
            .await
            .unwrap();
        let restricted = MultiSigPolicy::new(2).with_allowed_keys(["a", "z"]);
        assert!(!svc.verify_multi_sig(b"payload", &proofs, &restricted).await.unwrap());
        let open = MultiSigPolicy::new(2);
        assert!(svc.verify_multi_sig(b"payload", &proofs, &open).await.unwrap());
    }

    #[tokio::test]
    async fn invalid_proof_does_not_block_later_proof_from_same_key() {
        let svc = service();
        let key = ed_key("a");
        let good = svc.sign(b"payload", &key, "EdDSA").await.unwrap();
        let mut bad = good.clone();
        bad.signature = encode_signature(&[0u8; 64]);
        let other = svc.sign(b"payload", &ed_key("b"), "EdDSA").await.unwrap();
        let proofs = [bad, good, other];
        assert!(svc
            .verify_multi_sig(b"payload", &proofs, &MultiSigPolicy::new(2))
            .await
            .unwrap());
    }

    #[test]
    fn decode_signature_tolerates_padding() {
        assert_eq!(decode_signature("AQI=").unwrap(), vec![1, 2]);
        assert_eq!(decode_signature("AQI").unwrap(), vec![1, 2]);
        assert!(decode_signature("").is_err());
        assert!(decode_signature("+/+/").is_err());
    }
}
