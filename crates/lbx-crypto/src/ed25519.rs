//! # EdDSA (Ed25519)
//!
//! Private keys are the 32-byte seed, public keys the 32-byte compressed
//! point, both hex encoded when generated here. Signatures are the raw
//! 64-byte Ed25519 signature.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;

use crate::error::SigningError;
use crate::key::decode_fixed;

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Generate a key pair as `(private_hex, public_hex)`.
pub fn generate() -> (String, String) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let private = hex::encode(signing_key.to_bytes());
    let public = hex::encode(signing_key.verifying_key().to_bytes());
    (private, public)
}

/// Derive the hex public key for a private seed.
pub fn public_key_for(private_key: &str) -> Result<String, SigningError> {
    let seed = decode_fixed::<32>(private_key, "Ed25519 private key")?;
    let signing_key = SigningKey::from_bytes(&seed);
    Ok(hex::encode(signing_key.verifying_key().to_bytes()))
}

pub fn sign(private_key: &str, payload: &[u8]) -> Result<Vec<u8>, SigningError> {
    let seed = decode_fixed::<32>(private_key, "Ed25519 private key")?;
    let signing_key = SigningKey::from_bytes(&seed);
    Ok(signing_key.sign(payload).to_bytes().to_vec())
}

pub fn verify(public_key: &str, payload: &[u8], signature: &[u8]) -> Result<bool, SigningError> {
    let bytes = decode_fixed::<32>(public_key, "Ed25519 public key")?;
    let verifying_key = VerifyingKey::from_bytes(&bytes)
        .map_err(|e| SigningError::InvalidKeyMaterial(format!("invalid Ed25519 public key: {e}")))?;
    if signature.len() != SIGNATURE_LEN {
        return Err(SigningError::MalformedSignature(format!(
            "Ed25519 signature must be {SIGNATURE_LEN} bytes, got {}",
            signature.len()
        )));
    }
    let signature = Signature::from_slice(signature)
        .map_err(|e| SigningError::MalformedSignature(e.to_string()))?;
    Ok(verifying_key.verify(payload, &signature).is_ok())
}
