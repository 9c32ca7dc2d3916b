//! # ES256K (ECDSA over secp256k1 with SHA-256)
//!
//! Wire signatures are the fixed 64-byte `r‖s` form used by JOSE, not the
//! variable-length ASN.1 DER `SEQUENCE { INTEGER r, INTEGER s }` that ECDSA
//! libraries usually emit. [`der_to_raw`] and [`raw_to_der`] convert between
//! the two: each DER integer is minimal big-endian with a leading `0x00`
//! sign-guard byte when its high bit is set, each raw half is zero-padded to
//! [`SCALAR_LEN`] bytes.
//!
//! The fixed width assumes a 256-bit curve.
//!
//! Private keys are the 32-byte scalar. Public keys are SEC1 points,
//! compressed (33 bytes) or uncompressed (65 bytes), or the bare 64-byte
//! `X‖Y` coordinates.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand_core::OsRng;

use crate::error::SigningError;
use crate::key::{decode_fixed, decode_key_material};

/// Byte length of one secp256k1 scalar.
pub const SCALAR_LEN: usize = 32;
/// Byte length of a raw `r‖s` signature.
pub const SIGNATURE_LEN: usize = 2 * SCALAR_LEN;

const DER_SEQUENCE: u8 = 0x30;
const DER_INTEGER: u8 = 0x02;

/// Generate a key pair as `(private_hex, uncompressed_public_hex)`.
pub fn generate() -> (String, String) {
    let signing_key = SigningKey::random(&mut OsRng);
    let private = hex::encode(signing_key.to_bytes());
    let public = hex::encode(signing_key.verifying_key().to_encoded_point(false).as_bytes());
    (private, public)
}

fn signing_key(private_key: &str) -> Result<SigningKey, SigningError> {
    let scalar = decode_fixed::<SCALAR_LEN>(private_key, "secp256k1 private key")?;
    SigningKey::from_slice(&scalar).map_err(|e| {
        SigningError::InvalidKeyMaterial(format!("invalid secp256k1 private key: {e}"))
    })
}

fn verifying_key(public_key: &str) -> Result<VerifyingKey, SigningError> {
    let mut bytes = decode_key_material(public_key)?;
    if bytes.len() == SIGNATURE_LEN {
        bytes.insert(0, 0x04);
    }
    VerifyingKey::from_sec1_bytes(&bytes)
        .map_err(|e| SigningError::InvalidKeyMaterial(format!("invalid secp256k1 public key: {e}")))
}

/// Sign and return the raw 64-byte `r‖s` signature.
pub fn sign(private_key: &str, payload: &[u8]) -> Result<Vec<u8>, SigningError> {
    let key = signing_key(private_key)?;
    let signature: Signature = key
        .try_sign(payload)
        .map_err(|e| SigningError::SigningFailed(e.to_string()))?;
    let der = signature.to_der();
    der_to_raw(der.as_bytes()).map(|raw| raw.to_vec())
}

/// Verify a raw 64-byte `r‖s` signature.
///
/// High-S signatures `(r, n - s)` are accepted: they are mathematically
/// valid and other ECDSA signers emit them.
pub fn verify(public_key: &str, payload: &[u8], signature: &[u8]) -> Result<bool, SigningError> {
    let key = verifying_key(public_key)?;
    let der = raw_to_der(signature)?;
    let Ok(signature) = Signature::from_der(&der) else {
        return Ok(false);
    };
    let signature = signature.normalize_s().unwrap_or(signature);
    Ok(key.verify(payload, &signature).is_ok())
}

/// Convert a DER ECDSA signature to the fixed-width `r‖s` form.
pub fn der_to_raw(der: &[u8]) -> Result<[u8; SIGNATURE_LEN], SigningError> {
    let malformed =
        |reason: &str| SigningError::MalformedSignature(format!("DER signature {reason}"));

    let (&tag, rest) = der.split_first().ok_or_else(|| malformed("is empty"))?;
    if tag != DER_SEQUENCE {
        return Err(malformed("is not a SEQUENCE"));
    }
    let (&len, body) = rest.split_first().ok_or_else(|| malformed("is truncated"))?;
    if len & 0x80 != 0 || usize::from(len) != body.len() {
        return Err(malformed("has an invalid length"));
    }

    let (r, body) = read_integer(body).ok_or_else(|| malformed("has an invalid r"))?;
    let (s, body) = read_integer(body).ok_or_else(|| malformed("has an invalid s"))?;
    if !body.is_empty() {
        return Err(malformed("has trailing bytes"));
    }

    let mut raw = [0u8; SIGNATURE_LEN];
    left_pad_into(r, &mut raw[..SCALAR_LEN]).ok_or_else(|| malformed("r is too long"))?;
    left_pad_into(s, &mut raw[SCALAR_LEN..]).ok_or_else(|| malformed("s is too long"))?;
    Ok(raw)
}

/// Convert a fixed-width `r‖s` signature to DER.
pub fn raw_to_der(raw: &[u8]) -> Result<Vec<u8>, SigningError> {
    if raw.len() != SIGNATURE_LEN {
        return Err(SigningError::MalformedSignature(format!(
            "ES256K signature must be {SIGNATURE_LEN} bytes, got {}",
            raw.len()
        )));
    }
    let r = encode_integer(&raw[..SCALAR_LEN]);
    let s = encode_integer(&raw[SCALAR_LEN..]);
    let mut der = Vec::with_capacity(2 + r.len() + s.len());
    der.push(DER_SEQUENCE);
    // At most 2 * (2 + 33) = 70 bytes, so the short length form always fits.
    der.push((r.len() + s.len()) as u8);
    der.extend_from_slice(&r);
    der.extend_from_slice(&s);
    Ok(der)
}

/// Read one DER INTEGER, returning its magnitude without sign-guard zeros.
fn read_integer(input: &[u8]) -> Option<(&[u8], &[u8])> {
    let (&tag, rest) = input.split_first()?;
    if tag != DER_INTEGER {
        return None;
    }
    let (&len, rest) = rest.split_first()?;
    let len = usize::from(len);
    if len == 0 || len & 0x80 != 0 || rest.len() < len {
        return None;
    }
    let (value, rest) = rest.split_at(len);
    let start = value.iter().position(|b| *b != 0).unwrap_or(value.len());
    Some((&value[start..], rest))
}

fn left_pad_into(value: &[u8], out: &mut [u8]) -> Option<()> {
    if value.len() > out.len() {
        return None;
    }
    let offset = out.len() - value.len();
    out[offset..].copy_from_slice(value);
    Some(())
}

/// Minimal DER INTEGER for an unsigned big-endian scalar.
fn encode_integer(scalar: &[u8]) -> Vec<u8> {
    let start = scalar.iter().position(|b| *b != 0).unwrap_or(scalar.len() - 1);
    let magnitude = &scalar[start..];
    let guard = magnitude.first().is_some_and(|b| b & 0x80 != 0);
    let mut out = Vec::with_capacity(magnitude.len() + 3);
    out.push(DER_INTEGER);
    out.push((magnitude.len() + usize::from(guard)) as u8);
    if guard {
        out.push(0x00);
    }
    out.extend_from_slice(magnitude);
    out
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn der_conversion_preserves_any_fixed_width_signature(
            raw in prop::collection::vec(any::<u8>(), SIGNATURE_LEN),
        ) {
            let der = raw_to_der(&raw).unwrap();
            prop_assert!(der.len() <= 70);
            prop_assert_eq!(der_to_raw(&der).unwrap().to_vec(), raw);
        }
    }
}
